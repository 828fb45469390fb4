use std::time::Duration;

/// CLI configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | RECEIPT_PRINTER | - | spooler printer name |
/// | RECEIPT_PRINTER_ADDR | - | raw TCP printer, `host:port` |
/// | RECEIPT_TIMEOUT_MS | 5000 | TCP connect timeout (ms) |
/// | RECEIPT_LOG_LEVEL | info | log filter |
/// | RECEIPT_LOG_DIR | - | directory for daily rolling logs |
///
/// Command line flags take precedence over all of these.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default spooler printer
    pub printer: Option<String>,
    /// Default network printer
    pub printer_addr: Option<String>,
    pub timeout_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            printer: non_empty_var("RECEIPT_PRINTER"),
            printer_addr: non_empty_var("RECEIPT_PRINTER_ADDR"),
            timeout_ms: std::env::var("RECEIPT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            log_level: std::env::var("RECEIPT_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: non_empty_var("RECEIPT_LOG_DIR"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
