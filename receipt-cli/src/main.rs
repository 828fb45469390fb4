mod config;
mod logger;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use receipt_printer::{
    FilePrinter, Formatter, NetworkPrinter, NodeDocument, PrintResult, Printer, escpos, raster,
};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "receipt-cli", version, about = "Format and send ESC/POS receipt jobs")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Format a node document (JSON) and send it to a printer
    Print {
        job: PathBuf,
        #[command(flatten)]
        dest: Destination,
        /// Also save the exact byte stream to this file
        #[arg(long)]
        capture: Option<PathBuf>,
    },

    /// Send a file's bytes verbatim, after a printer reset
    Raw {
        file: PathBuf,
        #[command(flatten)]
        dest: Destination,
    },

    /// Convert an image into an `image` node and print it as JSON
    Image {
        file: PathBuf,
        #[arg(long, default_value_t = raster::DEFAULT_MAX_WIDTH)]
        max_width: u32,
    },

    /// List spooler printers
    Printers,
}

/// Where a job goes; falls back to the configured default
#[derive(Args, Debug, Default)]
struct Destination {
    /// Spooler printer name
    #[arg(long, conflicts_with_all = ["addr", "output"])]
    printer: Option<String>,
    /// Raw TCP printer (`host` or `host:port`)
    #[arg(long, conflicts_with = "output")]
    addr: Option<String>,
    /// Write the job to a file instead of a printer
    #[arg(long)]
    output: Option<PathBuf>,
}

enum Target {
    #[cfg(windows)]
    Spooler(receipt_printer::WindowsPrinter),
    Network(NetworkPrinter),
    File(FilePrinter),
}

impl Target {
    fn resolve(dest: Destination, config: &Config) -> Result<Self> {
        if let Some(path) = dest.output {
            return Ok(Self::File(FilePrinter::new(path)));
        }
        if let Some(addr) = dest.addr.or_else(|| {
            dest.printer
                .is_none()
                .then(|| config.printer_addr.clone())
                .flatten()
        }) {
            let printer = NetworkPrinter::from_addr(&addr)?.with_timeout(config.timeout());
            return Ok(Self::Network(printer));
        }
        Self::spooler(dest.printer.or_else(|| config.printer.clone()))
    }

    #[cfg(windows)]
    fn spooler(name: Option<String>) -> Result<Self> {
        use receipt_printer::WindowsPrinter;

        let name = WindowsPrinter::resolve(name.as_deref())?;
        Ok(Self::Spooler(WindowsPrinter::new(&name)))
    }

    #[cfg(not(windows))]
    fn spooler(name: Option<String>) -> Result<Self> {
        match name {
            Some(name) => anyhow::bail!("spooler printer '{name}' requested, but spooler printing is only available on Windows"),
            None => anyhow::bail!("no destination: pass --printer, --addr or --output, or set RECEIPT_PRINTER_ADDR"),
        }
    }

    async fn deliver(&self, data: &[u8]) -> PrintResult<()> {
        match self {
            #[cfg(windows)]
            Self::Spooler(p) => p.print(data).await,
            Self::Network(p) => p.print(data).await,
            Self::File(p) => p.print(data).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    logger::init_logger(&config.log_level, config.log_dir.as_deref());

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Print { job, dest, capture } => print_job(&job, dest, capture, &config).await,
        Cmd::Raw { file, dest } => print_raw(&file, dest, &config).await,
        Cmd::Image { file, max_width } => {
            let node = raster::image_node(&file, max_width)?;
            println!("{}", serde_json::to_string_pretty(&node)?);
            Ok(())
        }
        Cmd::Printers => list_printers(),
    }
}

fn load_document(path: &Path) -> Result<NodeDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    NodeDocument::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
}

async fn print_job(
    path: &Path,
    dest: Destination,
    capture: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let document = load_document(path)?;
    let target = Target::resolve(dest, config)?;
    info!(document = %document.document, nodes = document.nodes.len(), "printing");

    #[cfg(windows)]
    if let Target::Spooler(printer) = &target {
        let name = printer.name().to_string();
        return tokio::task::spawn_blocking(move || spool_document(&name, &document, capture))
            .await
            .context("spooler task failed")?;
    }

    let mut formatter = Formatter::new(Vec::new());
    formatter
        .write_document(&document)
        .context("failed to format document")?;
    let data = formatter.into_inner();

    if let Some(path) = capture
        && let Err(e) = std::fs::write(&path, &data)
    {
        warn!(path = %path.display(), error = %e, "capture not saved");
    }

    target.deliver(&data).await?;
    info!(bytes = data.len(), "done");
    Ok(())
}

/// Stream a document straight into a spooler job
#[cfg(windows)]
fn spool_document(name: &str, document: &NodeDocument, capture: Option<PathBuf>) -> Result<()> {
    use receipt_printer::{CaptureSink, SpoolerJob};

    let mut job = SpoolerJob::open(name)?;
    job.begin(&document.document, "RAW")?;

    let mut formatter = Formatter::new(CaptureSink::new(job));
    let written = formatter.write_document(document);
    let sink = formatter.into_inner();

    if let Some(path) = capture
        && let Err(e) = sink.save(&path)
    {
        warn!(path = %path.display(), error = %e, "capture not saved");
    }

    let (mut job, captured) = sink.into_parts();
    let page = job.end_page();
    let doc = job.end_document();

    written.context("failed to format document")?;
    page?;
    doc?;
    info!(printer = name, bytes = captured.len(), "done");
    Ok(())
}

async fn print_raw(path: &Path, dest: Destination, config: &Config) -> Result<()> {
    let contents =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let target = Target::resolve(dest, config)?;

    let mut data = Vec::with_capacity(contents.len() + 2);
    data.extend_from_slice(&escpos::init());
    data.extend_from_slice(&contents);

    target.deliver(&data).await?;
    info!(bytes = data.len(), "raw job sent");
    Ok(())
}

#[cfg(windows)]
fn list_printers() -> Result<()> {
    use receipt_printer::WindowsPrinter;

    let default = WindowsPrinter::default_printer()?;
    for name in WindowsPrinter::list()? {
        let marker = if default.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {name}");
    }
    Ok(())
}

#[cfg(not(windows))]
fn list_printers() -> Result<()> {
    anyhow::bail!("printer enumeration requires the Windows spooler")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            printer: None,
            printer_addr: Some("127.0.0.1:9100".to_string()),
            timeout_ms: 100,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "receipt-cli",
            "print",
            "job.json",
            "--addr",
            "10.0.0.2",
            "--capture",
            "file.pj",
        ])
        .unwrap();
        match cli.cmd {
            Cmd::Print { job, dest, capture } => {
                assert_eq!(job, PathBuf::from("job.json"));
                assert_eq!(dest.addr.as_deref(), Some("10.0.0.2"));
                assert_eq!(capture, Some(PathBuf::from("file.pj")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_destinations_conflict() {
        assert!(
            Cli::try_parse_from(["receipt-cli", "raw", "a.bin", "--addr", "x", "--output", "y"])
                .is_err()
        );
    }

    #[test]
    fn test_output_wins() {
        let dest = Destination {
            output: Some(PathBuf::from("out.bin")),
            ..Default::default()
        };
        assert!(matches!(
            Target::resolve(dest, &config()).unwrap(),
            Target::File(_)
        ));
    }

    #[test]
    fn test_configured_addr_used() {
        match Target::resolve(Destination::default(), &config()).unwrap() {
            Target::Network(p) => assert_eq!(p.addr().port(), 9100),
            _ => panic!("expected network target"),
        }
    }

    #[tokio::test]
    async fn test_print_job_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = dir.path().join("job.json");
        let out = dir.path().join("out.bin");
        let capture = dir.path().join("file.pj");
        std::fs::write(
            &job,
            r#"{ "nodes": [ { "name": "text", "payload": "Hi" }, { "name": "cut" } ] }"#,
        )
        .unwrap();

        let dest = Destination {
            output: Some(out.clone()),
            ..Default::default()
        };
        print_job(&job, dest, Some(capture.clone()), &config())
            .await
            .unwrap();

        let expected = vec![0x1B, b'@', b'H', b'i', 0x1D, b'V', b'A', b'0'];
        assert_eq!(std::fs::read(&out).unwrap(), expected);
        assert_eq!(std::fs::read(&capture).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_print_raw_prefixes_init() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let out = dir.path().join("out.bin");
        std::fs::write(&input, b"hello").unwrap();

        let dest = Destination {
            output: Some(out.clone()),
            ..Default::default()
        };
        print_raw(&input, dest, &config()).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"\x1B@hello");
    }
}
