//! Delivery adapters for formatted jobs
//!
//! The formatter only needs a byte sink. These adapters are the hosts that
//! supply one:
//! - Windows spooler printers (via Win32 API)
//! - Network printers (raw TCP, port 9100)
//! - Plain files

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Default raw printing port
pub const RAW_PORT: u16 = 9100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A destination that accepts a complete formatted job
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Deliver the job bytes
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the destination is reachable
    async fn is_online(&self) -> bool;
}

/// Raw TCP printer
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Parse `host:port`; a bare host gets [`RAW_PORT`]
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let parsed = addr
            .parse::<SocketAddr>()
            .or_else(|_| format!("{}:{}", addr, RAW_PORT).parse())
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr: parsed,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn connect(&self, timeout: Duration) -> PrintResult<TcpStream> {
        tokio::time::timeout(timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = self.connect(self.timeout).await?;
        stream.write_all(data).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        info!("job sent");
        Ok(())
    }

    #[instrument(fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        match self.connect(Duration::from_millis(500)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "printer offline");
                false
            }
        }
    }
}

/// Writes jobs to a file, replacing its contents
#[derive(Debug, Clone)]
pub struct FilePrinter {
    path: PathBuf,
}

impl FilePrinter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Printer for FilePrinter {
    #[instrument(skip(data), fields(path = %self.path.display(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        tokio::fs::write(&self.path, data).await?;
        info!("job written");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.is_dir(),
            _ => true,
        }
    }
}

#[cfg(windows)]
pub use spooler::{SpoolerJob, WindowsPrinter};

#[cfg(windows)]
mod spooler {
    use std::io;

    use core::ffi::c_void;
    use tracing::{info, instrument, warn};
    use windows::Win32::Graphics::Printing::{
        ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumPrintersW,
        GetDefaultPrinterW, OpenPrinterW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL,
        PRINTER_HANDLE, PRINTER_INFO_5W, StartDocPrinterW, StartPagePrinter, WritePrinter,
    };
    use windows::core::{PCWSTR, PWSTR};

    use super::Printer;
    use crate::error::{PrintError, PrintResult};

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn spooler_error(call: &str) -> PrintError {
        PrintError::WindowsPrinter(format!("{} failed: {}", call, io::Error::last_os_error()))
    }

    /// An open spooler handle, usable as a formatter sink
    ///
    /// Bytes written between [`start_page`](Self::start_page) and
    /// [`end_page`](Self::end_page) go straight to `WritePrinter`. The handle
    /// is closed on drop.
    #[derive(Debug)]
    pub struct SpoolerJob {
        handle: PRINTER_HANDLE,
        name: String,
    }

    impl SpoolerJob {
        /// Open a printer by spooler name
        pub fn open(name: &str) -> PrintResult<Self> {
            let mut handle = PRINTER_HANDLE::default();
            let name_w = to_wide(name);
            unsafe {
                OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None)
                    .map_err(|e| PrintError::WindowsPrinter(format!("OpenPrinterW failed: {}", e)))?;
            }
            Ok(Self {
                handle,
                name: name.to_string(),
            })
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        /// Begin a document; `datatype` is usually `RAW`
        pub fn start_document(&mut self, doc_name: &str, datatype: &str) -> PrintResult<()> {
            let doc_name_w = to_wide(doc_name);
            let datatype_w = to_wide(datatype);
            let doc_info = DOC_INFO_1W {
                pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
                pOutputFile: PWSTR::null(),
                pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
            };

            let job_id = unsafe { StartDocPrinterW(self.handle, 1, &doc_info as *const DOC_INFO_1W) };
            if job_id == 0 {
                return Err(spooler_error("StartDocPrinter"));
            }
            info!(printer = %self.name, job_id, "document started");
            Ok(())
        }

        pub fn end_document(&mut self) -> PrintResult<()> {
            if !unsafe { EndDocPrinter(self.handle) }.as_bool() {
                return Err(spooler_error("EndDocPrinter"));
            }
            Ok(())
        }

        pub fn start_page(&mut self) -> PrintResult<()> {
            if !unsafe { StartPagePrinter(self.handle) }.as_bool() {
                return Err(spooler_error("StartPagePrinter"));
            }
            Ok(())
        }

        pub fn end_page(&mut self) -> PrintResult<()> {
            if !unsafe { EndPagePrinter(self.handle) }.as_bool() {
                return Err(spooler_error("EndPagePrinter"));
            }
            Ok(())
        }

        /// Start a document and its first page
        ///
        /// If the page cannot be started the document is ended again, so the
        /// spooler never keeps an open document without a page.
        pub fn begin(&mut self, doc_name: &str, datatype: &str) -> PrintResult<()> {
            self.start_document(doc_name, datatype)?;
            if let Err(e) = self.start_page() {
                let _ = self.end_document();
                return Err(e);
            }
            Ok(())
        }
    }

    impl io::Write for SpoolerJob {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
            let mut written: u32 = 0;
            let ok = unsafe {
                WritePrinter(self.handle, buf.as_ptr() as *const c_void, len, &mut written)
            };
            if !ok.as_bool() {
                return Err(io::Error::last_os_error());
            }
            if written == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "WritePrinter accepted no bytes",
                ));
            }
            Ok(written as usize)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for SpoolerJob {
        fn drop(&mut self) {
            let _ = unsafe { ClosePrinter(self.handle) };
        }
    }

    /// Printer installed in the Windows spooler
    #[derive(Debug, Clone)]
    pub struct WindowsPrinter {
        name: String,
        document: String,
    }

    impl WindowsPrinter {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                document: "Receipt".to_string(),
            }
        }

        /// Document name shown in the spooler queue
        pub fn with_document_name(mut self, document: &str) -> Self {
            self.document = document.to_string();
            self
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        /// Local and connected printers, virtual ports excluded
        pub fn list() -> PrintResult<Vec<String>> {
            let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            unsafe {
                let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);
                if needed == 0 {
                    return Ok(Vec::new());
                }

                let mut buf: Vec<u8> = vec![0; needed as usize];
                EnumPrintersW(
                    flags,
                    None,
                    5,
                    Some(buf.as_mut_slice()),
                    &mut needed,
                    &mut returned,
                )
                .map_err(|e| PrintError::WindowsPrinter(format!("EnumPrintersW failed: {}", e)))?;

                let infos =
                    std::slice::from_raw_parts(buf.as_ptr() as *const PRINTER_INFO_5W, returned as usize);

                let mut names = Vec::with_capacity(infos.len());
                for info in infos {
                    if info.pPrinterName.is_null() {
                        continue;
                    }
                    let name = info.pPrinterName.to_string().unwrap_or_default();
                    let port = if info.pPortName.is_null() {
                        String::new()
                    } else {
                        info.pPortName.to_string().unwrap_or_default()
                    };
                    if !is_virtual_port(&port) {
                        names.push(name);
                    }
                }
                Ok(names)
            }
        }

        /// The spooler's default printer, if one is set
        pub fn default_printer() -> PrintResult<Option<String>> {
            let mut needed: u32 = 0;
            unsafe {
                let _ = GetDefaultPrinterW(None, &mut needed);
                if needed == 0 {
                    return Ok(None);
                }

                let mut buf: Vec<u16> = vec![0; needed as usize];
                if !GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed).as_bool() {
                    return Ok(None);
                }

                let name = PWSTR(buf.as_mut_ptr()).to_string().map_err(|e| {
                    PrintError::WindowsPrinter(format!("UTF-16 decode failed: {}", e))
                })?;
                Ok(Some(name))
            }
        }

        /// Pick `name` if installed, else the default, else the first listed
        pub fn resolve(name: Option<&str>) -> PrintResult<String> {
            if let Some(name) = name {
                if Self::list()?.iter().any(|p| p == name) {
                    return Ok(name.to_string());
                }
                return Err(PrintError::WindowsPrinter(format!("Printer not found: {}", name)));
            }

            if let Some(default) = Self::default_printer()? {
                return Ok(default);
            }

            Self::list()?
                .into_iter()
                .next()
                .ok_or_else(|| PrintError::WindowsPrinter("No printers available".to_string()))
        }

        /// Send a job synchronously: open, one RAW document with one page, close
        #[instrument(skip(self, data), fields(printer = %self.name, data_len = data.len()))]
        pub fn print_sync(&self, data: &[u8]) -> PrintResult<()> {
            use std::io::Write;

            let mut job = SpoolerJob::open(&self.name)?;
            job.begin(&self.document, "RAW")?;

            let written = job.write_all(data);
            let page = job.end_page();
            let doc = job.end_document();

            written?;
            page?;
            doc?;
            info!("job spooled");
            Ok(())
        }
    }

    fn is_virtual_port(port: &str) -> bool {
        let p = port.to_lowercase();
        p == "file:"
            || p == "portprompt:"
            || p == "xpsport:"
            || p == "nul:"
            || p.starts_with("onenote")
            || p.starts_with("wfsport:")
    }

    impl Printer for WindowsPrinter {
        async fn print(&self, data: &[u8]) -> PrintResult<()> {
            let printer = self.clone();
            let data = data.to_vec();

            tokio::task::spawn_blocking(move || printer.print_sync(&data))
                .await
                .map_err(|e| PrintError::WindowsPrinter(format!("Task join failed: {}", e)))?
        }

        async fn is_online(&self) -> bool {
            match Self::list() {
                Ok(names) => names.iter().any(|n| n == &self.name),
                Err(e) => {
                    warn!(error = %e, "printer enumeration failed");
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.addr().port(), 9100);
    }

    #[test]
    fn test_network_printer_default_port() {
        let printer = NetworkPrinter::from_addr("10.0.0.7").unwrap();
        assert_eq!(printer.addr().port(), RAW_PORT);
    }

    #[test]
    fn test_invalid_addr() {
        assert!(matches!(
            NetworkPrinter::from_addr("invalid"),
            Err(PrintError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_network_print_delivers_bytes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            sock.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let printer = NetworkPrinter::from_addr(&addr.to_string()).unwrap();
        printer.print(&[0x1B, b'@', b'O', b'K']).await.unwrap();

        assert_eq!(server.await.unwrap(), vec![0x1B, b'@', b'O', b'K']);
    }

    #[tokio::test]
    async fn test_file_printer() {
        let dir = tempfile::tempdir().unwrap();
        let printer = FilePrinter::new(dir.path().join("job.bin"));
        assert!(printer.is_online().await);

        printer.print(b"\x1B@hello").await.unwrap();
        assert_eq!(std::fs::read(printer.path()).unwrap(), b"\x1B@hello");
    }
}
