//! # receipt-printer
//!
//! ESC/POS receipt formatting over any byte sink, plus the adapters that
//! deliver a formatted job to a printer.
//!
//! ## Scope
//!
//! - ESC/POS wire encoders (`escpos`)
//! - Session toggles and the node-driven [`Formatter`]
//! - Node documents loadable from JSON
//! - Debug capture of the emitted stream
//! - Delivery: Windows spooler, raw TCP (port 9100), files
//! - Image to raster conversion (optional, `image` feature)
//!
//! ## Example
//!
//! ```ignore
//! use receipt_printer::{CommandNode, Formatter, NetworkPrinter, Printer};
//!
//! let mut fmt = Formatter::new(Vec::new());
//! fmt.init()?;
//! fmt.write_node(&CommandNode::new("text").param("align", "center").param("dw", "1").payload("ORDER&#10;"))?;
//! fmt.write_node(&CommandNode::new("feed").param("line", "2"))?;
//! fmt.write_node(&CommandNode::new("cut").param("type", "feed"))?;
//!
//! let printer = NetworkPrinter::from_addr("192.168.1.100:9100")?;
//! printer.print(&fmt.into_inner()).await?;
//! ```

mod capture;
mod entities;
mod error;
pub mod escpos;
mod formatter;
mod node;
mod printer;
mod session;

#[cfg(feature = "image")]
pub mod raster;

// Re-exports
pub use capture::CaptureSink;
pub use entities::substitute_entities;
pub use error::{ConfigurationError, PrintError, PrintResult};
pub use escpos::{Alignment, Font, Language};
pub use formatter::Formatter;
pub use node::{CommandNode, NodeDocument, Params};
pub use printer::{FilePrinter, NetworkPrinter, Printer, RAW_PORT};
pub use session::SessionState;

#[cfg(windows)]
pub use printer::{SpoolerJob, WindowsPrinter};
