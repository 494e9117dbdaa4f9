//! wchflash-serial - Serial transport for the WCH ISP bootloader
//!
//! Bootloaders that listen on a UART take the same requests as over USB,
//! wrapped in a small frame: a two byte magic, the request, and a one byte
//! additive checksum. Replies come back framed the same way with their
//! own magic.
//!
//! The link runs at 115200 baud, 8N1, raw, no flow control.
//!
//! # Example
//!
//! ```no_run
//! use wchflash_core::Session;
//! use wchflash_serial::SerialTransport;
//!
//! let port = SerialTransport::open("/dev/ttyUSB0", None)?;
//! let session = Session::open(port)?;
//! println!("Found {}", session.profile().name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
pub mod framing;
mod port;

pub use error::{Result, SerialError};
pub use port::{SerialTransport, DEFAULT_BAUD};
