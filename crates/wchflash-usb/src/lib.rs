//! wchflash-usb - USB transport for the WCH ISP bootloader
//!
//! Chips in ISP mode enumerate as VID 0x4348 PID 0x55E0 and talk over a
//! pair of bulk endpoints. Each exchange is one OUT transfer carrying the
//! request followed by one IN transfer carrying the reply.
//!
//! # Example
//!
//! ```no_run
//! use wchflash_core::Session;
//! use wchflash_usb::IspUsb;
//!
//! let usb = IspUsb::open()?;
//! let session = Session::open(usb)?;
//! println!("Found {}", session.profile().name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;

pub use device::{IspUsb, IspUsbDeviceInfo};
pub use error::{Result, UsbError};
