//! wchflash-core - Protocol engine for the WCH ISP bootloader
//!
//! This crate drives the in-system-programming bootloader found in the
//! WinChipHead CH5xx and CH32 microcontroller families. It knows how to
//! identify a chip, read and write its configuration, derive and exchange
//! the XOR key, and move firmware and data-flash images in and out of the
//! device. It does not know how bytes reach the device: that is the job of
//! a [`Transport`] implementation (see the `wchflash-usb` and
//! `wchflash-serial` crates).
//!
//! # Layers
//!
//! - [`chip`] - static table of supported chips and their quirks
//! - [`protocol`] - command codes and fixed wire layouts
//! - [`transport`] - the single `exchange` primitive
//! - [`session`] - the device session: identification, config, key, reboot
//! - [`key`] and [`content`] - XOR key derivation and buffer encryption
//! - [`flash`] - chunked erase/write/compare/read state machine
//! - [`sequence`] - the ordered operation sequence used by the CLI
//!
//! # Example
//!
//! ```ignore
//! use wchflash_core::sequence::{self, Plan};
//! use wchflash_core::{FsStore, NoProgress, Session};
//!
//! fn flash<T: wchflash_core::Transport>(transport: T) -> wchflash_core::Result<()> {
//!     let mut session = Session::open(transport)?;
//!     let plan = Plan {
//!         code_flash: Some("firmware.bin".into()),
//!         ..Plan::default()
//!     };
//!     sequence::run(&mut session, &plan, &mut FsStore, &mut NoProgress)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip;
pub mod content;
pub mod error;
pub mod flash;
pub mod key;
pub mod progress;
pub mod protocol;
pub mod sequence;
pub mod session;
pub mod store;
pub mod transport;
pub mod version;

pub use content::{Content, Encryption};
pub use error::{Error, ErrorKind, Result, TransportError};
pub use progress::{NoProgress, Phase, Progress};
pub use session::Session;
pub use store::{ContentStore, FsStore};
pub use transport::Transport;
pub use version::BootloaderVersion;
