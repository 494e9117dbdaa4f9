//! Error types for the USB transport

use thiserror::Error;
use wchflash_core::protocol::{USB_PRODUCT, USB_VENDOR};

/// Result type for USB setup
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur while opening the bootloader over USB
///
/// Failures during an exchange are reported as
/// [`TransportError`](wchflash_core::TransportError) instead.
#[derive(Debug, Error)]
pub enum UsbError {
    /// No device in ISP mode
    #[error(
        "no WCH ISP device found (VID:{:04x} PID:{:04x}); is the chip in bootloader mode?",
        USB_VENDOR,
        USB_PRODUCT
    )]
    DeviceNotFound,

    /// Failed to open the device
    #[error("failed to open the ISP device: {0}")]
    OpenFailed(String),

    /// Failed to claim the interface or its endpoints
    #[error("failed to claim interface: {0}")]
    ClaimFailed(String),
}
