//! ISP bootloader USB device
//!
//! Blocking bulk transfers through nusb. Both legs of an exchange share the
//! same timeout; a leg that does not complete in time is cancelled and the
//! endpoints drained before the error is returned, so the next exchange
//! starts clean.

use std::time::Duration;

use nusb::transfer::{Buffer, Bulk, In, Out};
use nusb::{Endpoint, MaybeFuture};
use wchflash_core::protocol::{EP_IN, EP_OUT, TIMEOUT_MS, USB_PRODUCT, USB_VENDOR};
use wchflash_core::{Transport, TransportError};

use crate::error::{Result, UsbError};

/// Timeout used when draining cancelled transfers
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// IN transfer length covering `len` bytes in whole packets
fn in_request_len(len: usize, max_packet_size: usize) -> usize {
    let mps = max_packet_size.max(1);
    len.div_ceil(mps).max(1) * mps
}

/// WCH ISP bootloader reached over USB
pub struct IspUsb {
    /// Bulk OUT endpoint for requests
    out_ep: Endpoint<Bulk, Out>,
    /// Bulk IN endpoint for replies
    in_ep: Endpoint<Bulk, In>,
    timeout: Duration,
}

impl IspUsb {
    /// Open the first device in ISP mode
    pub fn open() -> Result<Self> {
        Self::open_nth(0)
    }

    /// Open the nth device in ISP mode (0-indexed)
    ///
    /// Useful when several boards sit in the bootloader at once.
    pub fn open_nth(index: usize) -> Result<Self> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == USB_VENDOR && d.product_id() == USB_PRODUCT)
            .collect();

        let device_info = devices.get(index).ok_or(UsbError::DeviceNotFound)?;

        log::info!(
            "Opening ISP device at bus {} address {}",
            device_info.bus_id(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(0)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Bulk, Out>(EP_OUT)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Bulk, In>(EP_IN)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        Ok(Self {
            out_ep,
            in_ep,
            timeout: Duration::from_millis(TIMEOUT_MS),
        })
    }

    /// List all devices currently in ISP mode
    pub fn list_devices() -> Result<Vec<IspUsbDeviceInfo>> {
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == USB_VENDOR && d.product_id() == USB_PRODUCT)
            .map(|d| IspUsbDeviceInfo {
                bus: d.bus_id().to_string(),
                address: d.device_address(),
            })
            .collect();

        Ok(devices)
    }

    /// Write a request to the OUT endpoint
    fn usb_write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError> {
        self.out_ep.submit(Buffer::from(data.to_vec()));

        let Some(completion) = self.out_ep.wait_next_complete(self.timeout) else {
            self.drain_all_pending();
            return Err(TransportError::Timeout);
        };

        completion
            .status
            .map_err(|e| TransportError::Io(format!("OUT transfer failed: {e}")))?;

        log::trace!("USB write {} bytes", data.len());
        Ok(())
    }

    /// Read up to `len` bytes of reply from the IN endpoint
    fn usb_read(&mut self, len: usize) -> std::result::Result<Vec<u8>, TransportError> {
        let request_len = in_request_len(len, self.in_ep.max_packet_size());
        let mut in_buf = Buffer::new(request_len);
        in_buf.set_requested_len(request_len);
        self.in_ep.submit(in_buf);

        let Some(completion) = self.in_ep.wait_next_complete(self.timeout) else {
            self.drain_all_pending();
            return Err(TransportError::Timeout);
        };

        completion
            .status
            .map_err(|e| TransportError::Io(format!("IN transfer failed: {e}")))?;

        let actual = completion.actual_len.min(len);
        log::trace!("USB read {} bytes", actual);
        Ok(completion.buffer[..actual].to_vec())
    }

    /// Cancel and drain all pending transfers on both endpoints
    fn drain_all_pending(&mut self) {
        self.out_ep.cancel_all();
        while self.out_ep.pending() > 0 {
            let _ = self.out_ep.wait_next_complete(DRAIN_TIMEOUT);
        }
        self.in_ep.cancel_all();
        while self.in_ep.pending() > 0 {
            let _ = self.in_ep.wait_next_complete(DRAIN_TIMEOUT);
        }
    }
}

impl Transport for IspUsb {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        self.usb_write(request)?;
        self.usb_read(response_len)
    }
}

impl Drop for IspUsb {
    fn drop(&mut self) {
        // Pending transfers must not outlive the endpoints
        self.drain_all_pending();
    }
}

/// A device currently in ISP mode
#[derive(Debug, Clone)]
pub struct IspUsbDeviceInfo {
    /// USB bus identifier
    pub bus: String,
    /// USB device address
    pub address: u8,
}

impl std::fmt::Display for IspUsbDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WCH ISP device at bus {} address {}", self.bus, self.address)
    }
}
