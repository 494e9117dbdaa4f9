//! Serial port transport

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use wchflash_core::protocol::TIMEOUT_MS;
use wchflash_core::{Transport, TransportError};

use crate::error::Result;
use crate::framing;

/// Baud rate the bootloader listens at
pub const DEFAULT_BAUD: u32 = 115_200;

/// ISP bootloader reached over a serial line
pub struct SerialTransport<P = Box<dyn SerialPort>> {
    port: P,
}

impl SerialTransport {
    /// Open `device` at `baud` (115200 when `None`), 8N1, no flow control
    pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
        let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(TIMEOUT_MS))
            .open()?;

        // Stale bytes from a previous session would desync the framing
        port.clear(serialport::ClearBuffer::All)?;

        log::info!("Opened serial port {} at {} baud", device, baud_rate);

        Ok(Self { port })
    }
}

impl<P: Read + Write> SerialTransport<P> {
    /// Use an already configured port
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Give the port back
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: Read + Write> Transport for SerialTransport<P> {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let frame = framing::encode(request);
        self.port.write_all(&frame)?;
        self.port.flush()?;
        log::trace!("serial write {} bytes", frame.len());

        let mut response = framing::read_frame(&mut self.port)?;
        log::trace!("serial read {} bytes", response.len() + 3);

        response.truncate(response_len);
        Ok(response)
    }
}
