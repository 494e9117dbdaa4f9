//! Opening the link selected by a programmer string

use wchflash_core::Transport;

use crate::programmers::ProgrammerSpec;
use crate::trace::Traced;

/// Open the transport for `spec`, wrapped in a tracer when `debug` is set
pub fn open_transport(
    spec: &ProgrammerSpec,
    debug: bool,
) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
    let transport = open_raw(spec)?;
    if debug {
        Ok(Box::new(Traced::new(transport)))
    } else {
        Ok(transport)
    }
}

#[allow(unreachable_patterns, unused_variables)]
fn open_raw(spec: &ProgrammerSpec) -> Result<Box<dyn Transport>, Box<dyn std::error::Error>> {
    match spec {
        #[cfg(feature = "usb")]
        ProgrammerSpec::Usb { index } => {
            log::info!("Opening USB bootloader...");
            let usb = wchflash_usb::IspUsb::open_nth(*index).map_err(|e| {
                format!(
                    "{}\nMake sure the chip is in bootloader mode and you have permissions.",
                    e
                )
            })?;
            Ok(Box::new(usb))
        }
        #[cfg(feature = "serial")]
        ProgrammerSpec::Serial { device, baud } => {
            let port = wchflash_serial::SerialTransport::open(device, *baud)
                .map_err(|e| format!("Failed to open serial port {}: {}", device, e))?;
            Ok(Box::new(port))
        }
        #[cfg(feature = "dummy")]
        ProgrammerSpec::Dummy { chip } => {
            let name = chip.as_deref().unwrap_or("CH552");
            let device = wchflash_dummy::SimulatedDevice::for_chip(name)
                .ok_or_else(|| format!("No such chip to simulate: {}", name))?;
            log::info!("Simulating {}", device.profile().name);
            Ok(Box::new(device))
        }
        _ => Err(format!("Support for {:?} is not compiled in", spec).into()),
    }
}
