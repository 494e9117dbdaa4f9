//! Bootloader session
//!
//! A [`Session`] owns the transport and everything learned about the chip
//! at connect time. Opening a session identifies the chip, reads its
//! configuration, checks the bootloader version and derives the XOR key,
//! so every method on an open session can rely on the profile and unique
//! ID being known.

use crate::chip::{self, ChipProfile};
use crate::error::{Error, Result, TransportError};
use crate::key::XorKey;
use crate::protocol::frames::{
    decode_padded, ChipTypeRequest, ChipTypeResponse, ReadConfigRequest, ReadConfigResponse,
    RebootRequest, Reply, Request, SetKeyRequest, SetKeyResponse, StatusResponse,
    WriteConfigRequest,
};
use crate::protocol::{Command, CONFIG_LEN, ID_LEN};
use crate::transport::Transport;
use crate::version::BootloaderVersion;

/// Send `request` and decode the reply as `R`
///
/// The reply must cover the fields the engine reads and echo the command
/// byte; anything past what the device sent reads as zero.
fn exchange<R: Reply, T: Transport>(
    transport: &mut T,
    command: Command,
    request: &[u8],
) -> Result<R> {
    exchange_counted(transport, command, request).map(|(reply, _)| reply)
}

/// Like [`exchange`], also returning how many bytes the device sent
fn exchange_counted<R: Reply, T: Transport>(
    transport: &mut T,
    command: Command,
    request: &[u8],
) -> Result<(R, usize)> {
    let bytes = transport
        .exchange(request, R::CAPACITY)
        .map_err(|source| Error::Transport { command, source })?;

    if bytes.len() < R::MIN_LEN {
        return Err(Error::Transport {
            command,
            source: TransportError::ShortResponse {
                needed: R::MIN_LEN,
                got: bytes.len(),
            },
        });
    }

    let reply: R = decode_padded(&bytes);
    let got = reply.header().command;
    if got != command.code() {
        return Err(Error::UnexpectedResponse { command, got });
    }

    Ok((reply, bytes.len()))
}

/// An open connection to an identified chip
pub struct Session<T: Transport> {
    transport: T,
    profile: &'static ChipProfile,
    version: BootloaderVersion,
    wait_reboot_response: bool,
    unique_id: [u8; ID_LEN],
    config: [u8; CONFIG_LEN],
    key: XorKey,
    key_sent: bool,
}

impl<T: Transport> Session<T> {
    /// Identify the chip behind `transport` and read its configuration
    ///
    /// Fails before any flash mutation if the chip is hosed, not in the
    /// profile table, or runs an unsupported bootloader.
    pub fn open(mut transport: T) -> Result<Self> {
        let req = ChipTypeRequest::new();
        let resp: ChipTypeResponse = exchange(&mut transport, Command::ChipType, req.wire())?;
        log::debug!(
            "Identify reply: family 0x{:02X} type 0x{:02X}",
            resp.family,
            resp.chip_type
        );
        let profile = chip::resolve(resp.family, resp.chip_type)?;
        log::info!("Found device {}", profile.name);

        let req = ReadConfigRequest::new();
        let resp: ReadConfigResponse = exchange(&mut transport, Command::ReadConfig, req.wire())?;
        let version = BootloaderVersion(resp.bootloader_version.get());
        log::info!("Bootloader version {}", version);

        let wait_reboot_response = version.acknowledges_reboot()?;

        let mut unique_id = [0u8; ID_LEN];
        let id_len = (profile.xor_key_id_len as usize).min(ID_LEN);
        unique_id[..id_len].copy_from_slice(&resp.id[..id_len]);

        let key = XorKey::for_profile(profile, &unique_id[..id_len]);

        let session = Self {
            transport,
            profile,
            version,
            wait_reboot_response,
            unique_id,
            config: resp.config,
            key,
            key_sent: false,
        };
        log::info!("Unique chip ID {}", session.formatted_id());

        Ok(session)
    }

    /// Profile of the identified chip
    pub fn profile(&self) -> &'static ChipProfile {
        self.profile
    }

    /// Bootloader version
    pub fn bootloader_version(&self) -> BootloaderVersion {
        self.version
    }

    /// Whether the bootloader answers the reboot command
    pub fn waits_for_reboot_response(&self) -> bool {
        self.wait_reboot_response
    }

    /// Unique ID bytes that feed the key
    pub fn unique_id(&self) -> &[u8] {
        &self.unique_id[..(self.profile.xor_key_id_len as usize).min(ID_LEN)]
    }

    /// Unique ID bytes worth showing to a user
    pub fn display_id(&self) -> &[u8] {
        &self.unique_id[..self.profile.display_id_len().min(ID_LEN)]
    }

    /// Displayable unique ID, e.g. `5a-3c-91-07`
    pub fn formatted_id(&self) -> String {
        self.display_id()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Configuration bytes exactly as read from the device
    pub fn config(&self) -> &[u8; CONFIG_LEN] {
        &self.config
    }

    /// Session XOR key
    pub fn key(&self) -> &XorKey {
        &self.key
    }

    /// Whether the device has acknowledged the key
    pub fn key_sent(&self) -> bool {
        self.key_sent
    }

    /// Configuration bytes as they will be written back
    ///
    /// The write-protect sentinel and ROM-read bit fixups are applied to a
    /// copy; the bytes returned by [`config`](Self::config) never change.
    pub fn config_for_write(&self) -> [u8; CONFIG_LEN] {
        let mut config = self.config;

        if self.profile.need_remove_wp() && config[0] == 0xFF {
            config[0] = 0xA5;
        }
        if self.profile.clear_cfg_rom_read() {
            config[8] &= !0x80;
        }

        config
    }

    /// Write the configuration back with the per-chip fixups applied
    pub fn write_config(&mut self) -> Result<()> {
        let req = WriteConfigRequest::new(self.config_for_write());
        log::debug!("Writing config {:02X?}", req.config);
        self.status(Command::WriteConfig, req.wire())
    }

    /// Send the key and check the checksum the device echoes
    ///
    /// The key is exchanged once per session; later calls do nothing.
    pub fn send_key(&mut self) -> Result<()> {
        if self.key_sent {
            return Ok(());
        }

        let req = SetKeyRequest::new();
        let resp: SetKeyResponse = self.exchange(Command::SetKey, req.wire())?;

        let expected = self.key.checksum();
        let got = resp.key_checksum.get();
        if got != expected as u16 {
            return Err(Error::KeyRefused { expected, got });
        }

        log::debug!("Key accepted (checksum 0x{:02X})", expected);
        self.key_sent = true;
        Ok(())
    }

    /// Leave ISP mode and run the user program
    ///
    /// Bootloaders that reset without answering are not waited on; any
    /// transport result is ignored for them.
    pub fn reboot(&mut self) -> Result<()> {
        let req = RebootRequest::new();

        if !self.wait_reboot_response {
            // This bootloader never answers, so only a timeout is expected
            match self.transport.exchange(req.wire(), StatusResponse::CAPACITY) {
                Ok(_) | Err(TransportError::Timeout) => log::debug!("Reboot sent"),
                Err(e) => log::warn!("Reboot request may not have reached the device: {}", e),
            }
            return Ok(());
        }

        self.status(Command::Reboot, req.wire())
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn exchange<R: Reply>(&mut self, command: Command, request: &[u8]) -> Result<R> {
        exchange(&mut self.transport, command, request)
    }

    /// Exchange a request whose reply length varies, returning the bytes received
    pub(crate) fn exchange_counted<R: Reply>(
        &mut self,
        command: Command,
        request: &[u8],
    ) -> Result<(R, usize)> {
        exchange_counted(&mut self.transport, command, request)
    }

    /// Exchange a request answered by a bare return code
    pub(crate) fn status(&mut self, command: Command, request: &[u8]) -> Result<()> {
        let resp: StatusResponse = self.exchange(command, request)?;
        match resp.return_code.get() {
            0 => Ok(()),
            code => Err(Error::Rejected { command, code }),
        }
    }

    /// Fail unless the device has acknowledged the key
    pub(crate) fn require_key(&self) -> Result<()> {
        if self.key_sent {
            Ok(())
        } else {
            Err(Error::KeyNotSent)
        }
    }
}
