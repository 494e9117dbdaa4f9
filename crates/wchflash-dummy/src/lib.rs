//! wchflash-dummy - Simulated ISP bootloader
//!
//! [`SimulatedDevice`] answers the bootloader protocol for any chip in the
//! profile table, keeping code and data flash in memory. It decrypts
//! writes with the session key like the real bootloader does, so a full
//! flash sequence can run against it without hardware. Faults can be
//! injected to exercise the error paths.

use std::collections::HashSet;

use wchflash_core::chip::{self, ChipProfile};
use wchflash_core::key::XorKey;
use wchflash_core::protocol::frames::{
    decode_padded, ChipTypeResponse, ChunkRequest, EraseCodeFlashRequest,
    EraseDataFlashRequest, ReadConfigResponse, ReadDataFlashRequest, ReadDataFlashResponse,
    SetKeyResponse, StatusResponse, WriteConfigRequest,
};
use wchflash_core::protocol::{Command, CONFIG_LEN, ERASE_BLOCK_SIZE, ID_LEN, READ_CHUNK_SIZE};
use wchflash_core::{BootloaderVersion, Transport, TransportError};
use zerocopy::IntoBytes;

/// Return code for a refused chunk or erase
const REFUSED: u16 = 0xFE;
/// Return code for a compare that found different bytes
const MISMATCH: u16 = 0xF5;

/// A misbehaviour to inject
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Refuse the chunk of `command` at `offset`
    RejectChunk {
        /// Chunked command to refuse
        command: Command,
        /// Chunk offset
        offset: u32,
    },
    /// Flip every bit of the data-flash byte at this offset on read-back
    CorruptDataFlash(usize),
    /// Report family 0 on identify
    Hosed,
    /// Echo a key checksum off by one
    WrongKeyChecksum,
}

/// An in-memory bootloader
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    profile: &'static ChipProfile,
    version: BootloaderVersion,
    unique_id: [u8; ID_LEN],
    config: [u8; CONFIG_LEN],
    code_flash: Vec<u8>,
    data_flash: Vec<u8>,
    key: Option<XorKey>,
    faults: HashSet<Fault>,
    history: Vec<Command>,
    rebooted: bool,
}

impl SimulatedDevice {
    /// Simulate `profile` with a 2.8.0 bootloader and erased flash
    pub fn new(profile: &'static ChipProfile) -> Self {
        let mut unique_id = [0x5A, 0x3C, 0x91, 0x07, 0x12, 0x34, 0x56, 0x78];
        // Chips that append a checksum to their ID report it last
        if profile.xor_key_id_len > profile.mcu_id_len {
            let n = (profile.mcu_id_len as usize).min(ID_LEN - 1);
            unique_id[n] = unique_id[..n].iter().fold(0u8, |a, &b| a.wrapping_add(b));
        }

        Self {
            profile,
            version: BootloaderVersion::new(2, 8, 0),
            unique_id,
            config: [0xFF; CONFIG_LEN],
            code_flash: vec![0xFF; profile.code_flash_len()],
            data_flash: vec![0xFF; profile.data_flash_len()],
            key: None,
            faults: HashSet::new(),
            history: Vec::new(),
            rebooted: false,
        }
    }

    /// Simulate the chip called `name`
    pub fn for_chip(name: &str) -> Option<Self> {
        chip::find_by_name(name).map(Self::new)
    }

    /// Report `version` as the bootloader version
    pub fn with_version(mut self, version: BootloaderVersion) -> Self {
        self.version = version;
        self
    }

    /// Report `id` as the unique ID
    pub fn with_unique_id(mut self, id: [u8; ID_LEN]) -> Self {
        self.unique_id = id;
        self
    }

    /// Start with `config` as the configuration bytes
    pub fn with_config(mut self, config: [u8; CONFIG_LEN]) -> Self {
        self.config = config;
        self
    }

    /// Inject `fault`
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.insert(fault);
        self
    }

    /// Simulated chip
    pub fn profile(&self) -> &'static ChipProfile {
        self.profile
    }

    /// Code flash contents
    pub fn code_flash(&self) -> &[u8] {
        &self.code_flash
    }

    /// Data flash contents
    pub fn data_flash(&self) -> &[u8] {
        &self.data_flash
    }

    /// Mutable data flash contents
    pub fn data_flash_mut(&mut self) -> &mut [u8] {
        &mut self.data_flash
    }

    /// Current configuration bytes
    pub fn config(&self) -> &[u8; CONFIG_LEN] {
        &self.config
    }

    /// Whether a key has been exchanged
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Whether the device was told to run the user program
    pub fn rebooted(&self) -> bool {
        self.rebooted
    }

    /// Commands received so far, in order
    pub fn history(&self) -> &[Command] {
        &self.history
    }

    fn status(command: Command, code: u16) -> Vec<u8> {
        StatusResponse::new(command.code(), code).as_bytes().to_vec()
    }

    fn refuses(&self, command: Command, offset: u32) -> bool {
        self.faults
            .contains(&Fault::RejectChunk { command, offset })
    }

    fn identify(&self) -> Vec<u8> {
        let family = if self.faults.contains(&Fault::Hosed) {
            0
        } else {
            self.profile.family
        };
        ChipTypeResponse::new(self.profile.chip_type, family)
            .as_bytes()
            .to_vec()
    }

    fn set_key(&mut self) -> Vec<u8> {
        let id_len = (self.profile.xor_key_id_len as usize).min(ID_LEN);
        let key = XorKey::for_profile(self.profile, &self.unique_id[..id_len]);
        let mut checksum = key.checksum() as u16;
        if self.faults.contains(&Fault::WrongKeyChecksum) {
            checksum = (checksum + 1) & 0xFF;
        }
        self.key = Some(key);
        SetKeyResponse::new(checksum).as_bytes().to_vec()
    }

    fn erase_code(&mut self, request: &[u8]) -> Vec<u8> {
        let req: EraseCodeFlashRequest = decode_padded(request);
        let len = (req.blocks.get() as usize * ERASE_BLOCK_SIZE).min(self.code_flash.len());
        log::debug!("sim: erase {} bytes of code flash", len);
        self.code_flash[..len].fill(0xFF);
        Self::status(Command::EraseCodeFlash, 0)
    }

    fn erase_data(&mut self, request: &[u8]) -> Vec<u8> {
        let req: EraseDataFlashRequest = decode_padded(request);
        if self.data_flash.is_empty() {
            return Self::status(Command::EraseDataFlash, REFUSED);
        }
        let len = (req.blocks as usize * ERASE_BLOCK_SIZE).min(self.data_flash.len());
        log::debug!("sim: erase {} bytes of data flash", len);
        self.data_flash[..len].fill(0xFF);
        Self::status(Command::EraseDataFlash, 0)
    }

    /// Write or compare one chunk, decrypting it with the session key
    fn chunk(&mut self, command: Command, request: &[u8]) -> Vec<u8> {
        let req: ChunkRequest = decode_padded(request);
        let offset = req.offset.get();
        let Some(key) = self.key else {
            return Self::status(command, REFUSED);
        };
        if self.refuses(command, offset) {
            return Self::status(command, REFUSED);
        }

        let mut data = req.payload().to_vec();
        key.apply(&mut data);

        let flash = match command {
            Command::WriteDataFlash => &mut self.data_flash,
            _ => &mut self.code_flash,
        };
        let start = offset as usize;
        let Some(target) = flash.get_mut(start..start + data.len()) else {
            return Self::status(command, REFUSED);
        };

        let code = match command {
            Command::CompareCodeFlash if *target != data[..] => MISMATCH,
            Command::CompareCodeFlash => 0,
            _ => {
                // Programming only clears bits
                for (dst, src) in target.iter_mut().zip(&data) {
                    *dst &= *src;
                }
                0
            }
        };
        Self::status(command, code)
    }

    fn read_data(&self, request: &[u8]) -> Vec<u8> {
        let req: ReadDataFlashRequest = decode_padded(request);
        let start = req.offset.get() as usize;
        let len = (req.len.get() as usize).min(READ_CHUNK_SIZE);

        let Some(src) = self.data_flash.get(start..start + len) else {
            return ReadDataFlashResponse::new(REFUSED, &[]).as_bytes().to_vec();
        };
        let mut data = src.to_vec();
        for fault in &self.faults {
            if let Fault::CorruptDataFlash(at) = *fault {
                if let Some(b) = at.checked_sub(start).and_then(|i| data.get_mut(i)) {
                    *b = !*b;
                }
            }
        }

        ReadDataFlashResponse::new(0, &data).as_bytes().to_vec()
    }

    fn handle(&mut self, command: Command, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let reply = match command {
            Command::ChipType => self.identify(),
            Command::ReadConfig => {
                ReadConfigResponse::new(self.config, self.version.0, self.unique_id)
                    .as_bytes()
                    .to_vec()
            }
            Command::WriteConfig => {
                let req: WriteConfigRequest = decode_padded(request);
                self.config = req.config;
                Self::status(command, 0)
            }
            Command::SetKey => self.set_key(),
            Command::EraseCodeFlash => self.erase_code(request),
            Command::EraseDataFlash => self.erase_data(request),
            Command::WriteCodeFlash | Command::CompareCodeFlash | Command::WriteDataFlash => {
                self.chunk(command, request)
            }
            Command::ReadDataFlash => self.read_data(request),
            Command::Reboot => {
                self.rebooted = true;
                // Older bootloaders reset without answering
                if !self.version.acknowledges_reboot().unwrap_or(true) {
                    return Err(TransportError::Timeout);
                }
                Self::status(command, 0)
            }
        };
        Ok(reply)
    }
}

impl Transport for SimulatedDevice {
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        if self.rebooted {
            return Err(TransportError::Io("device left ISP mode".into()));
        }

        let Some(command) = request.first().copied().and_then(Command::from_code) else {
            log::debug!("sim: ignoring unknown request {:02X?}", request.first());
            return Err(TransportError::Timeout);
        };
        self.history.push(command);

        let mut reply = self.handle(command, request)?;
        reply.truncate(response_len);
        Ok(reply)
    }
}
