//! ISP bootloader protocol constants and frame layouts
//!
//! Every request is a 3-byte header (`command`, little-endian `data_len`)
//! followed by a command-specific payload. Every response is a 4-byte
//! header whose length field is a single byte, followed by the reply
//! payload. The layouts live in [`frames`].

pub mod frames;

use core::fmt;

/// USB vendor ID of the bootloader
pub const USB_VENDOR: u16 = 0x4348;
/// USB product ID of the bootloader
pub const USB_PRODUCT: u16 = 0x55E0;
/// Bulk OUT endpoint
pub const EP_OUT: u8 = 0x02;
/// Bulk IN endpoint
pub const EP_IN: u8 = 0x82;
/// Timeout for each leg of an exchange, long enough for a full erase
pub const TIMEOUT_MS: u64 = 5000;

/// Tag carried by the identify request
pub const CHIP_TAG: &[u8; 16] = b"MCU ISP & WCH.CN";

/// Data bytes per write/compare chunk
pub const CHUNK_SIZE: usize = 56;
/// Data bytes per data-flash read reply
pub const READ_CHUNK_SIZE: usize = 58;

/// Length of the opaque configuration block
pub const CONFIG_LEN: usize = 12;
/// Length of the unique ID field in the read-config reply
pub const ID_LEN: usize = 8;
/// Config selector for read-config
pub const READ_CONFIG_MASK: u16 = 0x1F;
/// Config selector for write-config
pub const WRITE_CONFIG_MASK: u16 = 0x07;

/// `data_len` the set-key request declares
pub const SET_KEY_DATA_LEN: u16 = 0x1E;
/// Reboot option byte: run the user program
pub const REBOOT_OPTION: u8 = 0x01;

/// Code-flash erase unit
pub const ERASE_BLOCK_SIZE: usize = 1024;
/// Minimum number of code-flash erase blocks
pub const MIN_CODE_ERASE_BLOCKS: usize = 8;
/// Minimum number of data-flash erase blocks
pub const MIN_DATA_ERASE_BLOCKS: usize = 1;

/// Protocol commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Identify the chip family and type
    ChipType = 0xA1,
    /// Leave ISP mode and restart
    Reboot = 0xA2,
    /// Exchange the XOR key
    SetKey = 0xA3,
    /// Erase code flash
    EraseCodeFlash = 0xA4,
    /// Write one code-flash chunk
    WriteCodeFlash = 0xA5,
    /// Compare one code-flash chunk
    CompareCodeFlash = 0xA6,
    /// Read bootloader version, unique ID and config
    ReadConfig = 0xA7,
    /// Write config
    WriteConfig = 0xA8,
    /// Erase data flash
    EraseDataFlash = 0xA9,
    /// Write one data-flash chunk
    WriteDataFlash = 0xAA,
    /// Read one data-flash chunk
    ReadDataFlash = 0xAB,
}

impl Command {
    /// All commands, in code order
    pub const ALL: [Command; 11] = [
        Command::ChipType,
        Command::Reboot,
        Command::SetKey,
        Command::EraseCodeFlash,
        Command::WriteCodeFlash,
        Command::CompareCodeFlash,
        Command::ReadConfig,
        Command::WriteConfig,
        Command::EraseDataFlash,
        Command::WriteDataFlash,
        Command::ReadDataFlash,
    ];

    /// Wire value
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a command by its wire value
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Command::ChipType => "identify chip",
            Command::Reboot => "reboot",
            Command::SetKey => "set key",
            Command::EraseCodeFlash => "erase code flash",
            Command::WriteCodeFlash => "write code flash",
            Command::CompareCodeFlash => "check code flash",
            Command::ReadConfig => "read config",
            Command::WriteConfig => "write config",
            Command::EraseDataFlash => "erase data flash",
            Command::WriteDataFlash => "write data flash",
            Command::ReadDataFlash => "read data flash",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
