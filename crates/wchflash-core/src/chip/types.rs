//! Chip profile definition

use super::Quirks;

/// Static description of a supported chip
///
/// Identity is the `(family, chip_type)` pair reported by the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProfile {
    /// Marketing name (e.g., "CH552")
    pub name: &'static str,
    /// Family code (CH55x -> 0x11, CH57x -> 0x13, ...)
    pub family: u8,
    /// Type code within the family (CH554 -> 0x54, ...)
    pub chip_type: u8,
    /// Code flash size in bytes
    pub code_flash_size: u32,
    /// Data flash size in bytes (0 if the chip has none)
    pub data_flash_size: u32,
    /// Number of meaningful unique ID bytes
    pub mcu_id_len: u8,
    /// Number of ID bytes summed into the XOR key
    ///
    /// May exceed `mcu_id_len` by one when the device appends a checksum.
    pub xor_key_id_len: u8,
    /// Protocol quirks
    pub quirks: Quirks,
}

impl ChipProfile {
    /// Config write-protect sentinel must be cleared before flashing
    pub fn need_remove_wp(&self) -> bool {
        self.quirks.contains(Quirks::REMOVE_WP)
    }

    /// Code-flash writes end with an empty chunk
    pub fn need_last_write(&self) -> bool {
        self.quirks.contains(Quirks::LAST_WRITE)
    }

    /// Config ROM-read bit must be cleared before flashing
    pub fn clear_cfg_rom_read(&self) -> bool {
        self.quirks.contains(Quirks::CLEAR_CFG_ROM_READ)
    }

    /// Whether the chip has a data flash region
    pub fn has_data_flash(&self) -> bool {
        self.data_flash_size > 0
    }

    /// Number of unique ID bytes worth displaying
    pub fn display_id_len(&self) -> usize {
        self.mcu_id_len.min(self.xor_key_id_len) as usize
    }

    /// Code flash size in bytes
    pub fn code_flash_len(&self) -> usize {
        self.code_flash_size as usize
    }

    /// Data flash size in bytes
    pub fn data_flash_len(&self) -> usize {
        self.data_flash_size as usize
    }
}
