//! Table of supported chips
//!
//! Entries are sorted by family, then type. Lookup is an exact match on
//! the `(family, type)` pair; there is no fallback profile.

use super::{ChipProfile, Quirks};
use crate::error::{Error, Result};

/// Build an entry, deriving ID lengths and quirks from the family
const fn chip(name: &'static str, family: u8, chip_type: u8, code: u32, data: u32) -> ChipProfile {
    let mcu_id_len = if family >= 0x12 { 8 } else { 4 };

    let mut quirks = Quirks::empty();
    if (family == 0x13 && chip_type == 0x79) || family == 0x23 {
        quirks = quirks.union(Quirks::CLEAR_CFG_ROM_READ);
    }
    if family >= 0x14 {
        quirks = quirks.union(Quirks::REMOVE_WP);
    }
    if family == 0x12 || family >= 0x14 {
        quirks = quirks.union(Quirks::LAST_WRITE);
    }

    ChipProfile {
        name,
        family,
        chip_type,
        code_flash_size: code,
        data_flash_size: data,
        mcu_id_len,
        xor_key_id_len: mcu_id_len,
        quirks,
    }
}

/// CH579 reports 7 ID bytes followed by a checksum byte that also feeds the key
const fn ch579() -> ChipProfile {
    let mut profile = chip("CH579", 0x13, 0x79, 256_000, 2048);
    profile.mcu_id_len = 7;
    profile
}

/// All supported chips
pub static PROFILES: &[ChipProfile] = &[
    // CH55x
    chip("CH551", 0x11, 0x51, 10_240, 128),
    chip("CH552", 0x11, 0x52, 14_336, 128),
    chip("CH553", 0x11, 0x53, 10_240, 128),
    chip("CH554", 0x11, 0x54, 14_336, 128),
    chip("CH555", 0x11, 0x55, 61_440, 1024),
    chip("CH556", 0x11, 0x56, 61_440, 1024),
    chip("CH557", 0x11, 0x57, 61_440, 1024),
    chip("CH558", 0x11, 0x58, 32_768, 5120),
    chip("CH559", 0x11, 0x59, 61_440, 1024),
    // CH54x
    chip("CH546", 0x12, 0x46, 32_768, 1024),
    chip("CH547", 0x12, 0x47, 61_440, 1024),
    chip("CH548", 0x12, 0x48, 32_768, 1024),
    chip("CH549", 0x12, 0x49, 61_440, 1024),
    // CH57x
    chip("CH571", 0x13, 0x71, 196_608, 32_768),
    chip("CH573", 0x13, 0x73, 458_752, 32_768),
    ch579(),
    // CH32F103
    chip("CH32F103", 0x14, 0x3F, 65_536, 0),
    // CH32V103
    chip("CH32V103", 0x15, 0x3F, 65_536, 0),
    // CH58x
    chip("CH581", 0x16, 0x81, 196_608, 32_768),
    chip("CH582", 0x16, 0x82, 458_752, 32_768),
    chip("CH583", 0x16, 0x83, 458_752, 32_768),
    // CH32V30x
    chip("CH32V303VCT6", 0x17, 0x30, 262_144, 0),
    chip("CH32V305RBT6", 0x17, 0x50, 131_072, 0),
    chip("CH32V307VCT6", 0x17, 0x70, 262_144, 0),
    // CH32V20x
    chip("CH32V203C8T6", 0x19, 0x30, 65_536, 0),
    chip("CH32V208WBU6", 0x19, 0x80, 131_072, 0),
    // CH32V00x
    chip("CH32V003", 0x21, 0x30, 16_384, 0),
    // CH32X035
    chip("CH32X035", 0x23, 0x50, 63_488, 0),
];

/// Find the profile for an exact `(family, chip_type)` match
pub fn find_profile(family: u8, chip_type: u8) -> Option<&'static ChipProfile> {
    PROFILES
        .iter()
        .find(|p| p.family == family && p.chip_type == chip_type)
}

/// Find a profile by name (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static ChipProfile> {
    PROFILES.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Resolve the identification reply to a profile
///
/// Family 0 means the bootloader is wedged and needs a power cycle. An
/// unknown pair is refused rather than guessed.
pub fn resolve(family: u8, chip_type: u8) -> Result<&'static ChipProfile> {
    if family == 0 {
        return Err(Error::ChipHosed);
    }

    find_profile(family, chip_type).ok_or(Error::UnsupportedChip { family, chip_type })
}
