//! XOR key derivation
//!
//! The bootloader expects every write and compare payload to be XORed with
//! an 8-byte key derived from the chip's unique ID. This is obfuscation,
//! not cryptography.

use crate::chip::ChipProfile;

/// Length of the XOR key
pub const XOR_KEY_LEN: usize = 8;

/// Session XOR key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorKey([u8; XOR_KEY_LEN]);

impl XorKey {
    /// Derive the key from the ID bytes that feed it and the chip type
    ///
    /// Every byte is the truncated sum of `id`; the last byte additionally
    /// has `chip_type` added, wrapping.
    pub fn derive(id: &[u8], chip_type: u8) -> Self {
        let sum = id.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let mut key = [sum; XOR_KEY_LEN];
        key[XOR_KEY_LEN - 1] = key[XOR_KEY_LEN - 1].wrapping_add(chip_type);
        Self(key)
    }

    /// Derive the key for `profile` from the full unique ID field
    pub fn for_profile(profile: &ChipProfile, unique_id: &[u8]) -> Self {
        let len = (profile.xor_key_id_len as usize).min(unique_id.len());
        Self::derive(&unique_id[..len], profile.chip_type)
    }

    /// Truncated sum of the key bytes, as echoed by set-key
    pub fn checksum(&self) -> u8 {
        self.0.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
    }

    /// Key bytes
    pub fn as_bytes(&self) -> &[u8; XOR_KEY_LEN] {
        &self.0
    }

    /// XOR `buf` in place with the key, repeating every 8 bytes
    ///
    /// Applying it twice restores the input.
    pub fn apply(&self, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b ^= self.0[i % XOR_KEY_LEN];
        }
    }
}

impl From<[u8; XOR_KEY_LEN]> for XorKey {
    fn from(bytes: [u8; XOR_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::find_by_name;

    #[test]
    fn test_derive() {
        let key = XorKey::derive(&[0x10, 0x20, 0x30, 0x40], 0x52);
        assert_eq!(
            key.as_bytes(),
            &[0xA0, 0xA0, 0xA0, 0xA0, 0xA0, 0xA0, 0xA0, 0xF2]
        );
    }

    #[test]
    fn test_derive_wraps() {
        let key = XorKey::derive(&[0xFF, 0xFF, 0x03], 0xF0);
        // 0xFF + 0xFF + 0x03 = 0x201 -> 0x01; 0x01 + 0xF0 = 0xF1
        assert_eq!(key.as_bytes()[0], 0x01);
        assert_eq!(key.as_bytes()[7], 0xF1);
    }

    #[test]
    fn test_derive_is_order_independent() {
        let a = XorKey::derive(&[1, 2, 3, 4, 5, 6, 7, 8], 0x79);
        let b = XorKey::derive(&[8, 6, 4, 2, 1, 3, 5, 7], 0x79);
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncating_the_id_changes_the_key() {
        let id = [1, 2, 3, 4, 5, 6, 7, 8];
        let full = XorKey::derive(&id, 0x79);
        let short = XorKey::derive(&id[..7], 0x79);
        assert_ne!(full, short);
    }

    #[test]
    fn test_for_profile_uses_xor_key_id_len() {
        let id = [1, 2, 3, 4, 5, 6, 7, 8];

        let ch552 = find_by_name("CH552").unwrap();
        assert_eq!(
            XorKey::for_profile(ch552, &id),
            XorKey::derive(&id[..4], 0x52)
        );

        // CH579 has 7 ID bytes but the checksum byte feeds the key too
        let ch579 = find_by_name("CH579").unwrap();
        assert_eq!(XorKey::for_profile(ch579, &id), XorKey::derive(&id, 0x79));
    }

    #[test]
    fn test_checksum() {
        let key = XorKey::derive(&[0x10, 0x20, 0x30, 0x40], 0x52);
        // 7 * 0xA0 + 0xF2 = 0x5B2 -> 0xB2
        assert_eq!(key.checksum(), 0xB2);
    }

    #[test]
    fn test_apply_is_involutive() {
        let key = XorKey::from([0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        let plain: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        let mut buf = plain.clone();
        key.apply(&mut buf);
        assert_ne!(buf, plain);
        assert_eq!(buf[0], 0x11);
        assert_eq!(buf[8], 8 ^ 0x11);
        key.apply(&mut buf);
        assert_eq!(buf, plain);
    }
}
