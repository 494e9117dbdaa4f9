//! Bootloader version handling

use core::fmt;

use crate::error::{Error, Result};

/// Bootloader version as reported by read-config
///
/// Only the low three bytes carry meaning: `0x020800` is 2.8.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BootloaderVersion(pub u32);

impl BootloaderVersion {
    /// Build a version from its components
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self(((major as u32) << 16) | ((minor as u32) << 8) | patch as u32)
    }

    /// Major component
    pub const fn major(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Minor component
    pub const fn minor(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Patch component
    pub const fn patch(self) -> u8 {
        self.0 as u8
    }

    /// Whether this bootloader answers the reboot command
    ///
    /// 2.3.x and 2.4.0 reset without replying; 2.5.0 through 2.9.0 reply.
    /// Anything else has not been seen and is refused.
    pub fn acknowledges_reboot(self) -> Result<bool> {
        match self.0 & 0x00FF_FFFF {
            0x02_03_00..=0x02_03_FF | 0x02_04_00 => Ok(false),
            0x02_05_00..=0x02_09_00 => Ok(true),
            _ => Err(Error::UnsupportedBootloader(self)),
        }
    }
}

impl fmt::Display for BootloaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BootloaderVersion(0x0002_0800).to_string(), "2.8.0");
        assert_eq!(BootloaderVersion::new(2, 3, 1).to_string(), "2.3.1");
        assert_eq!(BootloaderVersion::new(2, 9, 0).0, 0x0002_0900);
    }

    #[test]
    fn test_reboot_gating() {
        assert!(!BootloaderVersion(0x02_03_01).acknowledges_reboot().unwrap());
        assert!(!BootloaderVersion(0x02_04_00).acknowledges_reboot().unwrap());
        assert!(BootloaderVersion(0x02_05_00).acknowledges_reboot().unwrap());
        assert!(BootloaderVersion(0x02_08_00).acknowledges_reboot().unwrap());
        assert!(BootloaderVersion(0x02_09_00).acknowledges_reboot().unwrap());
    }

    #[test]
    fn test_unknown_versions_are_refused() {
        for v in [0x02_04_01, 0x02_09_01, 0x01_00_00, 0x03_00_00] {
            assert!(matches!(
                BootloaderVersion(v).acknowledges_reboot(),
                Err(Error::UnsupportedBootloader(_))
            ));
        }
    }
}
