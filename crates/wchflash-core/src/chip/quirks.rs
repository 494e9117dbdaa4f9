//! Per-family protocol quirks

use bitflags::bitflags;

bitflags! {
    /// Behaviour differences between chip families
    ///
    /// These are independent toggles; a chip can carry any combination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Quirks: u8 {
        /// Config byte 0 holds a write-protect sentinel (0xFF) that must be
        /// replaced with 0xA5 before flashing
        const REMOVE_WP          = 1 << 0;
        /// Code-flash writes must be committed with a trailing empty chunk
        const LAST_WRITE         = 1 << 1;
        /// Bit 7 of config byte 8 must be cleared before flashing
        const CLEAR_CFG_ROM_READ = 1 << 2;
    }
}

impl Quirks {
    /// Short names of the set flags, for listings
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
