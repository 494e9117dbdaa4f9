//! Progress reporting for long-running flash operations

use core::fmt;

/// A flash operation that reports progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Erasing code flash
    EraseCode,
    /// Writing code flash
    WriteCode,
    /// Device-side compare of code flash
    VerifyCode,
    /// Erasing data flash
    EraseData,
    /// Writing data flash
    WriteData,
    /// Reading data flash back
    ReadData,
}

impl Phase {
    /// Short label for progress bars
    pub fn label(self) -> &'static str {
        match self {
            Self::EraseCode => "Erasing code flash",
            Self::WriteCode => "Writing code flash",
            Self::VerifyCode => "Verifying code flash",
            Self::EraseData => "Erasing data flash",
            Self::WriteData => "Writing data flash",
            Self::ReadData => "Reading data flash",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Progress callback for flash operations
///
/// Erase phases report a total of 0 bytes: the device erases in a single
/// exchange.
pub trait Progress {
    /// Called when a phase starts, with the number of bytes it will move
    fn start(&mut self, phase: Phase, total: usize);

    /// Called after each chunk with the cumulative byte count
    fn advance(&mut self, done: usize);

    /// Called when the phase completed successfully
    fn finish(&mut self, phase: Phase);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase: Phase, _total: usize) {}
    fn advance(&mut self, _done: usize) {}
    fn finish(&mut self, _phase: Phase) {}
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn start(&mut self, phase: Phase, total: usize) {
        (**self).start(phase, total)
    }

    fn advance(&mut self, done: usize) {
        (**self).advance(done)
    }

    fn finish(&mut self, phase: Phase) {
        (**self).finish(phase)
    }
}
