//! Error types for wchflash-core
//!
//! Every failure is fatal for the session: nothing here is retried. The
//! variants are grouped by [`ErrorKind`] so callers can tell a dead link
//! from a device that said no.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Command;
use crate::version::BootloaderVersion;

/// Link-level failure reported by a [`Transport`](crate::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response within the transport timeout
    #[error("timed out waiting for the device")]
    Timeout,

    /// The underlying USB or serial I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// A framed response did not start with the expected magic bytes
    #[error("bad frame magic: expected {expected:02X?}, got {found:02X?}")]
    BadMagic {
        /// Magic the framing requires
        expected: [u8; 2],
        /// Magic actually received
        found: [u8; 2],
    },

    /// A framed response failed its additive checksum
    #[error("frame checksum mismatch: computed 0x{computed:02X}, received 0x{received:02X}")]
    BadChecksum {
        /// Checksum computed over the received payload
        computed: u8,
        /// Checksum byte carried by the frame
        received: u8,
    },

    /// The device sent fewer bytes than the reply requires
    #[error("short response: needed {needed} bytes, got {got}")]
    ShortResponse {
        /// Bytes the engine must read from the reply
        needed: usize,
        /// Bytes actually received
        got: usize,
    },
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Io(e.to_string()),
        }
    }
}

/// Coarse failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The link to the device failed
    Transport,
    /// The device answered but refused the request
    Rejected,
    /// The chip or bootloader is not one we can drive safely
    Unsupported,
    /// Loading or saving an image failed
    File,
    /// The caller asked for something the session cannot do
    Usage,
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// An exchange failed at the link level
    #[error("{command} failed: {source}")]
    Transport {
        /// Command being exchanged
        command: Command,
        /// Underlying link failure
        source: TransportError,
    },

    /// A chunk exchange failed at the link level
    #[error("{command} failed at offset {offset}: {source}")]
    ChunkTransport {
        /// Command being exchanged
        command: Command,
        /// Byte offset of the failing chunk
        offset: u32,
        /// Underlying link failure
        source: TransportError,
    },

    /// The device returned a non-zero return code
    #[error("the device refused {command} (code 0x{code:04X})")]
    Rejected {
        /// Rejected command
        command: Command,
        /// Device return code
        code: u16,
    },

    /// The device returned a non-zero return code for one chunk
    #[error("{command} failure at offset {offset} (code 0x{code:04X})")]
    ChunkRejected {
        /// Rejected command
        command: Command,
        /// Byte offset of the failing chunk
        offset: u32,
        /// Device return code
        code: u16,
    },

    /// The reply carried a different command byte than the request
    #[error("unexpected reply 0x{got:02X} to {command}")]
    UnexpectedResponse {
        /// Command that was sent
        command: Command,
        /// Command byte in the reply
        got: u8,
    },

    /// The key checksum echoed by the device does not match ours
    #[error("the device refused the key (expected checksum 0x{expected:02X}, got 0x{got:04X})")]
    KeyRefused {
        /// Checksum of the derived key
        expected: u8,
        /// Checksum field in the reply
        got: u16,
    },

    /// Data flash read back differs from what was written
    #[error("data flash doesn't match")]
    DataFlashMismatch,

    /// The chip reported family 0
    #[error("the chip is in an unrecoverable state; power cycle it and retry")]
    ChipHosed,

    /// No profile for the reported (family, type)
    #[error("device family 0x{family:02X} type 0x{chip_type:02X} is not supported")]
    UnsupportedChip {
        /// Reported family code
        family: u8,
        /// Reported type code
        chip_type: u8,
    },

    /// Bootloader version outside the supported set
    #[error("bootloader version {0} is not supported")]
    UnsupportedBootloader(BootloaderVersion),

    /// The chip has no data flash to operate on
    #[error("{0} has no data flash")]
    NoDataFlash(&'static str),

    /// Image does not fit in the target flash
    #[error("{} is {len} bytes, which does not fit in {max} bytes of flash", path.display())]
    TooLarge {
        /// Image path
        path: PathBuf,
        /// Image length after rounding
        len: usize,
        /// Flash capacity
        max: usize,
    },

    /// Reading or writing an image file failed
    #[error("{}: {source}", path.display())]
    File {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A write or compare was attempted before the device accepted the key
    #[error("the key has not been acknowledged by the device")]
    KeyNotSent,

    /// A buffer was used or transformed in the wrong encryption state
    #[error("{name} is {state}, which is the wrong state for this operation")]
    EncryptionState {
        /// Content name
        name: String,
        /// State the buffer is in
        state: &'static str,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::ChunkTransport { .. } => ErrorKind::Transport,
            Self::Rejected { .. }
            | Self::ChunkRejected { .. }
            | Self::UnexpectedResponse { .. }
            | Self::KeyRefused { .. }
            | Self::DataFlashMismatch => ErrorKind::Rejected,
            Self::ChipHosed
            | Self::UnsupportedChip { .. }
            | Self::UnsupportedBootloader(_)
            | Self::NoDataFlash(_) => ErrorKind::Unsupported,
            Self::TooLarge { .. } | Self::File { .. } => ErrorKind::File,
            Self::KeyNotSent | Self::EncryptionState { .. } => ErrorKind::Usage,
        }
    }

    /// Byte offset of the failing chunk, for chunked operations
    pub fn offset(&self) -> Option<u32> {
        match self {
            Self::ChunkTransport { offset, .. } | Self::ChunkRejected { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }

    /// Attach the offset of the chunk being exchanged
    pub(crate) fn at_offset(self, offset: u32) -> Self {
        match self {
            Self::Transport { command, source } => Self::ChunkTransport {
                command,
                offset,
                source,
            },
            Self::Rejected { command, code } => Self::ChunkRejected {
                command,
                offset,
                code,
            },
            other => other,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let e = io::Error::new(io::ErrorKind::TimedOut, "nothing");
        assert!(matches!(TransportError::from(e), TransportError::Timeout));

        let e = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(TransportError::from(e), TransportError::Io(_)));
    }

    #[test]
    fn test_chunk_errors_carry_offset() {
        let e = Error::ChunkRejected {
            command: Command::WriteCodeFlash,
            offset: 112,
            code: 0xFE,
        };
        assert_eq!(e.offset(), Some(112));
        assert_eq!(e.kind(), ErrorKind::Rejected);
        assert_eq!(
            e.to_string(),
            "write code flash failure at offset 112 (code 0x00FE)"
        );

        let e = Error::ChipHosed;
        assert_eq!(e.offset(), None);
        assert_eq!(e.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_at_offset() {
        let e = Error::Transport {
            command: Command::CompareCodeFlash,
            source: TransportError::Timeout,
        }
        .at_offset(56);
        assert!(matches!(
            e,
            Error::ChunkTransport {
                command: Command::CompareCodeFlash,
                offset: 56,
                source: TransportError::Timeout
            }
        ));
        assert_eq!(e.kind(), ErrorKind::Transport);

        let e = Error::UnexpectedResponse {
            command: Command::WriteCodeFlash,
            got: 0xA1,
        }
        .at_offset(56);
        assert_eq!(e.offset(), None);
    }
}
