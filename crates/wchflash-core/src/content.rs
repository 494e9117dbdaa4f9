//! Image buffers moved to and from the device
//!
//! A [`Content`] owns the bytes of one image (firmware, outbound data-flash
//! image, or inbound data-flash dump) and tracks whether they currently
//! carry the session's XOR key. Applying the key in the wrong state is an
//! error rather than a silent toggle, so a buffer can never be sent
//! decrypted or compared while still encrypted.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::key::{XorKey, XOR_KEY_LEN};

/// Whether a buffer currently carries the XOR key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// Bytes as they are stored in flash
    Plain,
    /// Bytes XORed with the session key, ready to transmit
    Encrypted,
}

impl Encryption {
    fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Encrypted => "encrypted",
        }
    }
}

/// A named image buffer
#[derive(Debug, Clone)]
pub struct Content {
    name: PathBuf,
    buf: Vec<u8>,
    max_size: usize,
    state: Encryption,
}

impl Content {
    /// Wrap a loaded image, padding it with zeros to a multiple of 8 bytes
    ///
    /// Fails with [`Error::TooLarge`] when the padded image exceeds
    /// `max_size`.
    pub fn new(name: impl Into<PathBuf>, mut bytes: Vec<u8>, max_size: usize) -> Result<Self> {
        let name = name.into();
        let len = bytes.len().div_ceil(XOR_KEY_LEN) * XOR_KEY_LEN;
        if len > max_size {
            return Err(Error::TooLarge {
                path: name,
                len,
                max: max_size,
            });
        }
        bytes.resize(len, 0);

        Ok(Self {
            name,
            buf: bytes,
            max_size,
            state: Encryption::Plain,
        })
    }

    /// Wrap bytes read back from the device
    ///
    /// Read-back data is always plain; the device decrypts on write.
    pub fn from_device(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let max_size = bytes.len();
        Self {
            name: name.into(),
            buf: bytes,
            max_size,
            state: Encryption::Plain,
        }
    }

    /// Where the image came from or is going to
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Image length, always a multiple of 8 for loaded images
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the image is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Capacity of the flash region this image targets
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Current encryption state
    pub fn state(&self) -> Encryption {
        self.state
    }

    /// Image bytes in their current state
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the content, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Apply the key to a plain buffer
    pub fn encrypt(&mut self, key: &XorKey) -> Result<()> {
        self.transform(key, Encryption::Plain, Encryption::Encrypted)
    }

    /// Remove the key from an encrypted buffer
    pub fn decrypt(&mut self, key: &XorKey) -> Result<()> {
        self.transform(key, Encryption::Encrypted, Encryption::Plain)
    }

    /// Fail unless the buffer is in `state`
    pub fn require(&self, state: Encryption) -> Result<()> {
        if self.state != state {
            return Err(Error::EncryptionState {
                name: self.name.display().to_string(),
                state: self.state.name(),
            });
        }
        Ok(())
    }

    fn transform(&mut self, key: &XorKey, from: Encryption, to: Encryption) -> Result<()> {
        self.require(from)?;
        key.apply(&mut self.buf);
        self.state = to;
        Ok(())
    }
}
