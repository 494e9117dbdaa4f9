//! Image file provider
//!
//! The engine never touches the filesystem directly; it asks a
//! [`ContentStore`] for image bytes and hands dumps back to it.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Source of images and sink of dumps
pub trait ContentStore {
    /// Load the image at `path`
    fn load(&mut self, path: &Path) -> Result<Vec<u8>>;

    /// Save `bytes` to `path`
    fn dump(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// Filesystem-backed store
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl ContentStore for FsStore {
    fn load(&mut self, path: &Path) -> Result<Vec<u8>> {
        let bytes = fs::read(path).map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }

    fn dump(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl<S: ContentStore + ?Sized> ContentStore for &mut S {
    fn load(&mut self, path: &Path) -> Result<Vec<u8>> {
        (**self).load(path)
    }

    fn dump(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        (**self).dump(path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_fs_store_round_trip() {
        let path = std::env::temp_dir().join(format!("wchflash-store-{}.bin", std::process::id()));
        let mut store = FsStore;

        store.dump(&path, &[1, 2, 3, 4]).unwrap();
        assert_eq!(store.load(&path).unwrap(), vec![1, 2, 3, 4]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let path = Path::new("/nonexistent/wchflash/firmware.bin");
        let err = FsStore.load(path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::File);
        assert!(err.to_string().starts_with("/nonexistent/wchflash/firmware.bin"));
    }
}
