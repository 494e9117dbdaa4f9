//! Flash transfer state machine
//!
//! Erase, then stream the buffer in 56-byte chunks at strictly increasing
//! offsets, one exchange per chunk. Compare reuses the same chunking with a
//! different command. Some chips need one extra empty write at the end of
//! the code-flash stream to commit it. Any non-zero return code, or no
//! reply at all, aborts the transfer and reports the chunk's offset.

pub mod code;
pub mod data;

use crate::error::Result;
use crate::progress::{Phase, Progress};
use crate::protocol::frames::{ChunkRequest, Request};
use crate::protocol::{Command, CHUNK_SIZE, ERASE_BLOCK_SIZE};
use crate::session::Session;
use crate::transport::Transport;

pub use code::{erase_code_flash, verify_code_flash, write_code_flash};
pub use data::{erase_data_flash, read_data_flash, verify_data_flash, write_data_flash};

/// One slice of a buffer and where it goes in flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Flash offset of the first byte
    pub offset: u32,
    /// Chunk bytes, at most `CHUNK_SIZE`
    pub data: &'a [u8],
}

/// Split `buf` into consecutive chunks of at most `size` bytes
pub fn chunks(buf: &[u8], size: usize) -> impl Iterator<Item = Chunk<'_>> {
    buf.chunks(size).enumerate().map(move |(i, data)| Chunk {
        offset: (i * size) as u32,
        data,
    })
}

/// Number of 1 KiB blocks to erase before writing `len` bytes
pub fn erase_blocks(len: usize, min: usize) -> usize {
    len.div_ceil(ERASE_BLOCK_SIZE).max(min)
}

/// Stream `bytes` to the device with `command`
///
/// With `commit`, an empty chunk at offset `bytes.len()` follows the data.
fn transfer<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    command: Command,
    bytes: &[u8],
    commit: bool,
    phase: Phase,
    progress: &mut P,
) -> Result<()> {
    session.require_key()?;

    progress.start(phase, bytes.len());
    let mut done = 0;
    for chunk in chunks(bytes, CHUNK_SIZE) {
        send_chunk(session, command, chunk)?;
        done += chunk.data.len();
        progress.advance(done);
    }

    if commit {
        log::debug!("Committing {} with an empty write", command);
        send_chunk(
            session,
            command,
            Chunk {
                offset: bytes.len() as u32,
                data: &[],
            },
        )?;
    }

    progress.finish(phase);
    Ok(())
}

fn send_chunk<T: Transport>(session: &mut Session<T>, command: Command, chunk: Chunk<'_>) -> Result<()> {
    log::trace!(
        "{} at offset {} ({} bytes)",
        command,
        chunk.offset,
        chunk.data.len()
    );
    let req = ChunkRequest::new(command, chunk.offset, chunk.data);
    session
        .status(command, req.wire())
        .map_err(|e| e.at_offset(chunk.offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_buffer_once() {
        for len in [0usize, 1, 55, 56, 57, 104, 112, 1000, 1024] {
            let buf: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let all: Vec<_> = chunks(&buf, CHUNK_SIZE).collect();

            let total: usize = all.iter().map(|c| c.data.len()).sum();
            assert_eq!(total, len);

            let mut expected = 0u32;
            for c in &all {
                assert_eq!(c.offset, expected);
                assert!(!c.data.is_empty() && c.data.len() <= CHUNK_SIZE);
                assert_eq!(c.data, &buf[c.offset as usize..][..c.data.len()]);
                expected += c.data.len() as u32;
            }

            // Only the last chunk may be short
            for c in all.iter().rev().skip(1) {
                assert_eq!(c.data.len(), CHUNK_SIZE);
            }
        }
    }

    #[test]
    fn test_chunks_of_104_bytes() {
        let buf = [0u8; 104];
        let lens: Vec<_> = chunks(&buf, CHUNK_SIZE)
            .map(|c| (c.offset, c.data.len()))
            .collect();
        assert_eq!(lens, vec![(0, 56), (56, 48)]);
    }

    #[test]
    fn test_erase_blocks() {
        assert_eq!(erase_blocks(0, 8), 8);
        assert_eq!(erase_blocks(104, 8), 8);
        assert_eq!(erase_blocks(8192, 8), 8);
        assert_eq!(erase_blocks(8193, 8), 9);
        assert_eq!(erase_blocks(14_336, 8), 14);

        assert_eq!(erase_blocks(128, 1), 1);
        assert_eq!(erase_blocks(1024, 1), 1);
        assert_eq!(erase_blocks(5120, 1), 5);
        assert_eq!(erase_blocks(32_768, 1), 32);
    }
}
