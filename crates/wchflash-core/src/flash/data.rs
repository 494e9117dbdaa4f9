//! Data flash operations
//!
//! Unlike code flash, the device cannot compare data flash for us: verify
//! reads the whole region back and compares it with the plain image here.

use super::{erase_blocks, transfer};
use crate::chip::ChipProfile;
use crate::content::{Content, Encryption};
use crate::error::{Error, Result, TransportError};
use crate::progress::{Phase, Progress};
use crate::protocol::frames::{
    EraseDataFlashRequest, ReadDataFlashRequest, ReadDataFlashResponse, Request,
    RESPONSE_HEADER_LEN,
};
use crate::protocol::{Command, MIN_DATA_ERASE_BLOCKS, READ_CHUNK_SIZE};
use crate::session::Session;
use crate::transport::Transport;

/// Offset of the data in a read reply, after the header and return code
const READ_REPLY_DATA: usize = RESPONSE_HEADER_LEN + 2;

fn data_flash_profile<T: Transport>(session: &Session<T>) -> Result<&'static ChipProfile> {
    let profile = session.profile();
    if profile.has_data_flash() {
        Ok(profile)
    } else {
        Err(Error::NoDataFlash(profile.name))
    }
}

/// Erase the whole data flash
pub fn erase_data_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    progress: &mut P,
) -> Result<()> {
    let profile = data_flash_profile(session)?;
    let blocks = erase_blocks(profile.data_flash_len(), MIN_DATA_ERASE_BLOCKS);
    log::info!("Erasing {} KiB of data flash", blocks);

    progress.start(Phase::EraseData, 0);
    let req = EraseDataFlashRequest::new(blocks.min(u8::MAX as usize) as u8);
    session.status(Command::EraseDataFlash, req.wire())?;
    progress.finish(Phase::EraseData);
    Ok(())
}

/// Write an encrypted data-flash image
pub fn write_data_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    image: &Content,
    progress: &mut P,
) -> Result<()> {
    data_flash_profile(session)?;
    image.require(Encryption::Encrypted)?;
    log::info!("Writing {} bytes of data flash", image.len());
    transfer(
        session,
        Command::WriteDataFlash,
        image.as_bytes(),
        false,
        Phase::WriteData,
        progress,
    )
}

/// Read the whole data flash
pub fn read_data_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    progress: &mut P,
) -> Result<Vec<u8>> {
    let size = data_flash_profile(session)?.data_flash_len();
    log::info!("Reading {} bytes of data flash", size);

    let mut buf = Vec::with_capacity(size);
    progress.start(Phase::ReadData, size);
    while buf.len() < size {
        let offset = buf.len() as u32;
        let len = READ_CHUNK_SIZE.min(size - buf.len());
        log::trace!("read data flash at offset {} ({} bytes)", offset, len);

        let req = ReadDataFlashRequest::new(offset, len as u16);
        let (resp, got): (ReadDataFlashResponse, usize) = session
            .exchange_counted(Command::ReadDataFlash, req.wire())
            .map_err(|e| e.at_offset(offset))?;

        let code = resp.return_code.get();
        if code != 0 {
            return Err(Error::ChunkRejected {
                command: Command::ReadDataFlash,
                offset,
                code,
            });
        }

        let needed = READ_REPLY_DATA + len;
        if got < needed {
            return Err(Error::ChunkTransport {
                command: Command::ReadDataFlash,
                offset,
                source: TransportError::ShortResponse { needed, got },
            });
        }

        buf.extend_from_slice(&resp.data[..len]);
        progress.advance(buf.len());
    }
    progress.finish(Phase::ReadData);

    Ok(buf)
}

/// Read the data flash back and compare it with `image`
///
/// An encrypted image is decrypted first and left plain.
pub fn verify_data_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    image: &mut Content,
    progress: &mut P,
) -> Result<()> {
    let readback = read_data_flash(session, progress)?;

    if image.state() == Encryption::Encrypted {
        image.decrypt(session.key())?;
    }

    if readback.get(..image.len()) != Some(image.as_bytes()) {
        return Err(Error::DataFlashMismatch);
    }

    log::info!("Data flash matches {}", image.name().display());
    Ok(())
}
