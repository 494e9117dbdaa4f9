//! Code flash operations

use super::{erase_blocks, transfer};
use crate::content::{Content, Encryption};
use crate::error::Result;
use crate::progress::{Phase, Progress};
use crate::protocol::frames::{EraseCodeFlashRequest, Request};
use crate::protocol::{Command, MIN_CODE_ERASE_BLOCKS};
use crate::session::Session;
use crate::transport::Transport;

/// Erase enough code flash for an image of `len` bytes
///
/// The device erases whole KiB blocks, never fewer than 8.
pub fn erase_code_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    len: usize,
    progress: &mut P,
) -> Result<()> {
    let blocks = erase_blocks(len, MIN_CODE_ERASE_BLOCKS);
    log::info!("Erasing {} KiB of code flash", blocks);

    progress.start(Phase::EraseCode, 0);
    let req = EraseCodeFlashRequest::new(blocks.min(u16::MAX as usize) as u16);
    session.status(Command::EraseCodeFlash, req.wire())?;
    progress.finish(Phase::EraseCode);
    Ok(())
}

/// Write an encrypted firmware image
pub fn write_code_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    firmware: &Content,
    progress: &mut P,
) -> Result<()> {
    firmware.require(Encryption::Encrypted)?;
    let commit = session.profile().need_last_write();
    log::info!("Writing {} bytes of code flash", firmware.len());
    transfer(
        session,
        Command::WriteCodeFlash,
        firmware.as_bytes(),
        commit,
        Phase::WriteCode,
        progress,
    )
}

/// Have the device compare an encrypted firmware image against its flash
///
/// The device decrypts and compares each chunk itself.
pub fn verify_code_flash<T: Transport, P: Progress + ?Sized>(
    session: &mut Session<T>,
    firmware: &Content,
    progress: &mut P,
) -> Result<()> {
    firmware.require(Encryption::Encrypted)?;
    log::info!("Verifying {} bytes of code flash", firmware.len());
    transfer(
        session,
        Command::CompareCodeFlash,
        firmware.as_bytes(),
        false,
        Phase::VerifyCode,
        progress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TransportError};
    use crate::progress::NoProgress;
    use crate::protocol::frames::StatusResponse;
    use crate::protocol::CONFIG_LEN;
    use crate::session::tests::{connect_script, open_keyed};
    use crate::transport::scripted::ScriptedTransport;
    use zerocopy::IntoBytes;

    fn ok(session: &mut Session<ScriptedTransport>, command: Command, n: usize) {
        for _ in 0..n {
            session.transport_mut().reply(StatusResponse::new(command.code(), 0).as_bytes());
        }
    }

    fn sent(session: Session<ScriptedTransport>) -> Vec<Vec<u8>> {
        session
            .into_transport()
            .requests
            .into_iter()
            .skip(3)
            .map(|(req, _)| req)
            .collect()
    }

    #[test]
    fn test_hundred_byte_firmware() {
        let mut session = open_keyed(0x11, 0x51);
        assert_eq!(session.profile().code_flash_size, 10_240);

        let mut firmware = Content::new(
            "fw.bin",
            vec![0x42; 100],
            session.profile().code_flash_len(),
        )
        .unwrap();
        assert_eq!(firmware.len(), 104);
        firmware.encrypt(session.key()).unwrap();

        ok(&mut session, Command::EraseCodeFlash, 1);
        ok(&mut session, Command::WriteCodeFlash, 2);
        erase_code_flash(&mut session, firmware.len(), &mut NoProgress).unwrap();
        write_code_flash(&mut session, &firmware, &mut NoProgress).unwrap();

        let reqs = sent(session);
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0], vec![0xA4, 4, 0, 8, 0, 0, 0]);
        assert_eq!(&reqs[1][..8], &[0xA5, 61, 0, 0, 0, 0, 0, 0]);
        assert_eq!(reqs[1].len(), 8 + 56);
        assert_eq!(&reqs[2][..8], &[0xA5, 53, 0, 56, 0, 0, 0, 0]);
        assert_eq!(reqs[2].len(), 8 + 48);
        assert_eq!(&reqs[1][8..], &firmware.as_bytes()[..56]);
    }

    #[test]
    fn test_last_write_commits_with_empty_chunk() {
        let mut session = open_keyed(0x12, 0x49);
        assert!(session.profile().need_last_write());

        let mut firmware = Content::new("fw.bin", vec![1; 60], 61_440).unwrap();
        firmware.encrypt(session.key()).unwrap();

        ok(&mut session, Command::WriteCodeFlash, 3);
        ok(&mut session, Command::CompareCodeFlash, 2);
        write_code_flash(&mut session, &firmware, &mut NoProgress).unwrap();
        verify_code_flash(&mut session, &firmware, &mut NoProgress).unwrap();

        let reqs = sent(session);
        assert_eq!(reqs.len(), 5);
        assert_eq!(reqs[2], vec![0xA5, 5, 0, 64, 0, 0, 0, 0]);
        // Compare never commits
        assert_eq!(reqs[3][0], 0xA6);
        assert_eq!(reqs[4][0], 0xA6);
        assert_eq!(reqs[4].len(), 8 + 8);
    }

    #[test]
    fn test_rejected_chunk_reports_offset() {
        let mut session = open_keyed(0x11, 0x52);
        let mut firmware = Content::new("fw.bin", vec![7; 200], 14_336).unwrap();
        firmware.encrypt(session.key()).unwrap();

        ok(&mut session, Command::CompareCodeFlash, 2);
        session
            .transport_mut()
            .reply(StatusResponse::new(0xA6, 0xF5).as_bytes());

        let err = verify_code_flash(&mut session, &firmware, &mut NoProgress).unwrap_err();
        assert!(matches!(
            err,
            Error::ChunkRejected {
                command: Command::CompareCodeFlash,
                offset: 112,
                code: 0xF5
            }
        ));
        assert_eq!(err.to_string(), "check code flash failure at offset 112 (code 0x00F5)");

        // Nothing after the failing chunk is sent
        assert_eq!(sent(session).len(), 3);
    }

    #[test]
    fn test_silent_chunk_reports_offset() {
        let mut session = open_keyed(0x11, 0x52);
        let mut firmware = Content::new("fw.bin", vec![7; 112], 14_336).unwrap();
        firmware.encrypt(session.key()).unwrap();

        ok(&mut session, Command::WriteCodeFlash, 1);
        session.transport_mut().fail(TransportError::Timeout);

        let err = write_code_flash(&mut session, &firmware, &mut NoProgress).unwrap_err();
        assert_eq!(err.offset(), Some(56));
        assert!(matches!(err, Error::ChunkTransport { .. }));
    }

    #[test]
    fn test_write_needs_key_and_encrypted_image() {
        let t = connect_script(0x11, 0x52, 0x02_04_00, [0; CONFIG_LEN]);
        let mut session = Session::open(t).unwrap();
        let mut firmware = Content::new("fw.bin", vec![7; 8], 14_336).unwrap();

        assert!(matches!(
            write_code_flash(&mut session, &firmware, &mut NoProgress),
            Err(Error::EncryptionState { .. })
        ));

        firmware.encrypt(session.key()).unwrap();
        assert!(matches!(
            write_code_flash(&mut session, &firmware, &mut NoProgress),
            Err(Error::KeyNotSent)
        ));
        assert_eq!(session.into_transport().requests.len(), 2);
    }

    #[test]
    fn test_erase_rejected() {
        let mut session = open_keyed(0x11, 0x52);
        session
            .transport_mut()
            .reply(StatusResponse::new(0xA4, 1).as_bytes());
        assert!(matches!(
            erase_code_flash(&mut session, 20_000, &mut NoProgress),
            Err(Error::Rejected {
                command: Command::EraseCodeFlash,
                code: 1
            })
        ));
        assert_eq!(sent(session)[0], vec![0xA4, 4, 0, 20, 0, 0, 0]);
    }
}
