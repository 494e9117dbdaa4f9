//! Ordered flash sequence
//!
//! One run drives an already-open session through a fixed order: load and
//! encrypt images, send the key, code-flash operations, data-flash
//! operations, then reboot if code flash was written. Flashing an image
//! always verifies it afterwards.

use std::path::{Path, PathBuf};

use crate::content::Content;
use crate::error::{Error, Result};
use crate::flash;
use crate::progress::Progress;
use crate::session::Session;
use crate::store::ContentStore;
use crate::transport::Transport;

/// Which operations to run
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Firmware to erase, write and verify
    pub code_flash: Option<PathBuf>,
    /// Firmware to verify without writing
    pub code_verify: Option<PathBuf>,
    /// Data-flash image to erase, write and verify
    pub data_flash: Option<PathBuf>,
    /// Data-flash image to verify without writing
    pub data_verify: Option<PathBuf>,
    /// Where to save a dump of the data flash
    pub data_dump: Option<PathBuf>,
    /// Stay in the bootloader after writing code flash
    pub no_reboot: bool,
}

impl Plan {
    /// Whether the plan changes anything on the chip
    pub fn mutates(&self) -> bool {
        self.code_flash.is_some() || self.data_flash.is_some()
    }

    /// Whether any step needs the device to hold the key
    pub fn needs_key(&self) -> bool {
        self.code_flash.is_some() || self.code_verify.is_some() || self.data_flash.is_some()
    }

    /// Whether the plan does nothing at all
    pub fn is_empty(&self) -> bool {
        !self.mutates()
            && self.code_verify.is_none()
            && self.data_verify.is_none()
            && self.data_dump.is_none()
    }
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Bytes of code flash written
    pub code_written: Option<usize>,
    /// Code images verified by the device
    pub code_verified: Vec<PathBuf>,
    /// Bytes of data flash written
    pub data_written: Option<usize>,
    /// Data images verified by read-back
    pub data_verified: Vec<PathBuf>,
    /// Data flash dump saved
    pub data_dumped: Option<PathBuf>,
    /// Whether the device was told to reboot
    pub rebooted: bool,
}

fn load<S: ContentStore + ?Sized>(store: &mut S, path: &Path, max_size: usize) -> Result<Content> {
    let bytes = store.load(path)?;
    log::info!("Read {} bytes from {}", bytes.len(), path.display());
    Content::new(path, bytes, max_size)
}

/// Load the image for `verify` unless it is the one being flashed
fn load_extra<S: ContentStore + ?Sized>(
    store: &mut S,
    flashed: Option<&PathBuf>,
    verify: Option<&PathBuf>,
    max_size: usize,
) -> Result<Option<Content>> {
    match verify {
        Some(path) if flashed != Some(path) => Ok(Some(load(store, path, max_size)?)),
        _ => Ok(None),
    }
}

/// Run `plan` against an open session
pub fn run<T, S, P>(
    session: &mut Session<T>,
    plan: &Plan,
    store: &mut S,
    progress: &mut P,
) -> Result<Report>
where
    T: Transport,
    S: ContentStore + ?Sized,
    P: Progress + ?Sized,
{
    let profile = session.profile();
    let mut report = Report::default();

    // Images are loaded up front so a bad file fails before anything is
    // written.
    let code_max = profile.code_flash_len();
    let data_max = profile.data_flash_len();

    let mut firmware = match &plan.code_flash {
        Some(path) => Some(load(store, path, code_max)?),
        None => None,
    };
    let mut code_check = load_extra(
        store,
        plan.code_flash.as_ref(),
        plan.code_verify.as_ref(),
        code_max,
    )?;
    let wants_data =
        plan.data_flash.is_some() || plan.data_verify.is_some() || plan.data_dump.is_some();
    if wants_data && !profile.has_data_flash() {
        return Err(Error::NoDataFlash(profile.name));
    }

    let mut data_image = match &plan.data_flash {
        Some(path) => Some(load(store, path, data_max)?),
        None => None,
    };
    let mut data_check = load_extra(
        store,
        plan.data_flash.as_ref(),
        plan.data_verify.as_ref(),
        data_max,
    )?;

    let key = *session.key();
    for content in [&mut firmware, &mut code_check, &mut data_image]
        .into_iter()
        .flatten()
    {
        content.encrypt(&key)?;
    }

    if plan.mutates() {
        session.write_config()?;
    }
    if plan.needs_key() {
        session.send_key()?;
    }

    if let Some(firmware) = &firmware {
        flash::erase_code_flash(session, firmware.len(), progress)?;
        flash::write_code_flash(session, firmware, progress)?;
        log::info!("Flashing successful");
        report.code_written = Some(firmware.len());

        flash::verify_code_flash(session, firmware, progress)?;
        log::info!("Firmware is good");
        report.code_verified.push(firmware.name().to_path_buf());
    }
    if let Some(check) = &code_check {
        flash::verify_code_flash(session, check, progress)?;
        log::info!("Firmware is good");
        report.code_verified.push(check.name().to_path_buf());
    }

    if let Some(image) = &mut data_image {
        flash::erase_data_flash(session, progress)?;
        flash::write_data_flash(session, image, progress)?;
        report.data_written = Some(image.len());

        flash::verify_data_flash(session, image, progress)?;
        report.data_verified.push(image.name().to_path_buf());
    }
    if let Some(check) = &mut data_check {
        flash::verify_data_flash(session, check, progress)?;
        report.data_verified.push(check.name().to_path_buf());
    }

    if let Some(path) = &plan.data_dump {
        let bytes = flash::read_data_flash(session, progress)?;
        let dump = Content::from_device(path, bytes);
        store.dump(dump.name(), dump.as_bytes())?;
        log::info!("Saved {} bytes of data flash to {}", dump.len(), path.display());
        report.data_dumped = Some(path.clone());
    }

    if report.code_written.is_some() && !plan.no_reboot {
        session.reboot()?;
        report.rebooted = true;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::key::XorKey;
    use crate::progress::NoProgress;
    use crate::protocol::frames::{ReadDataFlashResponse, SetKeyResponse, StatusResponse};
    use crate::protocol::{Command, CONFIG_LEN, READ_CHUNK_SIZE};
    use crate::session::tests::{connect_script, ID};
    use crate::transport::scripted::ScriptedTransport;
    use std::collections::HashMap;
    use zerocopy::IntoBytes;

    #[derive(Default)]
    struct MemStore {
        files: HashMap<PathBuf, Vec<u8>>,
    }

    impl ContentStore for MemStore {
        fn load(&mut self, path: &Path) -> Result<Vec<u8>> {
            self.files.get(path).cloned().ok_or_else(|| Error::File {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }

        fn dump(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
            self.files.insert(path.to_path_buf(), bytes.to_vec());
            Ok(())
        }
    }

    fn status(t: &mut ScriptedTransport, command: Command, n: usize) {
        for _ in 0..n {
            t.reply(StatusResponse::new(command.code(), 0).as_bytes());
        }
    }

    fn commands(t: &ScriptedTransport) -> Vec<u8> {
        t.requests.iter().map(|(req, _)| req[0]).collect()
    }

    #[test]
    fn test_code_flash_sequence() {
        // CH552 with a 2.4.0 bootloader: reboot is not acknowledged
        let mut t = connect_script(0x11, 0x52, 0x02_04_00, [0; CONFIG_LEN]);
        let key = XorKey::derive(&ID[..4], 0x52);
        status(&mut t, Command::WriteConfig, 1);
        t.reply(SetKeyResponse::new(key.checksum() as u16).as_bytes());
        status(&mut t, Command::EraseCodeFlash, 1);
        status(&mut t, Command::WriteCodeFlash, 2);
        status(&mut t, Command::CompareCodeFlash, 2);

        let mut session = Session::open(t).unwrap();
        let mut store = MemStore::default();
        store.files.insert("fw.bin".into(), vec![0x5A; 100]);
        let plan = Plan {
            code_flash: Some("fw.bin".into()),
            ..Plan::default()
        };

        let report = run(&mut session, &plan, &mut store, &mut NoProgress).unwrap();
        assert_eq!(report.code_written, Some(104));
        assert_eq!(report.code_verified, vec![PathBuf::from("fw.bin")]);
        assert!(report.rebooted);

        let t = session.into_transport();
        assert_eq!(
            commands(&t),
            vec![0xA1, 0xA7, 0xA8, 0xA3, 0xA4, 0xA5, 0xA5, 0xA6, 0xA6, 0xA2]
        );

        // The firmware goes out encrypted
        let mut expected = vec![0x5A; 56];
        key.apply(&mut expected);
        assert_eq!(&t.requests[5].0[8..], &expected[..]);
    }

    #[test]
    fn test_verify_only_skips_config_and_reboot() {
        let mut t = connect_script(0x11, 0x52, 0x02_08_00, [0; CONFIG_LEN]);
        let key = XorKey::derive(&ID[..4], 0x52);
        t.reply(SetKeyResponse::new(key.checksum() as u16).as_bytes());
        status(&mut t, Command::CompareCodeFlash, 1);

        let mut session = Session::open(t).unwrap();
        let mut store = MemStore::default();
        store.files.insert("fw.bin".into(), vec![1; 40]);
        let plan = Plan {
            code_verify: Some("fw.bin".into()),
            ..Plan::default()
        };

        let report = run(&mut session, &plan, &mut store, &mut NoProgress).unwrap();
        assert_eq!(report.code_written, None);
        assert!(!report.rebooted);
        assert_eq!(commands(&session.into_transport()), vec![0xA1, 0xA7, 0xA3, 0xA6]);
    }

    #[test]
    fn test_data_dump() {
        let mut t = connect_script(0x11, 0x52, 0x02_08_00, [0; CONFIG_LEN]);
        let flash: Vec<u8> = (0..128).map(|i| 255 - i as u8).collect();
        for piece in flash.chunks(READ_CHUNK_SIZE) {
            t.reply(ReadDataFlashResponse::new(0, piece).as_bytes());
        }

        let mut session = Session::open(t).unwrap();
        let mut store = MemStore::default();
        let plan = Plan {
            data_dump: Some("dump.bin".into()),
            ..Plan::default()
        };

        let report = run(&mut session, &plan, &mut store, &mut NoProgress).unwrap();
        assert_eq!(report.data_dumped, Some(PathBuf::from("dump.bin")));
        assert_eq!(store.files[Path::new("dump.bin")], flash);
        // A dump needs neither the key nor a config write
        assert_eq!(
            commands(&session.into_transport()),
            vec![0xA1, 0xA7, 0xAB, 0xAB, 0xAB]
        );
    }

    #[test]
    fn test_oversized_image_fails_before_any_write() {
        let t = connect_script(0x11, 0x51, 0x02_08_00, [0; CONFIG_LEN]);
        let mut session = Session::open(t).unwrap();
        let mut store = MemStore::default();
        store.files.insert("big.bin".into(), vec![0; 10_241]);
        let plan = Plan {
            code_flash: Some("big.bin".into()),
            ..Plan::default()
        };

        let err = run(&mut session, &plan, &mut store, &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::TooLarge { len: 10_248, max: 10_240, .. }));
        assert_eq!(err.kind(), ErrorKind::File);
        assert_eq!(session.into_transport().requests.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let t = connect_script(0x11, 0x52, 0x02_08_00, [0; CONFIG_LEN]);
        let mut session = Session::open(t).unwrap();
        let plan = Plan {
            data_flash: Some("nope.bin".into()),
            ..Plan::default()
        };
        let err = run(&mut session, &plan, &mut MemStore::default(), &mut NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::File);
    }

    #[test]
    fn test_data_image_on_chip_without_data_flash() {
        // CH32V103
        let t = connect_script(0x15, 0x3F, 0x02_08_00, [0; CONFIG_LEN]);
        let mut session = Session::open(t).unwrap();
        let mut store = MemStore::default();
        store.files.insert("d.bin".into(), vec![0; 16]);
        let plan = Plan {
            code_flash: Some("d.bin".into()),
            data_flash: Some("d.bin".into()),
            ..Plan::default()
        };

        let err = run(&mut session, &plan, &mut store, &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::NoDataFlash("CH32V103")));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        // Refused before the config write
        assert_eq!(session.into_transport().requests.len(), 2);
    }

    #[test]
    fn test_plan_predicates() {
        assert!(Plan::default().is_empty());
        let plan = Plan {
            data_verify: Some("d.bin".into()),
            ..Plan::default()
        };
        assert!(!plan.is_empty());
        assert!(!plan.mutates());
        assert!(!plan.needs_key());
    }
}
