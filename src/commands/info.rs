//! Info command implementation

use wchflash_core::{Session, Transport};

use super::list::format_size;

/// Describe the chip behind an open session
pub fn describe<T: Transport>(session: &Session<T>) -> Vec<String> {
    let profile = session.profile();
    let config: Vec<String> = session
        .config()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    let data_flash = if profile.has_data_flash() {
        format_size(profile.data_flash_size)
    } else {
        "none".to_string()
    };

    vec![
        format!("Chip:            {}", profile.name),
        format!(
            "Family/type:     0x{:02X}/0x{:02X}",
            profile.family, profile.chip_type
        ),
        format!(
            "Code flash:      {} ({} bytes)",
            format_size(profile.code_flash_size),
            profile.code_flash_size
        ),
        format!("Data flash:      {}", data_flash),
        format!("Bootloader:      {}", session.bootloader_version()),
        format!("Unique ID:       {}", session.formatted_id()),
        format!("Config:          {}", config.join(" ")),
    ]
}

/// Print chip information
pub fn run_info<T: Transport>(session: &Session<T>) {
    println!("ISP Bootloader Information");
    println!("==========================");
    println!();
    for line in describe(session) {
        println!("{}", line);
    }
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use wchflash_dummy::SimulatedDevice;

    #[test]
    fn test_describe() {
        let mut device = SimulatedDevice::for_chip("CH552")
            .unwrap()
            .with_unique_id([0x5A, 0x3C, 0x91, 0x07, 0, 0, 0, 0]);
        let session = Session::open(&mut device).unwrap();
        let lines = describe(&session);

        assert_eq!(lines[0], "Chip:            CH552");
        assert_eq!(lines[1], "Family/type:     0x11/0x52");
        assert_eq!(lines[2], "Code flash:      14 KiB (14336 bytes)");
        assert_eq!(lines[3], "Data flash:      128 B");
        assert_eq!(lines[4], "Bootloader:      2.8.0");
        assert_eq!(lines[5], "Unique ID:       5a-3c-91-07");
        assert!(lines[6].starts_with("Config:          ff ff"));
    }

    #[test]
    fn test_describe_without_data_flash() {
        let mut device = SimulatedDevice::for_chip("CH32V003").unwrap();
        let session = Session::open(&mut device).unwrap();
        assert_eq!(describe(&session)[3], "Data flash:      none");
    }
}
