//! List commands implementation

use wchflash_core::chip;

use crate::programmers;

/// List all compiled-in programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in programmers::available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:8} - {}", p.name, p.description);
        } else {
            println!(
                "  {:8} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

/// List all supported chips, optionally only one family
pub fn list_chips(family: Option<u8>) {
    println!("Supported chips:");
    println!();
    println!(
        "{:<14} {:>6} {:>6} {:>10} {:>10}  {}",
        "Name", "Family", "Type", "Code", "Data", "Quirks"
    );
    println!("{}", "-".repeat(70));

    for profile in chip::PROFILES {
        if family.is_some_and(|f| f != profile.family) {
            continue;
        }

        println!(
            "{:<14} {:>6} {:>6} {:>10} {:>10}  {}",
            profile.name,
            format!("0x{:02X}", profile.family),
            format!("0x{:02X}", profile.chip_type),
            format_size(profile.code_flash_size),
            format_size(profile.data_flash_size),
            profile.quirks.names().join(", ")
        );
    }
}

pub(crate) fn format_size(bytes: u32) -> String {
    if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
