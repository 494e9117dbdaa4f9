//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex (`0x` prefix optional) u8
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "wchflash")]
#[command(author, version, about = "WCH ISP bootloader programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hexdump every request and reply
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the chip and show its bootloader information
    Info {
        /// Programmer to use
        #[arg(short, long, default_value = "usb", help = programmer_help())]
        programmer: String,
    },

    /// Flash, verify or dump code and data flash
    Program {
        /// Programmer to use
        #[arg(short, long, default_value = "usb", help = programmer_help())]
        programmer: String,

        /// Firmware to erase, write and verify
        #[arg(short = 'f', long, value_name = "FILE")]
        code_flash: Option<PathBuf>,

        /// Firmware to verify without writing
        #[arg(short = 'c', long, value_name = "FILE")]
        code_verify: Option<PathBuf>,

        /// Data-flash image to erase, write and verify
        #[arg(short = 'e', long, value_name = "FILE")]
        data_flash: Option<PathBuf>,

        /// Data-flash image to verify without writing
        #[arg(short = 'k', long, value_name = "FILE")]
        data_verify: Option<PathBuf>,

        /// Save the data flash to a file
        #[arg(short = 'o', long, value_name = "FILE")]
        data_dump: Option<PathBuf>,

        /// Stay in the bootloader after flashing
        #[arg(long)]
        no_reboot: bool,
    },

    /// List supported chips
    ListChips {
        /// Only show this family (hex, e.g. 0x11)
        #[arg(long, value_parser = parse_hex_u8)]
        family: Option<u8>,
    },

    /// List compiled-in programmers
    ListProgrammers,
}
