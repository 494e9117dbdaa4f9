//! wchflash - Programmer for the WCH ISP bootloader
//!
//! Flashes and verifies code flash, and flashes, verifies and dumps data
//! flash, on WinChipHead CH55x/CH54x/CH57x/CH58x and CH32 microcontrollers
//! sitting in their factory bootloader.
//!
//! # Architecture
//!
//! The protocol engine in `wchflash-core` only needs a `Transport` that can
//! exchange one request for one reply. This binary picks the transport from
//! the programmer string:
//! - **usb** - bulk transfers to the bootloader's USB interface
//! - **serial** - framed requests over a UART
//! - **dummy** - an in-memory simulated bootloader

mod cli;
mod commands;
mod connect;
mod programmers;
mod progress;
mod trace;

use clap::Parser;
use cli::{Cli, Commands};
use programmers::ProgrammerSpec;
use wchflash_core::sequence::Plan;
use wchflash_core::{FsStore, Session, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Info { programmer } => {
            let session = open_session(&programmer, cli.debug)?;
            commands::info::run_info(&session);
            Ok(())
        }
        Commands::Program {
            programmer,
            code_flash,
            code_verify,
            data_flash,
            data_verify,
            data_dump,
            no_reboot,
        } => {
            let plan = Plan {
                code_flash,
                code_verify,
                data_flash,
                data_verify,
                data_dump,
                no_reboot,
            };
            let mut session = open_session(&programmer, cli.debug)?;
            let mut progress = progress::BarProgress::new();
            commands::program::run_program(&mut session, &plan, &mut FsStore, &mut progress)?;
            Ok(())
        }
        Commands::ListChips { family } => {
            commands::list_chips(family);
            Ok(())
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}

/// Open the link named by `programmer` and identify the chip behind it
fn open_session(
    programmer: &str,
    debug: bool,
) -> Result<Session<Box<dyn Transport>>, Box<dyn std::error::Error>> {
    let spec = ProgrammerSpec::parse(programmer)?;
    let transport = connect::open_transport(&spec, debug)?;
    Ok(Session::open(transport)?)
}
