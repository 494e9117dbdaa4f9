//! Writes wchflash.1 plus one page per subcommand (wchflash-program.1, ...)
//!
//! Usage: gen-manpage [output-dir], defaulting to ./man

use clap::CommandFactory;
use std::path::PathBuf;

#[path = "../cli.rs"]
mod cli;
#[allow(dead_code)]
#[path = "../programmers.rs"]
mod programmers;

fn page_names(cmd: &clap::Command) -> Vec<String> {
    let bin = cmd.get_name();
    std::iter::once(bin.to_string())
        .chain(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| format!("{}-{}", bin, sub.get_name())),
        )
        .map(|name| format!("{}.1", name))
        .collect()
}

fn main() -> std::io::Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&out_dir)?;

    let cmd = cli::Cli::command();
    let pages = page_names(&cmd);
    clap_mangen::generate_to(cmd, &out_dir)?;

    for page in &pages {
        println!("{}", out_dir.join(page).display());
    }
    if let Some(main_page) = pages.first() {
        println!("\nView with: man -l {}", out_dir.join(main_page).display());
    }
    Ok(())
}
