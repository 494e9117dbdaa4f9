//! Program command implementation

use wchflash_core::sequence::{self, Plan, Report};
use wchflash_core::{ContentStore, Progress, Session, Transport};

/// Run `plan` and print what was done
pub fn run_program<T, S, P>(
    session: &mut Session<T>,
    plan: &Plan,
    store: &mut S,
    progress: &mut P,
) -> Result<Report, Box<dyn std::error::Error>>
where
    T: Transport,
    S: ContentStore + ?Sized,
    P: Progress + ?Sized,
{
    if plan.is_empty() {
        return Err("Nothing to do; pass --code-flash, --code-verify, --data-flash, \
                    --data-verify or --data-dump"
            .into());
    }

    let report = sequence::run(session, plan, store, progress)?;
    for line in summary(&report) {
        println!("{}", line);
    }
    Ok(report)
}

/// One line per completed step
pub fn summary(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(len) = report.code_written {
        lines.push(format!("Wrote {} bytes of code flash", len));
    }
    for path in &report.code_verified {
        lines.push(format!("Code flash matches {}", path.display()));
    }
    if let Some(len) = report.data_written {
        lines.push(format!("Wrote {} bytes of data flash", len));
    }
    for path in &report.data_verified {
        lines.push(format!("Data flash matches {}", path.display()));
    }
    if let Some(path) = &report.data_dumped {
        lines.push(format!("Data flash saved to {}", path.display()));
    }
    if report.rebooted {
        lines.push("Device rebooted".to_string());
    }
    lines
}
