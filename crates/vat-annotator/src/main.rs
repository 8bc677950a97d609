//! VAT Annotator entry point

use clap::Parser;
use vat_annotator::{Cli, ExitCode};

#[cfg(target_os = "linux")]
fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // eframe needs the main thread, so no async main here
    match vat_annotator::runner::start(cli) {
        Ok(code) => code.to_exit_code(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::GeneralError.to_exit_code()
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn main() -> std::process::ExitCode {
    let _ = Cli::parse();
    eprintln!("Error: vat-annotator needs POSIX shared memory and only runs on Linux");
    ExitCode::GeneralError.to_exit_code()
}
