//! `multiread` over the JSON-backed mock container format.

use clap::Parser;
use multiread_cli::Cli;
use multiread_container::mock::MemoryFormat;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    multiread_cli::run(Arc::new(MemoryFormat::default()), &Cli::parse())
}
