//! Command-line entry point for the single-to-multi converter.
//!
//! The container format is supplied by the caller, so a host links this crate
//! and calls [`run`] from its own `main`:
//!
//! ```no_run
//! use clap::Parser;
//! use multiread_cli::Cli;
//! # use multiread_container::mock::MemoryFormat;
//! # use std::sync::Arc;
//!
//! fn main() -> std::process::ExitCode {
//!     # let format = Arc::new(MemoryFormat::default());
//!     multiread_cli::run(format, &Cli::parse())
//! }
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use multiread_config::Settings;
use multiread_container::FormatHandle;
use multiread_shim::error::ErrorKind as ShimErrorKind;
use multiread_shim::{Converter, Session, Summary};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(name = "multiread", version, about = "Pack single-record containers into multi-record batches")]
pub struct Cli {
    /// Directory of containers, a single container, or a tar archive of them.
    pub input: PathBuf,

    /// Directory to write batches and the filename mapping into.
    pub output: PathBuf,

    /// Configuration file (TOML, YAML or JSON). Defaults to the per-user one.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Records per output container.
    #[arg(short = 'n', long)]
    pub batch_size: Option<NonZeroUsize>,

    /// Descend into subdirectories of the input.
    #[arg(short, long)]
    pub recursive: bool,

    /// Output file name prefix.
    #[arg(short, long)]
    pub filename_base: Option<String>,
}

impl Cli {
    /// Load settings, then apply whatever was given on the command line.
    pub fn settings(&self) -> multiread_config::error::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(Some(path.as_path()))?,
            None => Settings::load_user()?,
        };
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if self.recursive {
            settings.recursive = true;
        }
        if let Some(base) = &self.filename_base {
            settings.filename_base.clone_from(base);
        }
        Ok(settings)
    }
}

/// Set up a session and convert. The compatibility check runs before any
/// output is touched.
pub fn convert(format: FormatHandle, cli: &Cli) -> Result<Summary> {
    let settings = cli.settings().or_raise(|| ErrorKind::Config)?;
    let session = Session::new(format, &settings).map_err(|err| {
        let kind = match &*err {
            ShimErrorKind::Incompatible { .. } => ErrorKind::Incompatible,
            _ => ErrorKind::Session,
        };
        err.raise(kind)
    })?;
    Converter::new(&session, &cli.output).run(&cli.input).or_raise(|| ErrorKind::Convert)
}

/// Run the converter as a process: log to stderr, and exit non-zero on any
/// error.
pub fn run(format: FormatHandle, cli: &Cli) -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    match convert(format, cli) {
        Ok(summary) => {
            tracing::info!(
                batches = summary.batches,
                records = summary.records,
                failed = summary.failed,
                mapping = %summary.mapping.display(),
                "Done"
            );
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!(error = ?err, "Conversion aborted");
            ExitCode::FAILURE
        },
    }
}
