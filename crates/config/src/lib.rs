//! Layered configuration for multiread.
//!
//! Settings are merged from built-in defaults, an optional TOML/YAML/JSON
//! file, then `MULTIREAD_*` environment variables.

pub mod error;
mod settings;

pub use crate::settings::{ContainerSettings, ENV_PREFIX, Settings};
