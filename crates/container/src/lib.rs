//! Container format interfaces.
//!
//! A container holds one or more records (reads). The traits in [`format`]
//! are the only way the rest of the workspace touches containers, so a
//! different backing library can be plugged in without changes elsewhere.
//!
//! Enable the `mock` feature for [`mock::MemoryFormat`], a JSON-backed format
//! intended for tests.

pub mod error;
mod format;
#[cfg(feature = "mock")]
pub mod mock;
mod record;

pub use crate::format::{Container, ContainerFormat, ContainerWriter, Layout, Source};
pub use crate::record::{Attributes, ChannelInfo, Record};
use std::sync::Arc;

pub type FormatHandle = Arc<dyn ContainerFormat>;
