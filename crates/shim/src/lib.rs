//! Multi-record container support for pipelines built around single-record
//! files.
//!
//! A multi-record container is presented to the host as a set of *virtual
//! paths*, one per record (`x.fast5` holding `r1` becomes
//! `x___read_r1.fast5`). Listing, copying and metadata reads understand those
//! paths; the converter goes the other way and packs loose single-record
//! containers (or a tar archive of them) into multi-record batches.
//!
//! ```no_run
//! use multiread_shim::{Convention, Opener, expand};
//! # use multiread_archive::ContentCache;
//! # use multiread_container::mock::MemoryFormat;
//! # use std::sync::Arc;
//! # fn main() -> multiread_shim::error::Result<()> {
//! let opener = Opener::new(Arc::new(MemoryFormat::default()), ContentCache::default());
//! for path in expand(&opener, &Convention::default(), ["runs/batch_0.fast5"])? {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

mod compat;
mod convert;
mod copy;
mod discover;
mod expand;
mod open;
mod read;
mod session;
mod vpath;

pub use crate::compat::{LooseVersion, check_compatibility};
pub use crate::convert::{Converter, MAPPING_FILE, Summary};
pub use crate::copy::{ContainerCopier, FileCopier, PlainCopier};
pub use crate::discover::Discovered;
pub use crate::expand::{DirectoryLister, ExpandingLister, FileLister, expand};
pub use crate::open::Opener;
pub use crate::read::ReadMetadata;
pub use crate::session::Session;
pub use crate::vpath::{Convention, Decoded, Location};
