//! Streaming access to tar archives of containers.
//!
//! This crate provides the pieces a bulk converter needs to work through an
//! archive without unpacking it to disk:
//!
//! - **Compression detection** from magic bytes or archive suffixes
//!   ([`Compression`])
//! - **Retrieval** of matching entries into a shared [`ContentCache`]
//!   ([`TarArchive`], [`ArchiveRetriever`])
//! - **Batching** that evicts the cache at batch boundaries ([`Batcher`])
//! - **Progress** whose total grows as entries are discovered ([`Progress`])
//!
//! Everything here is synchronous and pull-based. Nothing is buffered beyond
//! one batch of entry contents.

mod batch;
mod cache;
mod encoding;
pub mod error;
mod peek;
mod progress;
mod retriever;

pub use crate::batch::{Batcher, Batches, Input, Streamed};
pub use crate::cache::ContentCache;
pub use crate::encoding::{ARCHIVE_SUFFIXES, Compression, is_archive_path};
pub use crate::peek::PeekableReader;
pub use crate::progress::{Progress, ProgressReporter};
pub use crate::retriever::{ArchiveEntry, ArchiveRetriever, TarArchive};
