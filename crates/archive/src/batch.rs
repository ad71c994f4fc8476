//! Fixed-size batching over indexable and one-pass inputs.
//!
//! Indexable input is sliced without buffering. One-pass input (an
//! [`ArchiveRetriever`](crate::ArchiveRetriever) feeding the cache, for
//! example) is buffered, and the shared [`ContentCache`] is cleared each time
//! the consumer comes back for the next batch. Whatever the previous batch
//! needed from the cache must therefore be used before pulling again.

use crate::cache::ContentCache;
use std::borrow::Cow;
use std::iter::{Empty, FusedIterator};
use std::num::NonZeroUsize;
use std::slice::Chunks;

/// Splits inputs into batches of at most `size` items.
#[derive(Clone, Debug)]
pub struct Batcher {
    size: NonZeroUsize,
    cache: ContentCache,
}

impl Batcher {
    pub const DEFAULT_SIZE: NonZeroUsize = match NonZeroUsize::new(4000) {
        Some(size) => size,
        None => unreachable!(),
    };

    pub fn new(size: NonZeroUsize, cache: ContentCache) -> Self {
        Self { size, cache }
    }

    pub fn size(&self) -> NonZeroUsize {
        self.size
    }

    /// Batch an indexable input: yields `items[k*size..min((k+1)*size, len)]`.
    /// Never touches the cache.
    pub fn slices<'a, T>(&self, items: &'a [T]) -> Chunks<'a, T> {
        items.chunks(self.size.get())
    }

    /// Batch a one-pass input, clearing the cache between batches.
    pub fn stream<I: IntoIterator>(&self, items: I) -> Streamed<I::IntoIter> {
        Streamed {
            items: items.into_iter(),
            size: self.size.get(),
            cache: self.cache.clone(),
            clear_pending: false,
            done: false,
        }
    }

    /// Batch either kind of input, dispatching on what it supports.
    ///
    /// ```
    /// use multiread_archive::{Batcher, ContentCache, Input};
    /// use std::num::NonZeroUsize;
    ///
    /// let batcher = Batcher::new(NonZeroUsize::new(2).unwrap(), ContentCache::default());
    /// let items = [1, 2, 3];
    /// let batches: Vec<Vec<i32>> = batcher.batch(Input::indexed(&items)).map(|b| b.into_owned()).collect();
    /// assert_eq!(batches, vec![vec![1, 2], vec![3]]);
    /// ```
    pub fn batch<'a, T, I>(&self, input: Input<'a, T, I>) -> Batches<'a, T, I::IntoIter>
    where
        T: Clone,
        I: IntoIterator<Item = T>,
    {
        match input {
            Input::Indexed(items) => Batches::Indexed(self.slices(items)),
            Input::Stream(items) => Batches::Stream(self.stream(items)),
        }
    }
}

/// Input to [`Batcher::batch`].
pub enum Input<'a, T, I> {
    /// Length and random access are available.
    Indexed(&'a [T]),
    /// Single pass only; length unknown.
    Stream(I),
}

impl<'a, T> Input<'a, T, Empty<T>> {
    /// Indexed input with no stream type to name.
    pub fn indexed(items: &'a [T]) -> Self {
        Input::Indexed(items)
    }
}

/// Batches produced by [`Batcher::stream`].
pub struct Streamed<I> {
    items: I,
    size: usize,
    cache: ContentCache,
    clear_pending: bool,
    done: bool,
}

impl<I: Iterator> Iterator for Streamed<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if std::mem::take(&mut self.clear_pending) {
            let evicted = self.cache.clear();
            tracing::debug!(evicted, "Cleared content cache at batch boundary");
        }
        let mut batch = Vec::with_capacity(self.size);
        for item in self.items.by_ref() {
            batch.push(item);
            if batch.len() == self.size {
                self.clear_pending = true;
                return Some(batch);
            }
        }
        self.done = true;
        (!batch.is_empty()).then_some(batch)
    }
}

impl<I: Iterator> FusedIterator for Streamed<I> {}

/// Batches produced by [`Batcher::batch`].
pub enum Batches<'a, T, I> {
    Indexed(Chunks<'a, T>),
    Stream(Streamed<I>),
}

impl<'a, T, I> Iterator for Batches<'a, T, I>
where
    T: Clone,
    I: Iterator<Item = T>,
{
    type Item = Cow<'a, [T]>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Batches::Indexed(chunks) => chunks.next().map(Cow::Borrowed),
            Batches::Stream(streamed) => streamed.next().map(Cow::Owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn batcher(size: usize, cache: ContentCache) -> Batcher {
        Batcher::new(NonZeroUsize::new(size).unwrap(), cache)
    }

    #[test]
    fn test_slices_of_ten_by_three() {
        let items: Vec<u32> = (1..=10).collect();
        let batches: Vec<&[u32]> = batcher(3, ContentCache::default()).slices(&items).collect();
        assert_eq!(batches, vec![&[1, 2, 3][..], &[4, 5, 6], &[7, 8, 9], &[10]]);
    }

    #[test]
    fn test_slices_leave_cache_alone() {
        let cache = ContentCache::default();
        cache.insert("a.fast5", b"a".to_vec());
        let items = [1, 2, 3, 4];
        assert_eq!(batcher(1, cache.clone()).slices(&items).count(), 4);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stream_clears_cache_before_each_new_batch() {
        let cache = ContentCache::default();
        let mut observed = Vec::new();
        let sizes: Vec<usize> = batcher(3, cache.clone())
            .stream((0..7).map(|i| {
                observed.push(cache.len());
                cache.insert(format!("{i}.fast5"), vec![0u8]);
                i
            }))
            .map(|batch| batch.len())
            .collect();

        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(observed, vec![0, 1, 2, 0, 1, 2, 0]);
        // The trailing partial batch is not followed by a clear.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stream_clear_waits_for_consumer() {
        let cache = ContentCache::default();
        let mut batches = batcher(2, cache.clone()).stream(0..4);
        cache.insert("in-use.fast5", b"x".to_vec());

        assert_eq!(batches.next(), Some(vec![0, 1]));
        assert!(cache.contains(std::path::Path::new("in-use.fast5")));
        assert_eq!(batches.next(), Some(vec![2, 3]));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stream_exact_multiple_ends_cleanly() {
        let cache = ContentCache::default();
        let mut batches = batcher(2, cache.clone()).stream(0..4);
        assert_eq!(batches.next(), Some(vec![0, 1]));
        assert_eq!(batches.next(), Some(vec![2, 3]));
        cache.insert("last.fast5", b"x".to_vec());
        assert_eq!(batches.next(), None);
        assert!(cache.is_empty());
        assert_eq!(batches.next(), None);
    }

    #[test]
    fn test_stream_empty_input() {
        assert_eq!(batcher(3, ContentCache::default()).stream(std::iter::empty::<u8>()).count(), 0);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(4)]
    #[case(11)]
    fn test_adaptive_batching_agrees(#[case] size: usize) {
        let items: Vec<u32> = (1..=10).collect();
        let batcher = batcher(size, ContentCache::default());
        let indexed: Vec<Vec<u32>> = batcher.batch(Input::indexed(&items)).map(Cow::into_owned).collect();
        let streamed: Vec<Vec<u32>> =
            batcher.batch(Input::Stream(items.iter().copied())).map(Cow::into_owned).collect();
        assert_eq!(indexed, streamed);
        assert_eq!(indexed.concat(), items);
        assert!(indexed.iter().all(|batch| batch.len() <= size));
    }
}
