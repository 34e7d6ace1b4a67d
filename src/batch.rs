//! Splitting record sequences into request-sized chunks.
use std::slice::Chunks;

/// Contiguous chunks of at most `max_batch_size` items, in order; only the
/// last may be shorter. Calling it again restarts from the beginning.
///
/// `max_batch_size` is checked by `LoadConfig::validate`; zero panics.
pub fn chunk<T>(items: &[T], max_batch_size: usize) -> Chunks<'_, T> {
    items.chunks(max_batch_size)
}

/// Number of chunks `count` items split into.
pub fn chunk_count(count: usize, max_batch_size: usize) -> usize {
    count.div_ceil(max_batch_size)
}

/// Lengths of the chunks `count` items split into, in order.
pub fn chunk_lens(count: usize, max_batch_size: usize) -> impl Iterator<Item = usize> {
    (0..chunk_count(count, max_batch_size))
        .map(move |i| max_batch_size.min(count - i * max_batch_size))
}
