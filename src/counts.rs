//! Count vectors: per-document topic occurrence counts and global
//! word-topic counts. Both support the incremental `add` used by
//! `transition`, and the decrement-then-increment `resample_update` used by
//! rejuvenation, in addition to a cheap deep copy for particle duplication.

use ahash::AHashMap;
use ndarray::Array1;

/// Per-topic occurrence counts for a single document, plus the running
/// total word count. `T` (the topic count) is fixed for the lifetime of a
/// run, so a dense array is the natural representation.
#[derive(Debug, Clone)]
pub struct DocumentCounts {
    counts: Array1<u32>,
    total: u32,
}

impl DocumentCounts {
    pub fn new(topics: usize) -> Self {
        DocumentCounts {
            counts: Array1::zeros(topics),
            total: 0,
        }
    }

    pub fn add(&mut self, topic: usize) {
        self.counts[topic] += 1;
        self.total += 1;
    }

    /// Decrements `old_topic` (saturating at zero) and increments
    /// `new_topic`; the total word count is unchanged. A no-op when
    /// `old_topic == new_topic`.
    pub fn resample_update(&mut self, old_topic: usize, new_topic: usize) {
        if old_topic == new_topic {
            return;
        }
        self.counts[old_topic] = self.counts[old_topic].saturating_sub(1);
        self.counts[new_topic] += 1;
    }

    pub fn count(&self, topic: usize) -> u32 {
        self.counts[topic]
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Global word-topic counts: a sparse map keyed by `(word_id, topic)`, plus
/// a dense per-topic total. Absent keys read as zero. The word dimension
/// grows without bound as the vocabulary grows, so it stays a hash map
/// rather than a dense array.
#[derive(Debug, Clone)]
pub struct GlobalCounts {
    counts: AHashMap<(u32, usize), u32>,
    totals: Array1<u64>,
}

impl GlobalCounts {
    pub fn new(topics: usize) -> Self {
        GlobalCounts {
            counts: AHashMap::new(),
            totals: Array1::zeros(topics),
        }
    }

    pub fn add(&mut self, word_id: u32, topic: usize) {
        *self.counts.entry((word_id, topic)).or_insert(0) += 1;
        self.totals[topic] += 1;
    }

    /// Decrements `(word_id, old_topic)` (removing the entry once it hits
    /// zero) and increments `(word_id, new_topic)`, updating the per-topic
    /// totals accordingly. A no-op when `old_topic == new_topic`.
    pub fn resample_update(&mut self, word_id: u32, old_topic: usize, new_topic: usize) {
        if old_topic == new_topic {
            return;
        }
        if let Some(c) = self.counts.get_mut(&(word_id, old_topic)) {
            if *c <= 1 {
                self.counts.remove(&(word_id, old_topic));
            } else {
                *c -= 1;
            }
        }
        *self.counts.entry((word_id, new_topic)).or_insert(0) += 1;
        self.totals[old_topic] = self.totals[old_topic].saturating_sub(1);
        self.totals[new_topic] += 1;
    }

    pub fn count(&self, word_id: u32, topic: usize) -> u32 {
        self.counts.get(&(word_id, topic)).copied().unwrap_or(0)
    }

    pub fn total(&self, topic: usize) -> u64 {
        self.totals[topic]
    }

    pub fn topics(&self) -> usize {
        self.totals.len()
    }
}
