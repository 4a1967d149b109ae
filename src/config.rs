// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants and construction-time settings.

use crate::quant::StorageType;

/// Magic marker at the start of every artifact.
pub const MAGIC: [u8; 4] = *b"MEMB";

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

/// Batches shorter than this are decoded on the calling thread.
pub const THREADED_DECODE_THRESHOLD: usize = 1024;

/// Worker count used by `Reader::open`.
pub const DEFAULT_NUM_THREADS: usize = 4;

/// Number of leading vectors sampled when training a scalar codebook.
pub const KMEANS_SAMPLE_VECTORS: usize = 10_000;

/// Fixed number of Lloyd iterations for codebook training.
pub const KMEANS_ITERATIONS: usize = 30;

/// Clusters holding at most `largest / SMALL_CLUSTER_FACTOR` values are pruned.
pub const KMEANS_SMALL_CLUSTER_FACTOR: usize = 128;

/// Longest prefix code the entropy coder emits.
pub const MAX_HUFFMAN_CODE_LEN: u8 = 24;

/// What `add_word` does with a word that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The newer vector replaces the stored one; the word keeps its index.
    #[default]
    LastWriteWins,
    /// The second insertion fails with `DuplicateWord`.
    Reject,
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub dim: usize,
    pub storage_type: StorageType,
    /// Requested width; clamped to the strategy's supported range.
    pub bits_per_weight: Option<u8>,
    pub duplicate_policy: DuplicatePolicy,
}

impl BuilderConfig {
    pub fn new(dim: usize, storage_type: StorageType) -> Self {
        Self {
            dim,
            storage_type,
            bits_per_weight: None,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_bits_per_weight(mut self, bits: u8) -> Self {
        self.bits_per_weight = Some(bits);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    /// Batch decode workers. `0` means one per available core.
    pub num_threads: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { num_threads: DEFAULT_NUM_THREADS }
    }
}

impl ReaderConfig {
    /// Resolves `0` to the machine's available parallelism.
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1)
    }
}
