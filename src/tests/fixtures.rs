// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic data and store helpers shared by the test modules.

use std::path::{Path, PathBuf};

use crate::builder::Builder;
use crate::config::BuilderConfig;
use crate::quant::StorageType;

/// A simple deterministic RNG for tests.
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed, inc: 1 }
    }

    pub fn next_u32(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate.wrapping_mul(6364136223846793005).wrapping_add(self.inc);
        let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform in `[-1, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 23) as f32 - 1.0
    }
}

pub fn random_vectors(seed: u64, count: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = Pcg32::new(seed);
    (0..count).map(|_| (0..dim).map(|_| rng.next_f32()).collect()).collect()
}

/// Weights drawn from three tight clusters around `-1`, `0` and `2`.
pub fn clustered_vectors(seed: u64, count: usize, dim: usize) -> Vec<Vec<f32>> {
    const CENTERS: [f32; 3] = [-1.0, 0.0, 2.0];
    let mut rng = Pcg32::new(seed);
    (0..count)
        .map(|_| {
            (0..dim)
                .map(|_| CENTERS[(rng.next_u32() % 3) as usize] + rng.next_f32() * 0.01)
                .collect()
        })
        .collect()
}

pub fn word(i: usize) -> String {
    format!("word{i}")
}

/// Builds and saves a store of `vectors` keyed `word0..`, returning its path.
pub fn build_store(dir: &Path, name: &str, storage: StorageType, vectors: &[Vec<f32>]) -> PathBuf {
    let dim = vectors[0].len();
    let mut builder = Builder::new(BuilderConfig::new(dim, storage)).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        builder.add_word(&word(i), v).unwrap();
    }
    let path = dir.join(name);
    builder.save(&path).unwrap();
    path
}

/// Builds a full-precision store from explicit `(word, vector)` pairs.
pub fn build_named_store(dir: &Path, name: &str, entries: &[(&str, Vec<f32>)]) -> PathBuf {
    let mut builder = Builder::new(BuilderConfig::new(entries[0].1.len(), StorageType::Full)).unwrap();
    for (w, v) in entries {
        builder.add_word(w, v).unwrap();
    }
    let path = dir.join(name);
    builder.save(&path).unwrap();
    path
}

pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
}
