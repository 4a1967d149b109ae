// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod full;
pub mod huffman;
pub mod kmeans;
pub mod trained;
pub mod uniform;

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, MembError, Result};

pub use full::FullQuantizer;
pub use huffman::HuffmanQuantizer;
pub use trained::TrainedQuantizer;
pub use uniform::UniformQuantizer;

/// Abstract interface for vector quantization.
pub trait Quantizer {
    /// Learn shared parameters from the full vector set. No-op for identity codecs.
    fn fit(&mut self, vectors: &[&[f32]]) -> Result<()>;

    /// Compress a vector into its code. Requires a prior `fit`.
    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>>;

    /// Decompress a code into `out` (length `dim`).
    fn reconstruct_into(&self, code: &[u8], out: &mut [f32]) -> Result<()>;

    fn reconstruct(&self, code: &[u8]) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.dim()];
        self.reconstruct_into(code, &mut out)?;
        Ok(out)
    }

    fn dim(&self) -> usize;

    /// Effective width after clamping.
    fn bits_per_weight(&self) -> u8;

    /// Exact code size in bytes, `None` for variable-width codes.
    fn code_len(&self) -> Option<usize>;

    /// Shared decode parameters as stored in the artifact.
    fn param_blob(&self) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Full,
    Uniform,
    Trained,
    Huffman,
}

impl StorageType {
    pub const ALL: [StorageType; 4] = [
        StorageType::Full,
        StorageType::Uniform,
        StorageType::Trained,
        StorageType::Huffman,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StorageType::Full => "full",
            StorageType::Uniform => "uniform",
            StorageType::Trained => "trained",
            StorageType::Huffman => "huffman",
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            StorageType::Full => 0,
            StorageType::Uniform => 1,
            StorageType::Trained => 2,
            StorageType::Huffman => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }

    pub fn supported_bits(self) -> RangeInclusive<u8> {
        match self {
            StorageType::Full => 32..=32,
            StorageType::Uniform => 1..=16,
            StorageType::Trained | StorageType::Huffman => 1..=8,
        }
    }

    pub fn default_bits(self) -> u8 {
        match self {
            StorageType::Full => 32,
            StorageType::Uniform => 8,
            StorageType::Trained | StorageType::Huffman => 4,
        }
    }

    /// Nearest supported width to `requested`.
    pub fn clamp_bits(self, requested: u8) -> u8 {
        let range = self.supported_bits();
        requested.clamp(*range.start(), *range.end())
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageType {
    type Err = MembError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|st| st.name() == s)
            .ok_or_else(|| MembError::UnknownStorageType(s.to_string()))
    }
}

pub fn available_storage_types() -> Vec<&'static str> {
    StorageType::ALL.iter().map(|s| s.name()).collect()
}

/// Closed set of strategies; the decode path dispatches by `match`.
#[derive(Debug, Clone)]
pub enum Codec {
    Full(FullQuantizer),
    Uniform(UniformQuantizer),
    Trained(TrainedQuantizer),
    Huffman(HuffmanQuantizer),
}

impl Codec {
    /// Unfitted codec. `bits` is clamped; `None` selects the strategy default.
    pub fn new(storage: StorageType, dim: usize, bits: Option<u8>) -> Self {
        let bits = storage.clamp_bits(bits.unwrap_or_else(|| storage.default_bits()));
        match storage {
            StorageType::Full => Codec::Full(FullQuantizer::new(dim)),
            StorageType::Uniform => Codec::Uniform(UniformQuantizer::new(dim, bits)),
            StorageType::Trained => Codec::Trained(TrainedQuantizer::new(dim, bits)),
            StorageType::Huffman => Codec::Huffman(HuffmanQuantizer::new(dim, bits)),
        }
    }

    /// Rebuilds a fitted codec from an artifact's parameter block.
    pub fn from_params(storage: StorageType, dim: usize, bits: u8, blob: &[u8]) -> Result<Self> {
        if !storage.supported_bits().contains(&bits) {
            return Err(FormatError::Corrupt(format!(
                "{storage} storage does not support {bits} bits per weight"
            ))
            .into());
        }
        Ok(match storage {
            StorageType::Full => {
                if !blob.is_empty() {
                    return Err(FormatError::Corrupt("full storage carries parameters".into()).into());
                }
                Codec::Full(FullQuantizer::new(dim))
            }
            StorageType::Uniform => Codec::Uniform(UniformQuantizer::from_params(dim, bits, decode_params(blob)?)?),
            StorageType::Trained => Codec::Trained(TrainedQuantizer::from_params(dim, bits, decode_params(blob)?)?),
            StorageType::Huffman => Codec::Huffman(HuffmanQuantizer::from_params(dim, bits, decode_params(blob)?)?),
        })
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Codec::Full(_) => StorageType::Full,
            Codec::Uniform(_) => StorageType::Uniform,
            Codec::Trained(_) => StorageType::Trained,
            Codec::Huffman(_) => StorageType::Huffman,
        }
    }

    fn inner(&self) -> &dyn Quantizer {
        match self {
            Codec::Full(q) => q,
            Codec::Uniform(q) => q,
            Codec::Trained(q) => q,
            Codec::Huffman(q) => q,
        }
    }
}

impl Quantizer for Codec {
    fn fit(&mut self, vectors: &[&[f32]]) -> Result<()> {
        match self {
            Codec::Full(q) => q.fit(vectors),
            Codec::Uniform(q) => q.fit(vectors),
            Codec::Trained(q) => q.fit(vectors),
            Codec::Huffman(q) => q.fit(vectors),
        }
    }

    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>> {
        self.inner().quantize(vec)
    }

    #[inline]
    fn reconstruct_into(&self, code: &[u8], out: &mut [f32]) -> Result<()> {
        match self {
            Codec::Full(q) => q.reconstruct_into(code, out),
            Codec::Uniform(q) => q.reconstruct_into(code, out),
            Codec::Trained(q) => q.reconstruct_into(code, out),
            Codec::Huffman(q) => q.reconstruct_into(code, out),
        }
    }

    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn bits_per_weight(&self) -> u8 {
        self.inner().bits_per_weight()
    }

    fn code_len(&self) -> Option<usize> {
        self.inner().code_len()
    }

    fn param_blob(&self) -> Result<Vec<u8>> {
        self.inner().param_blob()
    }
}

pub(crate) fn check_dim(expected: usize, vec: &[f32]) -> Result<()> {
    if vec.len() != expected {
        return Err(MembError::DimensionMismatch { expected, found: vec.len() });
    }
    Ok(())
}

pub(crate) fn encode_params<T: Serialize>(params: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(params, bincode::config::standard())?)
}

pub(crate) fn decode_params<T: DeserializeOwned>(blob: &[u8]) -> Result<T> {
    let (params, read) = bincode::serde::decode_from_slice(blob, bincode::config::standard())?;
    if read != blob.len() {
        return Err(FormatError::Corrupt(format!(
            "parameter block has {} trailing bytes",
            blob.len() - read
        ))
        .into());
    }
    Ok(params)
}
