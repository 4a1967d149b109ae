// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use super::kmeans::ScalarKMeans;
use super::{check_dim, encode_params, Quantizer};
use crate::bits::{packed_len, BitReader, BitWriter};
use crate::config::KMEANS_SAMPLE_VECTORS;
use crate::error::{FormatError, MembError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrainedParams {
    pub centroids: Vec<f32>,
}

/// Codebook quantizer: every weight is replaced by the index of the nearest
/// entry of one shared scalar codebook of at most `2^bits` entries.
#[derive(Debug, Clone)]
pub struct TrainedQuantizer {
    dim: usize,
    bits: u8,
    codebook: Option<ScalarKMeans>,
}

impl TrainedQuantizer {
    pub fn new(dim: usize, bits: u8) -> Self {
        Self { dim, bits, codebook: None }
    }

    pub(crate) fn from_params(dim: usize, bits: u8, params: TrainedParams) -> Result<Self> {
        let codebook = ScalarKMeans::from_centroids(params.centroids)?;
        if codebook.centroids().len() > 1usize << bits {
            return Err(FormatError::Corrupt(format!(
                "codebook of {} entries exceeds {} bits",
                codebook.centroids().len(),
                bits
            ))
            .into());
        }
        Ok(Self { dim, bits, codebook: Some(codebook) })
    }

    pub fn centroids(&self) -> Option<&[f32]> {
        self.codebook.as_ref().map(|c| c.centroids())
    }

    /// Codebook index of every weight.
    pub fn assign(&self, vec: &[f32]) -> Result<Vec<u8>> {
        let codebook = self.codebook.as_ref().ok_or(MembError::NotFitted)?;
        check_dim(self.dim, vec)?;
        Ok(vec.iter().map(|v| codebook.predict(*v)).collect())
    }

    #[inline]
    pub(crate) fn centroid(&self, index: u32) -> Result<f32> {
        self.centroids()
            .and_then(|c| c.get(index as usize).copied())
            .ok_or_else(|| FormatError::Corrupt(format!("codebook index {index} out of range")).into())
    }
}

impl Quantizer for TrainedQuantizer {
    /// Trains on the first `KMEANS_SAMPLE_VECTORS` vectors in insertion order.
    fn fit(&mut self, vectors: &[&[f32]]) -> Result<()> {
        let mut sample = Vec::new();
        for vec in vectors.iter().take(KMEANS_SAMPLE_VECTORS) {
            check_dim(self.dim, vec)?;
            sample.extend_from_slice(vec);
        }
        self.codebook = Some(ScalarKMeans::fit(&sample, 1usize << self.bits)?);
        tracing::debug!(
            entries = self.codebook.as_ref().map_or(0, |c| c.centroids().len()),
            bits = self.bits,
            "trained scalar codebook"
        );
        Ok(())
    }

    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>> {
        let indices = self.assign(vec)?;
        let mut writer = BitWriter::with_capacity(packed_len(self.bits, self.dim));
        for idx in indices {
            writer.push(idx as u32, self.bits);
        }
        Ok(writer.into_bytes())
    }

    fn reconstruct_into(&self, code: &[u8], out: &mut [f32]) -> Result<()> {
        if code.len() != packed_len(self.bits, self.dim) || out.len() != self.dim {
            return Err(FormatError::Corrupt(format!("trained code of {} bytes", code.len())).into());
        }
        let mut reader = BitReader::new(code);
        for slot in out.iter_mut() {
            let idx = reader
                .read(self.bits)
                .ok_or_else(|| FormatError::Corrupt("trained code ended early".into()))?;
            *slot = self.centroid(idx)?;
        }
        Ok(())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn bits_per_weight(&self) -> u8 {
        self.bits
    }

    fn code_len(&self) -> Option<usize> {
        Some(packed_len(self.bits, self.dim))
    }

    fn param_blob(&self) -> Result<Vec<u8>> {
        let centroids = self.centroids().ok_or(MembError::NotFitted)?;
        encode_params(&TrainedParams { centroids: centroids.to_vec() })
    }
}
