// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};

use super::{check_dim, encode_params, Quantizer};
use crate::bits::{packed_len, BitReader, BitWriter};
use crate::error::{FormatError, MembError, Result};

/// Per-dimension affine map: `value = offset[d] + code * scale[d]`.
///
/// `scale` is kept in `f64`: the step of a dimension spanning most of the
/// `f32` range does not fit in an `f32`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UniformParams {
    pub offset: Vec<f32>,
    pub scale: Vec<f64>,
}

/// Linear quantizer fit on the per-dimension min/max of every vector.
///
/// The reconstruction error of an in-range value is at most `scale[d] / 2`.
#[derive(Debug, Clone)]
pub struct UniformQuantizer {
    dim: usize,
    bits: u8,
    params: Option<UniformParams>,
}

impl UniformQuantizer {
    pub fn new(dim: usize, bits: u8) -> Self {
        Self { dim, bits, params: None }
    }

    pub(crate) fn from_params(dim: usize, bits: u8, params: UniformParams) -> Result<Self> {
        if params.offset.len() != dim || params.scale.len() != dim {
            return Err(FormatError::Corrupt(format!(
                "uniform parameters sized {}/{} for dim {}",
                params.offset.len(),
                params.scale.len(),
                dim
            ))
            .into());
        }
        if params.offset.iter().any(|o| !o.is_finite()) || params.scale.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(FormatError::Corrupt("uniform parameters are not finite".into()).into());
        }
        Ok(Self { dim, bits, params: Some(params) })
    }

    pub fn params(&self) -> Option<&UniformParams> {
        self.params.as_ref()
    }

    fn max_level(&self) -> u32 {
        (1u32 << self.bits) - 1
    }
}

impl Quantizer for UniformQuantizer {
    fn fit(&mut self, vectors: &[&[f32]]) -> Result<()> {
        if vectors.is_empty() {
            return Err(MembError::EmptyInput);
        }
        let mut lo = vec![f32::INFINITY; self.dim];
        let mut hi = vec![f32::NEG_INFINITY; self.dim];
        for vec in vectors {
            check_dim(self.dim, vec)?;
            for (d, &v) in vec.iter().enumerate() {
                lo[d] = lo[d].min(v);
                hi[d] = hi[d].max(v);
            }
        }

        let levels = self.max_level() as f64;
        let scale = lo
            .iter()
            .zip(&hi)
            .map(|(l, h)| (*h as f64 - *l as f64) / levels)
            .collect();
        self.params = Some(UniformParams { offset: lo, scale });
        Ok(())
    }

    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>> {
        let params = self.params.as_ref().ok_or(MembError::NotFitted)?;
        check_dim(self.dim, vec)?;

        let max_level = self.max_level();
        let mut writer = BitWriter::with_capacity(packed_len(self.bits, self.dim));
        for (d, &v) in vec.iter().enumerate() {
            let scale = params.scale[d];
            let level = if scale > 0.0 {
                ((v as f64 - params.offset[d] as f64) / scale).round().clamp(0.0, max_level as f64) as u32
            } else {
                0
            };
            writer.push(level, self.bits);
        }
        Ok(writer.into_bytes())
    }

    fn reconstruct_into(&self, code: &[u8], out: &mut [f32]) -> Result<()> {
        let params = self.params.as_ref().ok_or(MembError::NotFitted)?;
        if code.len() != packed_len(self.bits, self.dim) || out.len() != self.dim {
            return Err(FormatError::Corrupt(format!("uniform code of {} bytes", code.len())).into());
        }

        let mut reader = BitReader::new(code);
        for (d, slot) in out.iter_mut().enumerate() {
            let level = reader
                .read(self.bits)
                .ok_or_else(|| FormatError::Corrupt("uniform code ended early".into()))?;
            *slot = (params.offset[d] as f64 + level as f64 * params.scale[d]) as f32;
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
        let params = self.params.as_ref().ok_or(MembError::NotFitted)?;
        encode_params(params)
    }
}
