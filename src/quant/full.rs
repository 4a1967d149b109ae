// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use byteorder::{ByteOrder, LittleEndian};

use super::{check_dim, Quantizer};
use crate::error::{FormatError, Result};

/// No-Op Quantizer (stores full f32 floats as bytes).
#[derive(Debug, Clone)]
pub struct FullQuantizer {
    dim: usize,
}

impl FullQuantizer {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Quantizer for FullQuantizer {
    fn fit(&mut self, _vectors: &[&[f32]]) -> Result<()> {
        Ok(())
    }

    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>> {
        check_dim(self.dim, vec)?;
        let mut out = vec![0u8; vec.len() * 4];
        LittleEndian::write_f32_into(vec, &mut out);
        Ok(out)
    }

    fn reconstruct_into(&self, code: &[u8], out: &mut [f32]) -> Result<()> {
        if code.len() != self.dim * 4 || out.len() != self.dim {
            return Err(FormatError::Corrupt(format!(
                "full code of {} bytes for dim {}",
                code.len(),
                self.dim
            ))
            .into());
        }
        LittleEndian::read_f32_into(code, out);
        Ok(())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn bits_per_weight(&self) -> u8 {
        32
    }

    fn code_len(&self) -> Option<usize> {
        Some(self.dim * 4)
    }

    fn param_blob(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
