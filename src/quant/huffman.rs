// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Trained codebook with entropy-coded indices.
//!
//! Codebook indices are far from uniformly distributed (most weights sit
//! near zero), so a canonical Huffman code over the index frequencies of
//! the whole store beats fixed-width packing. Codes become variable-width.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use super::trained::{TrainedParams, TrainedQuantizer};
use super::{encode_params, Quantizer};
use crate::bits::{BitReader, BitWriter};
use crate::config::MAX_HUFFMAN_CODE_LEN;
use crate::error::{FormatError, MembError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HuffmanParams {
    pub centroids: Vec<f32>,
    /// Code length per codebook index; `0` for indices that never occur.
    pub code_lengths: Vec<u8>,
}

/// Canonical prefix code over byte symbols.
///
/// Codes are assigned in `(length, symbol)` order, so the lengths alone
/// determine the code and are all that is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixCode {
    lengths: Vec<u8>,
    codes: Vec<u32>,
    /// Number of codes of each length, indexed by length.
    counts: Vec<u32>,
    /// Symbols sorted by `(length, symbol)`.
    sorted: Vec<u8>,
}

impl PrefixCode {
    /// Builds a code from symbol frequencies.
    pub fn from_counts(counts: &[u64]) -> Result<Self> {
        let mut scaled = counts.to_vec();
        loop {
            let lengths = huffman_lengths(&scaled);
            if lengths.iter().all(|&l| l <= MAX_HUFFMAN_CODE_LEN) {
                return Self::from_lengths(lengths);
            }
            // Flatten the distribution until the tree is shallow enough.
            for c in scaled.iter_mut().filter(|c| **c > 0) {
                *c = (*c + 1) / 2;
            }
        }
    }

    pub fn from_lengths(lengths: Vec<u8>) -> Result<Self> {
        if lengths.len() > 256 {
            return Err(FormatError::Corrupt(format!("{} prefix code symbols", lengths.len())).into());
        }
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if max_len == 0 || max_len > MAX_HUFFMAN_CODE_LEN {
            return Err(FormatError::Corrupt(format!("prefix code length {max_len}")).into());
        }

        let mut counts = vec![0u32; max_len as usize + 1];
        for &l in lengths.iter().filter(|l| **l > 0) {
            counts[l as usize] += 1;
        }
        // Kraft inequality; an over-subscribed code is not decodable.
        let kraft: u64 = (1..=max_len as usize)
            .map(|l| (counts[l] as u64) << (max_len as usize - l))
            .sum();
        if kraft > 1u64 << max_len {
            return Err(FormatError::Corrupt("over-subscribed prefix code".into()).into());
        }

        let mut sorted: Vec<u8> = (0..lengths.len())
            .filter(|&s| lengths[s] > 0)
            .map(|s| s as u8)
            .collect();
        sorted.sort_by_key(|&s| (lengths[s as usize], s));

        let mut codes = vec![0u32; lengths.len()];
        let mut code = 0u32;
        let mut prev_len = 0u8;
        for &sym in &sorted {
            let len = lengths[sym as usize];
            code <<= len - prev_len;
            codes[sym as usize] = code;
            code += 1;
            prev_len = len;
        }

        Ok(Self { lengths, codes, counts, sorted })
    }

    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    pub fn encode(&self, symbol: u8, writer: &mut BitWriter) -> Result<()> {
        let len = self.lengths.get(symbol as usize).copied().unwrap_or(0);
        if len == 0 {
            return Err(MembError::Params(format!("symbol {symbol} has no prefix code")));
        }
        writer.push(self.codes[symbol as usize], len);
        Ok(())
    }

    /// Reads one symbol, canonical decoding one bit at a time.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Option<u8> {
        let mut code: i64 = 0;
        let mut first: i64 = 0;
        let mut index: i64 = 0;
        for len in 1..self.counts.len() {
            code |= reader.read_bit()? as i64;
            let count = self.counts[len] as i64;
            if code - count < first {
                return self.sorted.get((index + code - first) as usize).copied();
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        None
    }
}

/// Code lengths of an optimal prefix code. A lone symbol gets length 1.
fn huffman_lengths(counts: &[u64]) -> Vec<u8> {
    enum Node {
        Leaf(usize),
        Inner(usize, usize),
    }

    let mut lengths = vec![0u8; counts.len()];
    let mut nodes = Vec::new();
    // (weight, tie-break id, node index); ids keep the merge order deterministic.
    let mut heap = BinaryHeap::new();
    for (sym, &count) in counts.iter().enumerate().filter(|(_, c)| **c > 0) {
        heap.push(Reverse((count, sym, nodes.len())));
        nodes.push(Node::Leaf(sym));
    }

    match heap.len() {
        0 => return lengths,
        1 => {
            if let Some(Reverse((_, sym, _))) = heap.pop() {
                lengths[sym] = 1;
            }
            return lengths;
        }
        _ => {}
    }

    let mut next_id = counts.len();
    while heap.len() > 1 {
        let (Some(Reverse((wa, _, a))), Some(Reverse((wb, _, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(Reverse((wa + wb, next_id, nodes.len())));
        nodes.push(Node::Inner(a, b));
        next_id += 1;
    }

    let mut stack = vec![(nodes.len() - 1, 0u32)];
    while let Some((idx, depth)) = stack.pop() {
        match nodes[idx] {
            Node::Leaf(sym) => lengths[sym] = depth.min(u8::MAX as u32) as u8,
            Node::Inner(a, b) => {
                stack.push((a, depth + 1));
                stack.push((b, depth + 1));
            }
        }
    }
    lengths
}

#[derive(Debug, Clone)]
pub struct HuffmanQuantizer {
    trained: TrainedQuantizer,
    code: Option<PrefixCode>,
}

impl HuffmanQuantizer {
    pub fn new(dim: usize, bits: u8) -> Self {
        Self { trained: TrainedQuantizer::new(dim, bits), code: None }
    }

    pub(crate) fn from_params(dim: usize, bits: u8, params: HuffmanParams) -> Result<Self> {
        let centroid_count = params.centroids.len();
        let trained = TrainedQuantizer::from_params(dim, bits, TrainedParams { centroids: params.centroids })?;
        if params.code_lengths.len() != centroid_count {
            return Err(FormatError::Corrupt(format!(
                "{} code lengths for {} centroids",
                params.code_lengths.len(),
                centroid_count
            ))
            .into());
        }
        let code = PrefixCode::from_lengths(params.code_lengths)?;
        Ok(Self { trained, code: Some(code) })
    }

    pub fn prefix_code(&self) -> Option<&PrefixCode> {
        self.code.as_ref()
    }
}

impl Quantizer for HuffmanQuantizer {
    /// Trains the codebook, then counts index frequencies over every vector.
    fn fit(&mut self, vectors: &[&[f32]]) -> Result<()> {
        self.trained.fit(vectors)?;
        let entries = self.trained.centroids().map_or(0, |c| c.len());
        let mut counts = vec![0u64; entries];
        for vec in vectors {
            for idx in self.trained.assign(vec)? {
                counts[idx as usize] += 1;
            }
        }
        self.code = Some(PrefixCode::from_counts(&counts)?);
        Ok(())
    }

    fn quantize(&self, vec: &[f32]) -> Result<Vec<u8>> {
        let code = self.code.as_ref().ok_or(MembError::NotFitted)?;
        let mut writer = BitWriter::new();
        for idx in self.trained.assign(vec)? {
            code.encode(idx, &mut writer)?;
        }
        Ok(writer.into_bytes())
    }

    fn reconstruct_into(&self, bytes: &[u8], out: &mut [f32]) -> Result<()> {
        let code = self.code.as_ref().ok_or(MembError::NotFitted)?;
        if out.len() != self.trained.dim() {
            return Err(MembError::DimensionMismatch { expected: self.trained.dim(), found: out.len() });
        }
        let mut reader = BitReader::new(bytes);
        for slot in out.iter_mut() {
            let idx = code
                .decode(&mut reader)
                .ok_or_else(|| FormatError::Corrupt("huffman code ended early".into()))?;
            *slot = self.trained.centroid(idx as u32)?;
        }
        Ok(())
    }

    fn dim(&self) -> usize {
        self.trained.dim()
    }

    fn bits_per_weight(&self) -> u8 {
        self.trained.bits_per_weight()
    }

    fn code_len(&self) -> Option<usize> {
        None
    }

    fn param_blob(&self) -> Result<Vec<u8>> {
        let code = self.code.as_ref().ok_or(MembError::NotFitted)?;
        let centroids = self.trained.centroids().ok_or(MembError::NotFitted)?;
        encode_params(&HuffmanParams {
            centroids: centroids.to_vec(),
            code_lengths: code.lengths().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(code: &PrefixCode, symbols: &[u8]) -> Vec<u8> {
        let mut writer = BitWriter::new();
        for &s in symbols {
            code.encode(s, &mut writer).unwrap();
        }
        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        symbols.iter().map(|_| code.decode(&mut reader).unwrap()).collect()
    }

    #[test]
    fn test_frequent_symbols_get_shorter_codes() {
        let code = PrefixCode::from_counts(&[100, 1, 1, 50, 0]).unwrap();
        let lengths = code.lengths();
        assert!(lengths[0] <= lengths[3]);
        assert!(lengths[3] <= lengths[1]);
        assert_eq!(lengths[4], 0);
    }

    #[test]
    fn test_decode_recovers_symbols() {
        let code = PrefixCode::from_counts(&[40, 3, 9, 1, 1, 27, 0, 2]).unwrap();
        let symbols = [0u8, 5, 2, 7, 3, 4, 1, 0, 0, 5];
        assert_eq!(roundtrip(&code, &symbols), symbols);
    }

    #[test]
    fn test_single_symbol_code() {
        let code = PrefixCode::from_counts(&[0, 12]).unwrap();
        assert_eq!(code.lengths(), &[0, 1]);
        assert_eq!(roundtrip(&code, &[1, 1, 1]), vec![1, 1, 1]);
    }

    #[test]
    fn test_lengths_are_capped() {
        // Fibonacci weights produce a maximally skewed tree.
        let mut counts = vec![1u64, 1];
        while counts.len() < 40 {
            let n = counts.len();
            counts.push(counts[n - 1] + counts[n - 2]);
        }
        let code = PrefixCode::from_counts(&counts).unwrap();
        assert!(code.lengths().iter().all(|&l| l >= 1 && l <= MAX_HUFFMAN_CODE_LEN));
        let symbols: Vec<u8> = (0..40).collect();
        assert_eq!(roundtrip(&code, &symbols), symbols);
    }

    #[test]
    fn test_oversubscribed_lengths_rejected() {
        assert!(PrefixCode::from_lengths(vec![1, 1, 1]).is_err());
    }
}
