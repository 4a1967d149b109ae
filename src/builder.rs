// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Accumulates `(word, vector)` pairs and writes the quantized artifact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::artifact::{self, ArtifactHeader};
use crate::config::{BuilderConfig, DuplicatePolicy};
use crate::error::{MembError, Result};
use crate::quant::{Codec, Quantizer, StorageType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Open,
    Finalized,
}

pub struct Builder {
    config: BuilderConfig,
    bits_per_weight: u8,
    words: Vec<String>,
    /// Row-major, `dim` values per word, in insertion order.
    values: Vec<f32>,
    index: FxHashMap<String, usize>,
    state: BuilderState,
}

/// Fitted parameters and codes, ready to serialize.
struct EncodedStore<'a> {
    header: ArtifactHeader,
    params: Vec<u8>,
    words: &'a [String],
    codes: Vec<Vec<u8>>,
}

impl Builder {
    pub fn new(config: BuilderConfig) -> Result<Self> {
        if config.dim == 0 || u32::try_from(config.dim).is_err() {
            return Err(MembError::InvalidDimension(config.dim));
        }
        let bits_per_weight = config
            .storage_type
            .clamp_bits(config.bits_per_weight.unwrap_or_else(|| config.storage_type.default_bits()));
        Ok(Self {
            config,
            bits_per_weight,
            words: Vec::new(),
            values: Vec::new(),
            index: FxHashMap::default(),
            state: BuilderState::Open,
        })
    }

    /// Registers `vector` under `word`. Nothing is quantized until `save`.
    pub fn add_word(&mut self, word: &str, vector: &[f32]) -> Result<()> {
        if self.state == BuilderState::Finalized {
            return Err(MembError::InvalidState);
        }
        if word.is_empty() {
            return Err(MembError::EmptyWord);
        }
        if vector.len() != self.config.dim {
            return Err(MembError::DimensionMismatch { expected: self.config.dim, found: vector.len() });
        }
        if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
            return Err(MembError::InvalidValue { word: word.to_string(), index });
        }

        match self.index.get(word) {
            Some(&row) => match self.config.duplicate_policy {
                DuplicatePolicy::Reject => return Err(MembError::DuplicateWord(word.to_string())),
                DuplicatePolicy::LastWriteWins => {
                    let dim = self.config.dim;
                    self.values[row * dim..(row + 1) * dim].copy_from_slice(vector);
                }
            },
            None => {
                self.index.insert(word.to_string(), self.words.len());
                self.words.push(word.to_string());
                self.values.extend_from_slice(vector);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    pub fn storage_type(&self) -> StorageType {
        self.config.storage_type
    }

    /// Effective width after clamping.
    pub fn bits_per_weight(&self) -> u8 {
        self.bits_per_weight
    }

    pub fn is_finalized(&self) -> bool {
        self.state == BuilderState::Finalized
    }

    /// Fits, encodes and serializes the store to `writer`. Does not finalize.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<u64> {
        self.encode()?.write(writer)
    }

    /// Writes the artifact to `path` and finalizes the builder.
    ///
    /// On any error the builder stays open and the call may be retried.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.state == BuilderState::Finalized {
            return Err(MembError::InvalidState);
        }
        let encoded = self.encode()?;

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        let written = encoded.write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;

        self.state = BuilderState::Finalized;
        tracing::info!(
            path = %path.as_ref().display(),
            words = self.words.len(),
            dim = self.config.dim,
            storage = %self.config.storage_type,
            bits = self.bits_per_weight,
            bytes = written,
            "saved embedding store"
        );
        Ok(())
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.config.dim)
    }

    fn encode(&self) -> Result<EncodedStore<'_>> {
        if self.words.is_empty() {
            return Err(MembError::EmptyInput);
        }
        let dim = self.config.dim;
        let storage = self.config.storage_type;

        let mut codec = Codec::new(storage, dim, Some(self.bits_per_weight));
        let rows: Vec<&[f32]> = self.rows().collect();
        codec.fit(&rows)?;
        let codes = rows
            .iter()
            .map(|row| codec.quantize(row))
            .collect::<Result<Vec<_>>>()?;
        let params = codec.param_blob()?;

        tracing::debug!(
            words = codes.len(),
            storage = %storage,
            params = params.len(),
            codes = codes.iter().map(Vec::len).sum::<usize>(),
            "encoded embedding store"
        );

        let header = ArtifactHeader::new(
            dim as u32,
            storage,
            codec.bits_per_weight(),
            codes.len() as u64,
            params.len() as u64,
        );
        Ok(EncodedStore { header, params, words: &self.words, codes })
    }
}

impl EncodedStore<'_> {
    fn write<W: Write>(&self, writer: W) -> Result<u64> {
        let records: Vec<(&str, &[u8])> = self
            .words
            .iter()
            .zip(&self.codes)
            .map(|(w, c)| (w.as_str(), c.as_slice()))
            .collect();
        artifact::write_artifact(writer, &self.header, &self.params, &records)
    }
}
