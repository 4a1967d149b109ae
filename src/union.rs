// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Several sources presented as one.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{MembError, Result};
use crate::matrix::Matrix;
use crate::source::Embeddings;

/// Shared handle to any source; unions hold these so they can nest.
pub type SharedEmbeddings = Arc<dyn Embeddings + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Element-wise mean; members must share `dim`.
    Average,
    /// Member vectors joined in member order.
    Concatenate,
}

impl MergeMode {
    pub fn name(self) -> &'static str {
        match self {
            MergeMode::Average => "average",
            MergeMode::Concatenate => "concatenate",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MergeMode {
    type Err = MembError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "average" => Ok(MergeMode::Average),
            "concatenate" => Ok(MergeMode::Concatenate),
            other => Err(MembError::UnsupportedMergeMode(other.to_string())),
        }
    }
}

/// Merges the vectors of two or more sources.
pub struct ReadersUnion {
    readers: Vec<SharedEmbeddings>,
    mode: MergeMode,
    dim: usize,
}

impl ReadersUnion {
    pub fn new(readers: Vec<SharedEmbeddings>, mode: MergeMode) -> Result<Self> {
        if readers.len() < 2 {
            return Err(MembError::NotEnoughReaders { required: 2, found: readers.len() });
        }
        let dim = match mode {
            MergeMode::Average => {
                let dim = readers[0].dim();
                if let Some(other) = readers.iter().map(|r| r.dim()).find(|d| *d != dim) {
                    return Err(MembError::DimensionMismatch { expected: dim, found: other });
                }
                dim
            }
            MergeMode::Concatenate => readers.iter().map(|r| r.dim()).sum(),
        };
        Ok(Self { readers, mode, dim })
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    pub fn readers(&self) -> &[SharedEmbeddings] {
        &self.readers
    }

    fn merge(&self, parts: &[Matrix]) -> Result<Matrix> {
        match self.mode {
            MergeMode::Average => Matrix::mean(parts),
            MergeMode::Concatenate => Matrix::hconcat(parts),
        }
    }
}

impl Embeddings for ReadersUnion {
    fn dim(&self) -> usize {
        self.dim
    }

    /// Sorted union of member vocabularies.
    fn keys(&self) -> Vec<String> {
        union_keys(&self.readers)
    }

    fn word_embedding(&self, word: &str) -> Result<Vec<f32>> {
        Ok(self.batch_embedding(&[word])?.into_vec())
    }

    fn batch_embedding(&self, words: &[&str]) -> Result<Matrix> {
        let parts = self
            .readers
            .iter()
            .map(|r| r.batch_embedding(words))
            .collect::<Result<Vec<_>>>()?;
        self.merge(&parts)
    }

    fn tokenizer_embedding(&self, word_index: &HashMap<String, usize>, num_words: Option<usize>) -> Result<Matrix> {
        let parts = self
            .readers
            .iter()
            .map(|r| r.tokenizer_embedding(word_index, num_words))
            .collect::<Result<Vec<_>>>()?;
        self.merge(&parts)
    }
}

/// Concatenation of one or more sources.
pub struct ConcatenatingReader {
    readers: Vec<SharedEmbeddings>,
    dim: usize,
}

impl ConcatenatingReader {
    pub fn new(readers: Vec<SharedEmbeddings>) -> Result<Self> {
        if readers.is_empty() {
            return Err(MembError::NotEnoughReaders { required: 1, found: 0 });
        }
        let dim = readers.iter().map(|r| r.dim()).sum();
        Ok(Self { readers, dim })
    }

    pub fn readers(&self) -> &[SharedEmbeddings] {
        &self.readers
    }
}

impl Embeddings for ConcatenatingReader {
    fn dim(&self) -> usize {
        self.dim
    }

    fn keys(&self) -> Vec<String> {
        union_keys(&self.readers)
    }

    fn word_embedding(&self, word: &str) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.dim);
        for reader in &self.readers {
            out.extend(reader.word_embedding(word)?);
        }
        Ok(out)
    }

    fn batch_embedding(&self, words: &[&str]) -> Result<Matrix> {
        let parts = self
            .readers
            .iter()
            .map(|r| r.batch_embedding(words))
            .collect::<Result<Vec<_>>>()?;
        Matrix::hconcat(&parts)
    }
}

fn union_keys(readers: &[SharedEmbeddings]) -> Vec<String> {
    let keys: BTreeSet<String> = readers.iter().flat_map(|r| r.keys()).collect();
    keys.into_iter().collect()
}
