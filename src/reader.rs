// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Memory-mapped artifact reader with a threaded batch decode path.

use std::fs::File;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashMap;

use crate::artifact::{self, ArtifactHeader};
use crate::config::{ReaderConfig, THREADED_DECODE_THRESHOLD};
use crate::error::{FormatError, MembError, Result};
use crate::matrix::Matrix;
use crate::quant::{Codec, Quantizer, StorageType};
use crate::source::Embeddings;

/// Absolute byte range of one code inside the mapped file.
#[derive(Debug, Clone, Copy)]
struct Slot {
    start: usize,
    len: usize,
}

pub struct Reader {
    path: PathBuf,
    mmap: Mmap,
    header: ArtifactHeader,
    params: Range<usize>,
    table: Range<usize>,
    codec: Codec,
    keys: Vec<String>,
    index: FxHashMap<String, Slot>,
    num_threads: usize,
    /// `None` when batches always decode on the calling thread.
    pool: Option<ThreadPool>,
}

impl Reader {
    /// Opens `path` with the default worker count.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ReaderConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // Artifacts are never modified after `save`.
        let mmap = unsafe { Mmap::map(&file)? };

        let layout = artifact::parse(&mmap)?;
        let header = layout.header.clone();
        let codec = Codec::from_params(
            header.storage,
            header.dim as usize,
            header.bits_per_weight,
            &mmap[layout.params.clone()],
        )?;
        let fixed_width = codec.code_len();

        let mut keys = Vec::with_capacity(layout.entries.len());
        let mut index = FxHashMap::with_capacity_and_hasher(layout.entries.len(), Default::default());
        for entry in &layout.entries {
            if entry.word.is_empty() {
                return Err(FormatError::Corrupt("empty word in vocabulary index".into()).into());
            }
            let len = entry.len as usize;
            if fixed_width.is_some_and(|w| w != len) {
                return Err(FormatError::Corrupt(format!(
                    "code of {:?} is {} bytes, expected {}",
                    entry.word,
                    len,
                    fixed_width.unwrap_or(0)
                ))
                .into());
            }
            let slot = Slot { start: layout.table.start + entry.offset as usize, len };
            if index.insert(entry.word.clone(), slot).is_some() {
                return Err(FormatError::Corrupt(format!("duplicate word {:?} in vocabulary index", entry.word)).into());
            }
            keys.push(entry.word.clone());
        }

        let num_threads = config.effective_threads();
        let pool = if num_threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("memb-decode-{i}"))
                .build()
                .map_err(io::Error::other)?;
            Some(pool)
        } else {
            None
        };

        tracing::debug!(
            path = %path.display(),
            words = keys.len(),
            dim = header.dim,
            storage = %header.storage,
            bits = header.bits_per_weight,
            threads = num_threads,
            "opened embedding store"
        );

        Ok(Self {
            path,
            mmap,
            header,
            params: layout.params,
            table: layout.table,
            codec,
            keys,
            index,
            num_threads,
            pool,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &ArtifactHeader {
        &self.header
    }

    pub fn dim(&self) -> usize {
        self.header.dim as usize
    }

    pub fn storage_type(&self) -> StorageType {
        self.header.storage
    }

    pub fn bits_per_weight(&self) -> u8 {
        self.header.bits_per_weight
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Size of the mapped artifact in bytes.
    pub fn file_len(&self) -> usize {
        self.mmap.len()
    }

    pub fn params_len(&self) -> usize {
        self.params.len()
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Vocabulary in artifact order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Decoded vector for `word`, or zeros when the word is absent.
    pub fn word_embedding(&self, word: &str) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.dim()];
        self.word_embedding_into(word, &mut out)?;
        Ok(out)
    }

    /// Like `word_embedding`, writing into `out` (length `dim`).
    pub fn word_embedding_into(&self, word: &str, out: &mut [f32]) -> Result<()> {
        if out.len() != self.dim() {
            return Err(MembError::DimensionMismatch { expected: self.dim(), found: out.len() });
        }
        match self.index.get(word) {
            Some(slot) => self.codec.reconstruct_into(&self.mmap[slot.start..slot.start + slot.len], out),
            None => {
                out.fill(0.0);
                Ok(())
            }
        }
    }

    /// Decodes `words` into a `(words.len(), dim)` matrix, row order preserved.
    ///
    /// Batches of at least `THREADED_DECODE_THRESHOLD` words are split into one
    /// contiguous chunk per worker; each chunk fills its own rows.
    pub fn batch_embedding(&self, words: &[&str]) -> Result<Matrix> {
        let dim = self.dim();
        let mut matrix = Matrix::zeros(words.len(), dim);

        match &self.pool {
            Some(pool) if words.len() >= THREADED_DECODE_THRESHOLD => {
                let chunk_rows = words.len().div_ceil(self.num_threads);
                let out = matrix.as_mut_slice();
                pool.install(|| {
                    out.par_chunks_mut(chunk_rows * dim)
                        .zip(words.par_chunks(chunk_rows))
                        .try_for_each(|(rows, chunk)| self.decode_rows(chunk, rows))
                })?;
            }
            _ => self.decode_rows(words, matrix.as_mut_slice())?,
        }
        Ok(matrix)
    }

    fn decode_rows(&self, words: &[&str], out: &mut [f32]) -> Result<()> {
        for (word, row) in words.iter().zip(out.chunks_exact_mut(self.dim())) {
            self.word_embedding_into(word, row)?;
        }
        Ok(())
    }
}

impl Embeddings for Reader {
    fn dim(&self) -> usize {
        Reader::dim(self)
    }

    fn keys(&self) -> Vec<String> {
        self.keys.clone()
    }

    fn word_embedding(&self, word: &str) -> Result<Vec<f32>> {
        Reader::word_embedding(self, word)
    }

    fn batch_embedding(&self, words: &[&str]) -> Result<Matrix> {
        Reader::batch_embedding(self, words)
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("words", &self.keys.len())
            .field("num_threads", &self.num_threads)
            .finish()
    }
}
