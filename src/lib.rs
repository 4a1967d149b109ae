// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! memb: compact quantized word-embedding stores.
//!
//! A [`Builder`] collects `(word, vector)` pairs and writes one immutable
//! artifact; a [`Reader`] memory-maps it and serves single and batch lookups.
//! [`ReadersUnion`] and [`ConcatenatingReader`] merge several sources.

pub mod artifact;
pub mod bits;
pub mod builder;
pub mod config;
pub mod error;
pub mod matrix;
pub mod quant;
pub mod reader;
pub mod source;
pub mod union;

#[cfg(test)]
mod tests;

pub use builder::Builder;
pub use config::{BuilderConfig, DuplicatePolicy, ReaderConfig};
pub use error::{FormatError, MembError, Result};
pub use matrix::Matrix;
pub use quant::{available_storage_types, StorageType};
pub use reader::Reader;
pub use source::Embeddings;
pub use union::{ConcatenatingReader, MergeMode, ReadersUnion, SharedEmbeddings};
