// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

/// Reasons an artifact is rejected at open time.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Invalid magic bytes in header")]
    BadMagic,

    #[error("Unsupported format version: {found}. Expected {expected}")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("Unknown storage tag: {0}")]
    UnknownStorageTag(u8),

    #[error("Checksum mismatch: expected {expected:016x}, found {found:016x}")]
    ChecksumMismatch { expected: u64, found: u64 },

    #[error("Truncated artifact: {0}")]
    Truncated(&'static str),

    #[error("Corrupt artifact: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum MembError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invalid dimension: {0}")]
    InvalidDimension(usize),

    #[error("Storage type {0} is not supported")]
    UnknownStorageType(String),

    #[error("Merge mode {0} is not supported. Available modes are average, concatenate")]
    UnsupportedMergeMode(String),

    #[error("Union needs at least {required} readers, got {found}")]
    NotEnoughReaders { required: usize, found: usize },

    #[error("Tokenizer row {0} is too large for an embedding matrix")]
    RowOutOfRange(usize),

    #[error("Non-finite value in vector for {word:?} at index {index}")]
    InvalidValue { word: String, index: usize },

    #[error("Empty word cannot be stored")]
    EmptyWord,

    #[error("Attempt to add duplicate word to index: {0:?}")]
    DuplicateWord(String),

    #[error("Builder already saved; no further changes accepted")]
    InvalidState,

    #[error("Quantizer used before fitting")]
    NotFitted,

    #[error("No words were added to the builder")]
    EmptyInput,

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Parameter block error: {0}")]
    Params(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for MembError {
    fn from(e: bincode::error::EncodeError) -> Self {
        MembError::Params(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for MembError {
    fn from(e: bincode::error::DecodeError) -> Self {
        MembError::Format(FormatError::Corrupt(format!("parameter block: {e}")))
    }
}

pub type Result<T> = std::result::Result<T, MembError>;
