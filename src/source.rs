// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Read contract shared by single stores and unions.

use std::collections::HashMap;

use crate::error::{MembError, Result};
use crate::matrix::Matrix;

/// A read-only word-to-vector source.
///
/// Absent words are never an error: they decode to a zero vector.
pub trait Embeddings {
    fn dim(&self) -> usize;

    /// Vocabulary of the source.
    fn keys(&self) -> Vec<String>;

    fn word_embedding(&self, word: &str) -> Result<Vec<f32>>;

    /// `(words.len(), dim)` matrix whose row `i` is `word_embedding(words[i])`.
    fn batch_embedding(&self, words: &[&str]) -> Result<Matrix>;

    /// Embedding matrix for a tokenizer's `word -> row` mapping.
    ///
    /// With `num_words`, entries whose row is `>= num_words` are dropped and the
    /// matrix has exactly `num_words` rows; otherwise it has `max row + 1` rows.
    /// Rows no word maps to are zero-filled. A row count whose matrix cannot
    /// be allocated yields `RowOutOfRange`.
    fn tokenizer_embedding(&self, word_index: &HashMap<String, usize>, num_words: Option<usize>) -> Result<Matrix> {
        let rows = tokenizer_rows(word_index, num_words, self.dim())?;
        self.batch_embedding(&rows)
    }
}

/// Row-ordered word list for `tokenizer_embedding`. Unmapped rows hold the
/// empty string, which never exists in a store.
pub(crate) fn tokenizer_rows(
    word_index: &HashMap<String, usize>,
    num_words: Option<usize>,
    dim: usize,
) -> Result<Vec<&str>> {
    let rows = match num_words {
        Some(cap) => cap,
        None => match word_index.values().max() {
            Some(&max) => max.checked_add(1).ok_or(MembError::RowOutOfRange(max))?,
            None => 0,
        },
    };
    // The output matrix holds `rows * dim` f32 values.
    let fits = rows
        .checked_mul(dim.max(1))
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()))
        .is_some_and(|bytes| bytes <= isize::MAX as usize);
    if !fits {
        return Err(MembError::RowOutOfRange(rows - 1));
    }

    let mut words = vec![""; rows];
    for (word, &row) in word_index {
        if row < rows {
            words[row] = word.as_str();
        }
    }
    Ok(words)
}
