// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::HashMap;
use std::sync::Arc;

use tempfile::tempdir;

use crate::error::MembError;
use crate::reader::Reader;
use crate::source::Embeddings;
use crate::tests::fixtures::build_named_store;
use crate::union::{MergeMode, ReadersUnion, SharedEmbeddings};

fn word_index(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
    pairs.iter().map(|(w, i)| (w.to_string(), *i)).collect()
}

fn abc_reader(dir: &std::path::Path) -> Reader {
    let path = build_named_store(
        dir,
        "abc.memb",
        &[("a", vec![1.0, 1.0]), ("b", vec![2.0, 2.0]), ("c", vec![3.0, 3.0])],
    );
    Reader::open(path).unwrap()
}

#[test]
fn test_capped_tokenizer_matrix() {
    let dir = tempdir().unwrap();
    let reader = abc_reader(dir.path());
    let index = word_index(&[("a", 0), ("b", 1), ("c", 5)]);

    let matrix = reader.tokenizer_embedding(&index, Some(3)).unwrap();
    assert_eq!(matrix.rows(), 3);
    assert_eq!(matrix.row(0), &[1.0, 1.0]);
    assert_eq!(matrix.row(1), &[2.0, 2.0]);
    assert_eq!(matrix.row(2), &[0.0, 0.0]);
}

#[test]
fn test_uncapped_tokenizer_matrix() {
    let dir = tempdir().unwrap();
    let reader = abc_reader(dir.path());
    let index = word_index(&[("a", 0), ("zzz", 2), ("c", 5)]);

    let matrix = reader.tokenizer_embedding(&index, None).unwrap();
    assert_eq!(matrix.rows(), 6);
    assert_eq!(matrix.row(0), &[1.0, 1.0]);
    for row in 1..5 {
        assert_eq!(matrix.row(row), &[0.0, 0.0], "row {row}");
    }
    assert_eq!(matrix.row(5), &[3.0, 3.0]);

    assert_eq!(reader.tokenizer_embedding(&HashMap::new(), None).unwrap().rows(), 0);
}

#[test]
fn test_unaddressable_row_is_an_error() {
    let dir = tempdir().unwrap();
    let reader = abc_reader(dir.path());
    let index = word_index(&[("a", 0), ("b", usize::MAX)]);

    let result = reader.tokenizer_embedding(&index, None);
    assert!(matches!(result, Err(MembError::RowOutOfRange(usize::MAX))));
    // Capping the rows drops the out-of-range entry.
    assert_eq!(reader.tokenizer_embedding(&index, Some(1)).unwrap().row(0), &[1.0, 1.0]);
}

#[test]
fn test_tokenizer_through_union() {
    let dir = tempdir().unwrap();
    let a: SharedEmbeddings = Arc::new(abc_reader(dir.path()));
    let other = build_named_store(dir.path(), "other.memb", &[("b", vec![4.0, 0.0])]);
    let b: SharedEmbeddings = Arc::new(Reader::open(other).unwrap());
    let union = ReadersUnion::new(vec![a, b], MergeMode::Average).unwrap();

    let matrix = union.tokenizer_embedding(&word_index(&[("a", 0), ("b", 1)]), Some(2)).unwrap();
    assert_eq!(matrix.row(0), &[0.5, 0.5]);
    assert_eq!(matrix.row(1), &[3.0, 1.0]);
}
