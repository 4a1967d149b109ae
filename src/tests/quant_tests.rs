// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::MembError;
use crate::quant::{available_storage_types, Codec, Quantizer, StorageType, UniformQuantizer};
use crate::tests::fixtures::{clustered_vectors, max_abs_diff, random_vectors};

fn fitted(storage: StorageType, bits: Option<u8>, vectors: &[Vec<f32>]) -> Codec {
    let mut codec = Codec::new(storage, vectors[0].len(), bits);
    let rows: Vec<&[f32]> = vectors.iter().map(Vec::as_slice).collect();
    codec.fit(&rows).unwrap();
    codec
}

#[test]
fn test_full_is_lossless() {
    let vectors = random_vectors(1, 20, 12);
    let codec = fitted(StorageType::Full, None, &vectors);
    for v in &vectors {
        let code = codec.quantize(v).unwrap();
        assert_eq!(code.len(), 48);
        assert_eq!(&codec.reconstruct(&code).unwrap(), v);
    }
}

#[test]
fn test_uniform_error_within_half_step() {
    let vectors = random_vectors(2, 200, 16);
    for bits in [2u8, 4, 8, 12] {
        let mut q = UniformQuantizer::new(16, bits);
        let rows: Vec<&[f32]> = vectors.iter().map(Vec::as_slice).collect();
        q.fit(&rows).unwrap();
        let scale = q.params().unwrap().scale.clone();
        for v in &vectors {
            let decoded = q.reconstruct(&q.quantize(v).unwrap()).unwrap();
            for d in 0..16 {
                let err = (decoded[d] - v[d]).abs();
                assert!(err as f64 <= scale[d] / 2.0 + 1e-5, "bits {bits} dim {d}: error {err}");
            }
        }
    }
}

#[test]
fn test_uniform_constant_dimension_is_exact() {
    let vectors = vec![vec![0.5, -1.0], vec![0.5, 3.0], vec![0.5, 1.0]];
    let codec = fitted(StorageType::Uniform, Some(4), &vectors);
    for v in &vectors {
        let decoded = codec.reconstruct(&codec.quantize(v).unwrap()).unwrap();
        assert_eq!(decoded[0], 0.5);
    }
}

#[test]
fn test_uniform_clamps_out_of_range() {
    let vectors = vec![vec![0.0], vec![1.0]];
    let codec = fitted(StorageType::Uniform, Some(8), &vectors);
    let decoded = codec.reconstruct(&codec.quantize(&[7.5]).unwrap()).unwrap();
    assert!((decoded[0] - 1.0).abs() < 1e-6);
}

/// Dimension 0 spans about twice `f32::MAX`.
pub(crate) fn extreme_range_vectors() -> Vec<Vec<f32>> {
    vec![vec![-3e38, 1.0], vec![3e38, 2.0], vec![0.0, 1.5]]
}

/// Decoded rows stay finite and keep both the extremes and the small dimension.
#[allow(overflowing_literals)]
pub(crate) fn assert_extreme_range_decoded(storage: StorageType, original: &[f32], decoded: &[f32]) {
    assert!(decoded.iter().all(|v| v.is_finite()), "{storage}: {decoded:?}");
    if original[0] == 0.0 {
        assert!(decoded[0].abs() <= 6e38 / 255.0, "{storage}: 0 decoded as {}", decoded[0]);
    } else {
        let rel = ((decoded[0] - original[0]) / original[0]).abs();
        assert!(rel < 1e-3, "{storage}: {} decoded as {}", original[0], decoded[0]);
    }
    assert!((decoded[1] - original[1]).abs() < 1.0, "{storage}: {} decoded as {}", original[1], decoded[1]);
}

#[test]
fn test_extreme_range_decodes_finite() {
    let vectors = extreme_range_vectors();
    for storage in StorageType::ALL {
        let codec = fitted(storage, None, &vectors);
        for v in &vectors {
            let decoded = codec.reconstruct(&codec.quantize(v).unwrap()).unwrap();
            assert_extreme_range_decoded(storage, v, &decoded);
        }
    }
}

#[test]
fn test_trained_recovers_clusters() {
    let vectors = clustered_vectors(3, 300, 10);
    let codec = fitted(StorageType::Trained, Some(4), &vectors);
    let Codec::Trained(q) = &codec else { panic!("expected trained codec") };
    assert_eq!(q.centroids().unwrap().len(), 3);
    for v in &vectors {
        let code = codec.quantize(v).unwrap();
        assert_eq!(code.len(), 5);
        let decoded = codec.reconstruct(&code).unwrap();
        assert!(max_abs_diff(&decoded, v) < 0.03);
    }
}

#[test]
fn test_huffman_matches_trained_reconstruction() {
    let vectors = clustered_vectors(4, 300, 10);
    let trained = fitted(StorageType::Trained, Some(4), &vectors);
    let huffman = fitted(StorageType::Huffman, Some(4), &vectors);
    assert_eq!(huffman.code_len(), None);

    let mut total = 0;
    for v in &vectors {
        let code = huffman.quantize(v).unwrap();
        total += code.len();
        assert_eq!(
            huffman.reconstruct(&code).unwrap(),
            trained.reconstruct(&trained.quantize(v).unwrap()).unwrap()
        );
    }
    // Three live symbols need at most 2 bits each instead of 4.
    assert!(total <= vectors.len() * 3);
}

#[test]
fn test_codec_restored_from_params_decodes_identically() {
    let vectors = clustered_vectors(5, 100, 6);
    for storage in StorageType::ALL {
        let codec = fitted(storage, None, &vectors);
        let blob = codec.param_blob().unwrap();
        let restored = Codec::from_params(storage, 6, codec.bits_per_weight(), &blob).unwrap();
        for v in vectors.iter().take(10) {
            let code = codec.quantize(v).unwrap();
            assert_eq!(codec.reconstruct(&code).unwrap(), restored.reconstruct(&code).unwrap());
        }
    }
}

#[test]
fn test_params_with_trailing_bytes_rejected() {
    let vectors = clustered_vectors(6, 50, 4);
    let codec = fitted(StorageType::Trained, None, &vectors);
    let mut blob = codec.param_blob().unwrap();
    blob.push(0);
    assert!(matches!(
        Codec::from_params(StorageType::Trained, 4, 4, &blob),
        Err(MembError::Format(_))
    ));
}

#[test]
fn test_quantize_requires_fit() {
    for storage in [StorageType::Uniform, StorageType::Trained, StorageType::Huffman] {
        let codec = Codec::new(storage, 3, None);
        assert!(matches!(codec.quantize(&[0.0, 1.0, 2.0]), Err(MembError::NotFitted)));
    }
}

#[test]
fn test_dimension_checked_on_quantize() {
    let codec = fitted(StorageType::Full, None, &[vec![1.0, 2.0]]);
    assert!(matches!(
        codec.quantize(&[1.0]),
        Err(MembError::DimensionMismatch { expected: 2, found: 1 })
    ));
}

#[test]
fn test_bits_are_clamped() {
    assert_eq!(Codec::new(StorageType::Uniform, 4, Some(40)).bits_per_weight(), 16);
    assert_eq!(Codec::new(StorageType::Trained, 4, Some(0)).bits_per_weight(), 1);
    assert_eq!(Codec::new(StorageType::Huffman, 4, Some(9)).bits_per_weight(), 8);
    assert_eq!(Codec::new(StorageType::Full, 4, Some(8)).bits_per_weight(), 32);
    assert_eq!(Codec::new(StorageType::Uniform, 4, None).bits_per_weight(), 8);
    assert_eq!(Codec::new(StorageType::Trained, 4, None).bits_per_weight(), 4);
}

#[test]
fn test_storage_type_names() {
    assert_eq!(available_storage_types(), vec!["full", "uniform", "trained", "huffman"]);
    assert_eq!("trained".parse::<StorageType>().unwrap(), StorageType::Trained);
    assert!(matches!(
        "pq".parse::<StorageType>(),
        Err(MembError::UnknownStorageType(name)) if name == "pq"
    ));
    for storage in StorageType::ALL {
        assert_eq!(StorageType::from_tag(storage.tag()), Some(storage));
    }
}
