// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use byteorder::{ByteOrder, LittleEndian};

use crate::config::{FORMAT_VERSION, MAGIC};
use crate::error::{FormatError, Result};
use crate::quant::StorageType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub dim: u32,
    pub storage: StorageType,
    pub bits_per_weight: u8,
    pub reserved: [u8; 2],
    pub vocab_size: u64,
    pub params_len: u64,
}

impl ArtifactHeader {
    pub const SIZE: usize = 4 + 4 + 4 + 1 + 1 + 2 + 8 + 8; // 32 bytes

    pub fn new(dim: u32, storage: StorageType, bits_per_weight: u8, vocab_size: u64, params_len: u64) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            dim,
            storage,
            bits_per_weight,
            reserved: [0; 2],
            vocab_size,
            params_len,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        LittleEndian::write_u32(&mut buf[4..8], self.version);
        LittleEndian::write_u32(&mut buf[8..12], self.dim);
        buf[12] = self.storage.tag();
        buf[13] = self.bits_per_weight;
        buf[14..16].copy_from_slice(&self.reserved);
        LittleEndian::write_u64(&mut buf[16..24], self.vocab_size);
        LittleEndian::write_u64(&mut buf[24..32], self.params_len);
        buf
    }

    /// Parses and validates the fixed header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::Truncated("header").into());
        }
        let buf = &bytes[..Self::SIZE];

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if magic != MAGIC {
            return Err(FormatError::BadMagic.into());
        }

        let version = LittleEndian::read_u32(&buf[4..8]);
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion { expected: FORMAT_VERSION, found: version }.into());
        }

        let dim = LittleEndian::read_u32(&buf[8..12]);
        if dim == 0 {
            return Err(FormatError::Corrupt("zero dimension".into()).into());
        }

        let storage = StorageType::from_tag(buf[12]).ok_or(FormatError::UnknownStorageTag(buf[12]))?;
        let bits_per_weight = buf[13];
        if !storage.supported_bits().contains(&bits_per_weight) {
            return Err(FormatError::Corrupt(format!(
                "{storage} storage does not support {bits_per_weight} bits per weight"
            ))
            .into());
        }

        Ok(Self {
            magic,
            version,
            dim,
            storage,
            bits_per_weight,
            reserved: [buf[14], buf[15]],
            vocab_size: LittleEndian::read_u64(&buf[16..24]),
            params_len: LittleEndian::read_u64(&buf[24..32]),
        })
    }
}
