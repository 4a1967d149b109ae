// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use memb::{Reader, ReaderConfig, StorageType};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub path: String,
    pub format_version: u32,
    pub storage: StorageType,
    pub bits_per_weight: u8,
    pub dim: usize,
    pub words: usize,
    pub file_bytes: usize,
    pub params_bytes: usize,
    pub table_bytes: usize,
    /// Code table size relative to raw `f32` storage.
    pub compression_ratio: f64,
    pub modified: Option<String>,
}

impl Summary {
    pub fn collect(path: &Path) -> anyhow::Result<Self> {
        let reader = Reader::open_with(path, ReaderConfig { num_threads: 1 })
            .with_context(|| format!("cannot open {}", path.display()))?;

        let raw_bytes = (reader.len() * reader.dim() * 4) as f64;
        let compression_ratio = if reader.table_len() > 0 {
            raw_bytes / reader.table_len() as f64
        } else {
            0.0
        };
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());

        Ok(Self {
            path: path.display().to_string(),
            format_version: reader.header().version,
            storage: reader.storage_type(),
            bits_per_weight: reader.bits_per_weight(),
            dim: reader.dim(),
            words: reader.len(),
            file_bytes: reader.file_len(),
            params_bytes: reader.params_len(),
            table_bytes: reader.table_len(),
            compression_ratio,
            modified,
        })
    }
}

pub fn run(path: &Path, json: bool) -> anyhow::Result<Summary> {
    let summary = Summary::collect(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Artifact".to_string(), summary.path.clone()]);
    table.add_row(vec!["Format".to_string(), format!("MEMB v{}", summary.format_version)]);
    table.add_row(vec!["Storage".to_string(), summary.storage.to_string()]);
    table.add_row(vec!["Bits/weight".to_string(), summary.bits_per_weight.to_string()]);
    table.add_row(vec!["Dimension".to_string(), summary.dim.to_string()]);
    table.add_row(vec!["Words".to_string(), summary.words.to_string()]);
    table.add_row(vec!["File size".to_string(), format!("{} bytes", summary.file_bytes)]);
    table.add_row(vec!["Parameters".to_string(), format!("{} bytes", summary.params_bytes)]);
    table.add_row(vec!["Code table".to_string(), format!("{} bytes", summary.table_bytes)]);
    table.add_row(vec!["Compression".to_string(), format!("{:.2}x", summary.compression_ratio)]);
    if let Some(modified) = &summary.modified {
        table.add_row(vec!["Modified".to_string(), modified.clone()]);
    }

    println!("{table}");
    Ok(summary)
}
