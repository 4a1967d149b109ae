// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Text embedding files (fastText `.vec`, GloVe `.txt`) to a memb artifact.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use clap::ValueEnum;
use memb::{Builder, BuilderConfig, StorageType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceFormat {
    /// First line is `rows dim`.
    Fasttext,
    /// No header; `dim` is taken from the first row.
    Glove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertStats {
    pub added: usize,
    pub skipped: usize,
}

pub fn run(
    source: &Path,
    dest: &Path,
    storage: StorageType,
    bits: Option<u8>,
    format: SourceFormat,
) -> anyhow::Result<ConvertStats> {
    let file = File::open(source).with_context(|| format!("cannot open {}", source.display()))?;
    let mut lines = BufReader::new(file).lines().enumerate().peekable();

    let dim = match format {
        SourceFormat::Fasttext => {
            let (_, header) = lines.next().ok_or_else(|| anyhow!("{} is empty", source.display()))?;
            parse_fasttext_header(&header?)?
        }
        SourceFormat::Glove => match lines.peek() {
            Some((_, Ok(first))) => first.trim_end().split(' ').count().saturating_sub(1),
            Some((_, Err(_))) | None => 0,
        },
    };
    if dim == 0 {
        bail!("cannot determine vector dimension of {}", source.display());
    }

    let mut config = BuilderConfig::new(dim, storage);
    if let Some(bits) = bits {
        config = config.with_bits_per_weight(bits);
    }
    let mut builder = Builder::new(config)?;
    let mut stats = ConvertStats::default();

    for (line_no, line) in lines {
        let line = line.with_context(|| format!("cannot read {}", source.display()))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        match parse_row(line, dim) {
            Ok((word, values)) => match builder.add_word(word, &values) {
                Ok(()) => stats.added += 1,
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping word");
                    stats.skipped += 1;
                }
            },
            Err(reason) => {
                tracing::warn!(line = line_no + 1, %reason, "skipping malformed row");
                stats.skipped += 1;
            }
        }
    }

    builder
        .save(dest)
        .with_context(|| format!("cannot write {}", dest.display()))?;

    tracing::info!(
        added = stats.added,
        skipped = stats.skipped,
        dim,
        storage = %storage,
        bits = builder.bits_per_weight(),
        "converted {}",
        source.display()
    );
    Ok(stats)
}

fn parse_fasttext_header(line: &str) -> anyhow::Result<usize> {
    let mut parts = line.split_whitespace();
    let (Some(rows), Some(dim), None) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected `rows dim` header, found {line:?}");
    };
    rows.parse::<usize>().with_context(|| format!("bad row count {rows:?}"))?;
    dim.parse::<usize>().with_context(|| format!("bad dimension {dim:?}"))
}

/// Splits `word v1 .. vdim`.
fn parse_row(line: &str, dim: usize) -> Result<(&str, Vec<f32>), String> {
    let mut parts = line.split(' ');
    let word = parts.next().unwrap_or_default();
    let values = parts
        .map(|p| p.parse::<f32>().map_err(|_| format!("value {p:?} is not a number")))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != dim {
        return Err(format!("expected {dim} values, found {}", values.len()));
    }
    Ok((word, values))
}
