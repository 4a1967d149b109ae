// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use memb::StorageType;
use memb_cli::commands::convert::SourceFormat;
use memb_cli::commands::{convert, inspect, verify};
use memb_cli::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "memb")]
#[command(about = "Build and inspect compressed word-embedding stores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a fastText or GloVe text file into a memb artifact.
    /// Malformed rows are logged and skipped.
    Convert {
        /// Source text file
        #[arg(long = "from")]
        source: PathBuf,

        /// Destination artifact
        #[arg(long = "to")]
        dest: PathBuf,

        /// Storage type: full, uniform, trained or huffman
        #[arg(long)]
        compression: StorageType,

        /// Bits per weight (clamped to what the storage type supports)
        #[arg(long)]
        bits: Option<u8>,

        /// Layout of the source file
        #[arg(long, value_enum)]
        converter: SourceFormat,
    },
    /// Show header fields and sizes of an artifact
    Inspect {
        path: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the checksum and decode every word of an artifact
    Verify {
        path: PathBuf,

        /// Decode workers; 0 uses every core
        #[arg(long, short, default_value_t = 0)]
        threads: usize,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            source,
            dest,
            compression,
            bits,
            converter,
        } => {
            let stats = convert::run(&source, &dest, compression, bits, converter)?;
            println!("Added {} words, skipped {}", stats.added, stats.skipped);
            Ok(())
        }
        Commands::Inspect { path, json } => inspect::run(&path, json).map(|_| ()),
        Commands::Verify { path, threads } => verify::run(&path, threads).map(|_| ()),
    }
}
