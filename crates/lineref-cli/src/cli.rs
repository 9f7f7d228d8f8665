use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lineref_core::{ops, HashAlgorithm, LineRefConfig, Normalization};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "lref")]
#[command(about = "Line-level text deduplication with a persistent hash store", long_about = None)]
pub struct Cli {
    /// Hash store database path [default: dedupe_main.db]
    #[arg(long, env = "LREF_DB")]
    pub db: Option<PathBuf>,

    /// TOML or JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Trim and lower-case lines before hashing and storing
    #[arg(long)]
    pub normalize: bool,

    /// Line hash function
    #[arg(long, value_enum)]
    pub hash: Option<HashArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add the lines of every file matching a glob pattern to the store
    Seed {
        /// Glob pattern, e.g. 'data/**/*.txt'
        pattern: String,
    },
    /// Encode a text file into a binary stream of hash references
    Encode {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Expand a binary hash file back into text
    Decode {
        hash_file: PathBuf,
        /// Write text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashArg {
    Xxh32,
    Sha256,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Xxh32 => HashAlgorithm::Xxh32,
            HashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

impl Cli {
    /// Config file values overridden by command-line flags
    pub fn resolve_config(&self) -> Result<LineRefConfig> {
        let mut config = match &self.config {
            Some(path) => LineRefConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => LineRefConfig::default(),
        };
        if let Some(db) = &self.db {
            config.store_path = db.clone();
        }
        if self.normalize {
            config.normalization = Normalization::CaseFold;
        }
        if let Some(hash) = self.hash {
            config.hash = hash.into();
        }
        Ok(config)
    }

    pub fn run(self) -> Result<()> {
        let config = self.resolve_config()?;
        debug!(
            store = %config.store_path.display(),
            hash = ?config.hash,
            normalization = ?config.normalization,
            "Resolved configuration"
        );
        match self.command {
            Command::Seed { ref pattern } => {
                let stats = ops::seed(pattern, &config)?;
                println!(
                    "Processed {} file(s) and {} total lines.",
                    stats.sources, stats.lines_scanned
                );
                println!("Added {} new unique lines to the store.", stats.new_entries);
                if stats.collisions > 0 {
                    println!("Ignored {} colliding lines.", stats.collisions);
                }
                Ok(())
            }
            Command::Encode {
                ref input,
                ref output,
            } => {
                let stats = ops::encode(input, output, &config)?;
                println!(
                    "Encoded {} lines into {} bytes; {} new unique lines added.",
                    stats.lines, stats.bytes_written, stats.new_entries
                );
                Ok(())
            }
            Command::Decode {
                ref hash_file,
                ref output,
            } => {
                match output {
                    Some(path) => {
                        let file = File::create(path)
                            .with_context(|| format!("Failed to create {}", path.display()))?;
                        ops::decode(hash_file, &config, BufWriter::new(file))?;
                    }
                    None => {
                        ops::decode(hash_file, &config, BufWriter::new(io::stdout().lock()))?;
                    }
                }
                Ok(())
            }
        }
    }
}
