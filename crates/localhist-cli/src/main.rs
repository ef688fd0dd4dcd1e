//! Localhist CLI - inspect and maintain local history storage.

use clap::{Parser, Subcommand};
use localhist_storage::{CompressionLevel, StorageConfig, DEFAULT_CACHE_CAPACITY};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Localhist - local file history content storage
#[derive(Parser, Debug)]
#[command(name = "localhist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Content storage directory
    #[arg(short, long, default_value = ".localhist")]
    dir: PathBuf,

    /// Maximum number of blobs kept in the read cache
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,

    /// Compression level for stored blobs (none, fast, default, best)
    #[arg(long, default_value = "fast", value_parser = parse_compression)]
    compression: CompressionLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file's bytes and print the new id
    Put {
        /// File to store
        file: PathBuf,
    },

    /// Write the bytes stored under an id to stdout
    Cat {
        /// Record id
        id: i32,
    },

    /// Remove the bytes stored under an id
    Rm {
        /// Record id
        id: i32,
    },

    /// Show or set the storage version stamp
    Version {
        /// New version stamp
        #[arg(long)]
        set: Option<i32>,
    },

    /// Print the changes recorded in a change log
    Log {
        /// Change log file
        path: PathBuf,
        /// Print newest changes first
        #[arg(short, long)]
        reverse: bool,
    },
}

fn parse_compression(s: &str) -> Result<CompressionLevel, String> {
    CompressionLevel::parse(s)
        .ok_or_else(|| format!("unknown compression level '{s}' (none, fast, default, best)"))
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("localhist={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StorageConfig {
        cache_capacity: cli.cache_capacity,
        compression: cli.compression,
        ..StorageConfig::default()
    };

    let result = commands::open(&cli.dir, &config).and_then(|storage| {
        let mut out = std::io::stdout().lock();
        let result = match cli.command {
            Commands::Put { file } => commands::put(&storage, &file, &mut out).map(|_| ()),
            Commands::Cat { id } => commands::cat(&storage, id, &mut out),
            Commands::Rm { id } => commands::rm(&storage, id),
            Commands::Version { set } => commands::version(&storage, set, &mut out),
            Commands::Log { path, reverse } => commands::log(&storage, &path, reverse, &mut out),
        };
        let closed = commands::close(&storage);
        result.and(closed)
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
