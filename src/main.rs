// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use codescanner::backends::SymbolType;
use codescanner::i18n;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "codescanner")]
#[command(about = "Scan barcodes and QR codes from a camera or images")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Configuration file (default: ~/.config/codescanner/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available capture devices
    List,

    /// Scan codes from a camera, or from images played back as frames
    Scan {
        /// Capture device path (e.g. /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Accepted symbol types, comma separated (e.g. qr,ean13)
        #[arg(short, long, value_delimiter = ',')]
        types: Option<Vec<SymbolType>>,

        /// Stop after the first accepted code
        #[arg(long)]
        one_shot: bool,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,

        /// Image files to use instead of a camera
        #[arg(long, num_args = 1..)]
        images: Vec<PathBuf>,
    },

    /// Decode codes in still images
    Decode {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=codescanner=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    // Get the system's preferred languages.
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();

    // Enable localizations to be applied.
    i18n::init(&requested_languages);

    let cli = Cli::parse();

    match cli.command {
        Commands::List => cli::list_devices(),
        Commands::Scan {
            device,
            types,
            one_shot,
            json,
            images,
        } => cli::scan(cli::ScanOptions {
            config_path: cli.config,
            device,
            types,
            one_shot,
            images,
            json,
        }),
        Commands::Decode { images, json } => cli::decode_images(&images, cli.config, json),
        Commands::InitConfig { force } => cli::init_config(cli.config, force),
    }
}
