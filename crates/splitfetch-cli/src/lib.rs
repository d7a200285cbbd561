//! splitfetch - split package downloader
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Downloads an application's base package and its split packages from the
//! mirrors a store client returned, then assembles them into one artifact.
//!
//! # Merge methods
//!
//! | Id | Method | Output |
//! |----|--------|--------|
//! | 1 | XAPK bundle | `{pkg}.xapk` |
//! | 2 | APKS bundle | `{pkg}.apks` |
//! | 3 | APKEditor merge | `{pkg}_merged.apk` |
//! | 4 | Install via ADB | nothing, installed on the device |
//! | 5 | Full merge + resign | `{pkg}_signed.apk` |

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use splitfetch_core::MergeStrategy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "splitfetch")]
#[command(author, version, about = "splitfetch - download and assemble split Android packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download a package and assemble its splits
    Fetch {
        /// Package identifier, e.g. com.example.app
        package: String,
        /// Store reply (JSON) with the download links; `-` reads stdin
        #[arg(long, short = 'r')]
        reply: PathBuf,
        /// Merge method, by id (1-5) or name (e.g. xapk-bundle)
        #[arg(long, short = 'm', env = "SPLITFETCH_METHOD")]
        method: Option<MergeStrategy>,
        /// Display name written into bundle metadata
        #[arg(long)]
        name: Option<String>,
        /// Directory for downloads and the final artifact
        #[arg(long, short = 'o', default_value = ".")]
        output_dir: PathBuf,
        /// Never prompt; without --method the run is declined
        #[arg(long)]
        no_interactive: bool,
    },
    /// Show which merge methods and tools are available
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the configuration directory
    ConfigDir {
        /// Print the tools directory instead
        #[arg(long)]
        tools: bool,
    },
}
