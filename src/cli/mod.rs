//! Command-line interface for readgraph.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **layout**: Lay out the reads of a region of a local SAM/BAM file
//! - **fetch**: Query a running read store and lay out the result
//! - **serve**: Serve a directory of SAM/BAM files over the read-store API
//!
//! ## Usage
//!
//! ```text
//! # Stack the reads of a region into tracks
//! readgraph layout sample.bam chr1:10,000-10,200
//!
//! # Same, as JSON for a renderer
//! readgraph layout sample.bam chr1:10,000-10,200 --format json
//!
//! # Serve a data directory
//! readgraph serve data/ --port 8080
//!
//! # Jump to a SNP through the read store and lay out what is visible
//! readgraph fetch --readset <id> --at rs7412
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::readstore::DEFAULT_PAGE_SIZE;

pub mod fetch;
pub mod layout;

#[derive(Parser)]
#[command(name = "readgraph")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Lay out aligned reads into display tracks")]
#[command(
    long_about = "readgraph expands the CIGAR strings of aligned reads into per-base pieces and stacks overlapping reads into non-overlapping tracks.\n\nReads come from local SAM/BAM files or from a read store speaking the JSON read-store API; `serve` runs such a store over a directory of SAM/BAM files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lay out the reads of a region of a SAM/BAM file
    Layout(layout::LayoutArgs),

    /// Fetch reads from a read store and lay them out
    Fetch(fetch::FetchArgs),

    /// Start the read-store server
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Directory of SAM/BAM files; each subdirectory is served as its own dataset
    #[arg(required = true)]
    pub data_dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    /// Reads returned per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// TSV table of SNPs (name, chr, position, optional link)
    #[arg(long)]
    pub snps: Option<PathBuf>,

    /// Disable per-IP rate limiting
    #[arg(long)]
    pub no_rate_limit: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
