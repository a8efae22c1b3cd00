//! Local read store backed by SAM/BAM files.
//!
//! The store answers the same JSON API the viewer talks to, from files in a
//! data directory:
//!
//! - [`files`]: loading SAM/BAM files into readsets (one per sample and dataset)
//! - [`query`]: overlapping-range queries with opaque page tokens, and coverage
//! - [`snps`]: SNP id lookups from a TSV table
//!
//! Everything is loaded once at startup; the store is immutable afterwards and
//! shared between request handlers through an `Arc`.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::api::{ReadsetQuery, ReadsetsResponse, SnpResponse};
use crate::utils::validation::{validate_page_size, ValidationError};

pub mod files;
pub mod query;
pub mod snps;

use files::Readset;
use snps::SnpTable;

/// Reads returned per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unknown readset: {0}")]
    UnknownReadset(String),

    #[error("Invalid page token")]
    InvalidPageToken,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid SNP table on line {line}: {message}")]
    InvalidSnpTable { line: usize, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Where the store loads its data from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub snp_table: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            page_size: DEFAULT_PAGE_SIZE,
            snp_table: None,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_snp_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.snp_table = Some(path.into());
        self
    }
}

/// In-memory readsets and SNPs
#[derive(Debug, Clone)]
pub struct ReadStore {
    readsets: Vec<Readset>,
    snps: SnpTable,
    page_size: usize,
}

impl ReadStore {
    pub fn new(readsets: Vec<Readset>, snps: SnpTable, page_size: usize) -> Self {
        Self {
            readsets,
            snps,
            page_size: page_size.max(1),
        }
    }

    /// Load the data directory and SNP table named by `config`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an invalid page size, or any error
    /// raised while reading alignment files or the SNP table.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let page_size = validate_page_size(config.page_size)?;
        let readsets = files::load_data_dir(&config.data_dir)?;
        let snps = match &config.snp_table {
            Some(path) => SnpTable::load(path)?,
            None => SnpTable::default(),
        };
        Ok(Self::new(readsets, snps, page_size))
    }

    pub fn readsets(&self) -> &[Readset] {
        &self.readsets
    }

    pub fn readset(&self, id: &str) -> Option<&Readset> {
        self.readsets.iter().find(|r| r.id == id)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn snps(&self) -> &SnpTable {
        &self.snps
    }

    /// Answer a `/api/readsets` query.
    ///
    /// With `readset_id` the single readset is returned together with its
    /// reference sequences. Otherwise readsets are filtered by dataset name
    /// and by a case-insensitive substring of their name. The backend
    /// parameter is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownReadset` when `readset_id` matches nothing.
    pub fn search_readsets(&self, query: &ReadsetQuery) -> Result<ReadsetsResponse, StoreError> {
        if let Some(id) = query.readset_id.as_deref().filter(|id| !id.is_empty()) {
            let readset = self
                .readset(id)
                .ok_or_else(|| StoreError::UnknownReadset(id.to_string()))?;
            return Ok(ReadsetsResponse {
                readsets: vec![readset.summary()],
                file_data: Some(vec![readset.file_data()]),
            });
        }

        let name = query.name.as_deref().map(str::to_lowercase);
        let readsets = self
            .readsets
            .iter()
            .filter(|r| query.dataset_id.as_deref().map_or(true, |d| r.dataset == d))
            .filter(|r| {
                name.as_deref()
                    .map_or(true, |n| r.name.to_lowercase().contains(n))
            })
            .map(Readset::summary)
            .collect();

        Ok(ReadsetsResponse {
            readsets,
            file_data: None,
        })
    }

    pub fn lookup_snp(&self, name: &str) -> SnpResponse {
        self.snps.lookup(name)
    }
}
