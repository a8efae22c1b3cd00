use std::collections::HashMap;
use std::path::Path;

use crate::core::api::SnpResponse;
use crate::readstore::StoreError;

/// Base URL of the page shown for a SNP without an explicit link
pub const SNPEDIA_URL: &str = "http://www.snpedia.com/index.php/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnpEntry {
    pub name: String,
    pub chr: String,
    pub position: u64,
    pub link: String,
}

/// SNP id lookups, case-insensitive on the id
#[derive(Debug, Clone, Default)]
pub struct SnpTable {
    entries: HashMap<String, SnpEntry>,
}

impl SnpTable {
    /// Load a TSV table with columns: name, chr, position, [link]
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read, or
    /// `StoreError::InvalidSnpTable` for malformed lines.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TSV text with columns: name, chr, position, [link]
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSnpTable` if a line has fewer than 3 fields
    /// or an invalid position.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut table = Self::default();
        let mut first_data_line = true;

        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

            if first_data_line {
                first_data_line = false;
                let first = fields.first().map(|s| s.to_lowercase()).unwrap_or_default();
                if first == "name" || first == "snp" || first == "rsid" {
                    continue;
                }
            }

            let line_num = i + 1;
            if fields.len() < 3 {
                return Err(StoreError::InvalidSnpTable {
                    line: line_num,
                    message: "expected at least 3 fields".to_string(),
                });
            }

            let position: u64 = fields[2].parse().map_err(|_| StoreError::InvalidSnpTable {
                line: line_num,
                message: format!("invalid position '{}'", fields[2]),
            })?;
            let name = fields[0].to_string();
            let link = fields
                .get(3)
                .filter(|link| !link.is_empty())
                .map_or_else(|| format!("{SNPEDIA_URL}{name}"), |link| (*link).to_string());

            table.insert(SnpEntry {
                name,
                chr: fields[1].to_string(),
                position,
                link,
            });
        }

        Ok(table)
    }

    pub fn insert(&mut self, entry: SnpEntry) {
        self.entries.insert(entry.name.to_lowercase(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&SnpEntry> {
        self.entries.get(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer a `/api/snps` query; unknown ids report position -1
    pub fn lookup(&self, name: &str) -> SnpResponse {
        match self.get(name) {
            Some(entry) => SnpResponse {
                position: i64::try_from(entry.position).unwrap_or(i64::MAX),
                chr: entry.chr.clone(),
                name: entry.name.clone(),
                link: entry.link.clone(),
            },
            None => SnpResponse::not_found(name),
        }
    }
}
