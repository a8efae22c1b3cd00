//! Request and response bodies of the read-store REST API.
//!
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::core::read::AlignmentRecord;
use crate::core::types::QueryType;

/// Query parameters of `GET /api/reads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchReadsParams {
    /// Comma-joined readset ids
    pub readset_ids: String,

    /// Sequence (contig) name; `target` is accepted as an alternative spelling
    #[serde(alias = "target")]
    pub sequence_name: String,

    pub sequence_start: u64,

    pub sequence_end: u64,

    #[serde(default, rename = "type")]
    pub query_type: QueryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl SearchReadsParams {
    pub fn new(readset_ids: &[String], sequence_name: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            readset_ids: readset_ids.join(","),
            sequence_name: sequence_name.into(),
            sequence_start: start,
            sequence_end: end,
            ..Self::default()
        }
    }

    /// Split the comma-joined readset ids
    pub fn readset_id_list(&self) -> Vec<String> {
        self.readset_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Body of a `type=reads` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchReadsResponse {
    #[serde(default)]
    pub reads: Vec<AlignmentRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Read depth at one reference position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageBin {
    pub position: u64,
    pub depth: u32,
}

/// Body of a `type=coverage` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResponse {
    pub coverage: Vec<CoverageBin>,

    /// Coverage is never paged; always serialized as `null`
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Query parameters of `GET /api/readsets`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadsetQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadsetSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefSequence {
    pub name: String,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub ref_sequences: Vec<RefSequence>,
}

/// Body of a `GET /api/readsets` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadsetsResponse {
    #[serde(default)]
    pub readsets: Vec<ReadsetSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<Vec<FileData>>,
}

impl ReadsetsResponse {
    /// Reference sequences of the first file, if the response carries any
    pub fn ref_sequences(&self) -> &[RefSequence] {
        self.file_data
            .as_ref()
            .and_then(|files| files.first())
            .map_or(&[], |file| file.ref_sequences.as_slice())
    }
}

/// Position reported for an unknown SNP
pub const SNP_NOT_FOUND: i64 = -1;

/// Body of a `GET /api/snps` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnpResponse {
    /// Position on `chr`, or -1 when unknown
    pub position: i64,
    #[serde(default)]
    pub chr: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: String,
}

impl SnpResponse {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            position: SNP_NOT_FOUND,
            chr: String::new(),
            name: name.into(),
            link: String::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.position >= 0
    }
}

/// Body of a `GET /api/health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub readsets: usize,
}
