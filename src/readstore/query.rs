use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::api::{CoverageBin, CoverageResponse, SearchReadsParams, SearchReadsResponse};
use crate::core::types::CigarOpKind;
use crate::layout::cigar::Cigar;
use crate::readstore::files::{Readset, StoredRead};
use crate::readstore::{ReadStore, StoreError};
use crate::utils::validation::{
    validate_name, validate_page_token, validate_range, validate_readset_ids, MAX_COVERAGE_SPAN,
    MAX_READ_QUERY_SPAN,
};

/// Position of a paged query, handed to clients as an opaque string.
///
/// The token repeats the query it belongs to; a token presented with a
/// different query is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken {
    pub readset_ids: Vec<String>,
    pub sequence: String,
    pub start: u64,
    pub end: u64,
    /// Number of reads already returned
    pub offset: usize,
}

impl PageToken {
    /// Hex-encoded bincode form of the token
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPageToken` if serialization fails.
    pub fn encode(&self) -> Result<String, StoreError> {
        let bytes = bincode::serialize(self).map_err(|_| StoreError::InvalidPageToken)?;
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Decode a token produced by [`PageToken::encode`]
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPageToken` for anything that is not a valid token.
    pub fn decode(token: &str) -> Result<Self, StoreError> {
        if token.len() % 2 != 0 || !token.is_ascii() {
            return Err(StoreError::InvalidPageToken);
        }
        let bytes = (0..token.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&token[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| StoreError::InvalidPageToken)?;
        bincode::deserialize(&bytes).map_err(|_| StoreError::InvalidPageToken)
    }

    fn matches(&self, readset_ids: &[String], params: &SearchReadsParams) -> bool {
        self.readset_ids == readset_ids
            && self.sequence == params.sequence_name
            && self.start == params.sequence_start
            && self.end == params.sequence_end
    }
}

/// A validated query against known readsets
struct Scope<'a> {
    readset_ids: Vec<String>,
    readsets: Vec<&'a Readset>,
}

impl ReadStore {
    fn scope(&self, params: &SearchReadsParams, max_span: u64) -> Result<Scope<'_>, StoreError> {
        let readset_ids = params.readset_id_list();
        validate_readset_ids(&readset_ids)?;
        validate_name(&params.sequence_name)?;
        validate_range(params.sequence_start, params.sequence_end, max_span)?;

        let readsets = readset_ids
            .iter()
            .map(|id| {
                self.readset(id)
                    .ok_or_else(|| StoreError::UnknownReadset(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Scope {
            readset_ids,
            readsets,
        })
    }

    fn overlapping<'a>(scope: &Scope<'a>, params: &SearchReadsParams) -> Vec<&'a StoredRead> {
        let mut hits: Vec<&StoredRead> = scope
            .readsets
            .iter()
            .copied()
            .flat_map(|readset| {
                readset.overlapping(
                    &params.sequence_name,
                    params.sequence_start,
                    params.sequence_end,
                )
            })
            .collect();
        // Stable: ties keep readset order, then file order
        hits.sort_by_key(|read| read.record.position);
        hits
    }

    /// Answer a `type=reads` query, one page at a time
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for malformed queries,
    /// `StoreError::UnknownReadset` for unknown ids, or
    /// `StoreError::InvalidPageToken` for tokens that do not belong to the query.
    pub fn search_reads(
        &self,
        params: &SearchReadsParams,
    ) -> Result<SearchReadsResponse, StoreError> {
        let scope = self.scope(params, MAX_READ_QUERY_SPAN)?;

        let offset = match params.page_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => {
                validate_page_token(token)?;
                let token = PageToken::decode(token)?;
                if !token.matches(&scope.readset_ids, params) {
                    return Err(StoreError::InvalidPageToken);
                }
                token.offset
            }
            None => 0,
        };

        let hits = Self::overlapping(&scope, params);
        let total = hits.len();
        let reads: Vec<_> = hits
            .into_iter()
            .skip(offset)
            .take(self.page_size())
            .map(|read| read.record.clone())
            .collect();

        let next_offset = offset + reads.len();
        let next_page_token = if next_offset < total {
            Some(
                PageToken {
                    readset_ids: scope.readset_ids,
                    sequence: params.sequence_name.clone(),
                    start: params.sequence_start,
                    end: params.sequence_end,
                    offset: next_offset,
                }
                .encode()?,
            )
        } else {
            None
        };

        debug!(
            sequence = %params.sequence_name,
            start = params.sequence_start,
            end = params.sequence_end,
            offset,
            returned = reads.len(),
            total,
            "Answered reads query"
        );
        Ok(SearchReadsResponse {
            reads,
            next_page_token,
        })
    }

    /// Answer a `type=coverage` query: depth of aligned bases (M, = and X)
    /// at each covered position of the range. Positions without coverage are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for malformed or too wide queries, or
    /// `StoreError::UnknownReadset` for unknown ids.
    pub fn coverage(&self, params: &SearchReadsParams) -> Result<CoverageResponse, StoreError> {
        let scope = self.scope(params, MAX_COVERAGE_SPAN)?;
        let (start, end) = (params.sequence_start, params.sequence_end);
        #[allow(clippy::cast_possible_truncation)] // Span is validated above
        let mut depth = vec![0u32; (end - start) as usize];

        for read in Self::overlapping(&scope, params) {
            let Some(cigar) = read
                .record
                .cigar
                .as_deref()
                .and_then(|c| c.parse::<Cigar>().ok())
            else {
                continue;
            };

            let mut cursor = read.record.position;
            for op in cigar.ops() {
                let len = u64::from(op.len);
                if matches!(
                    op.kind,
                    CigarOpKind::Match | CigarOpKind::SequenceMatch | CigarOpKind::SequenceMismatch
                ) {
                    for position in cursor.max(start)..(cursor + len).min(end) {
                        #[allow(clippy::cast_possible_truncation)] // Bounded by span
                        let index = (position - start) as usize;
                        depth[index] += 1;
                    }
                }
                if op.kind.consumes_reference() {
                    cursor += len;
                }
            }
        }

        let coverage = depth
            .into_iter()
            .zip(start..)
            .filter(|(d, _)| *d > 0)
            .map(|(depth, position)| CoverageBin { position, depth })
            .collect();
        Ok(CoverageResponse {
            coverage,
            next_page_token: None,
        })
    }
}
