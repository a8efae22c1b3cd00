//! Centralized validation of read-store requests.

/// Maximum number of readsets in one `/api/reads` query (DOS protection)
pub const MAX_READSETS_PER_QUERY: usize = 32;

/// Widest genomic span a reads query may cover
pub const MAX_READ_QUERY_SPAN: u64 = 10_000_000;

/// Most positions a single read may occupy once its CIGAR is expanded
pub const MAX_LAID_OUT_LENGTH: u64 = 1_000_000;

/// Widest genomic span a coverage query may cover
pub const MAX_COVERAGE_SPAN: u64 = 1_000_000;

/// Largest page size the server can be configured with
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Security-related constants for input validation
pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_PAGE_TOKEN_LENGTH: usize = 4096;

/// Stable readset id for a sample within a dataset
#[must_use]
pub fn readset_id(dataset: &str, sample: &str) -> String {
    let digest = md5::compute(format!("{dataset}/{sample}").as_bytes());
    format!("{digest:x}")
}

/// Request validation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No readset ids given")]
    NoReadsets,
    #[error("Too many readsets: {0} exceeds maximum of {MAX_READSETS_PER_QUERY}")]
    TooManyReadsets(usize),
    #[error("Sequence name is empty, too long or contains control characters")]
    InvalidName,
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("Range of {span} bases exceeds the maximum of {max}")]
    SpanTooLarge { span: u64, max: u64 },
    #[error("Page token too long")]
    PageTokenTooLong,
    #[error("Page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    InvalidPageSize(usize),
}

/// Check the readset ids of a query
///
/// # Errors
///
/// Returns `ValidationError::NoReadsets` for an empty list or
/// `ValidationError::TooManyReadsets` above [`MAX_READSETS_PER_QUERY`].
pub fn validate_readset_ids(ids: &[String]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::NoReadsets);
    }
    if ids.len() > MAX_READSETS_PER_QUERY {
        return Err(ValidationError::TooManyReadsets(ids.len()));
    }
    Ok(())
}

/// Check a sequence, readset or SNP name taken from a request
///
/// # Errors
///
/// Returns `ValidationError::InvalidName` if the name is empty, longer than
/// [`MAX_NAME_LENGTH`] or contains control characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || name.len() > MAX_NAME_LENGTH || name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

/// Check a query range against a maximum span
///
/// # Errors
///
/// Returns `ValidationError::InvalidRange` if `start > end`, or
/// `ValidationError::SpanTooLarge` if the range is wider than `max_span`.
pub fn validate_range(start: u64, end: u64, max_span: u64) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::InvalidRange { start, end });
    }
    let span = end - start;
    if span > max_span {
        return Err(ValidationError::SpanTooLarge {
            span,
            max: max_span,
        });
    }
    Ok(())
}

/// Check an incoming page token before decoding it
///
/// # Errors
///
/// Returns `ValidationError::PageTokenTooLong` above [`MAX_PAGE_TOKEN_LENGTH`].
pub fn validate_page_token(token: &str) -> Result<(), ValidationError> {
    if token.len() > MAX_PAGE_TOKEN_LENGTH {
        return Err(ValidationError::PageTokenTooLong);
    }
    Ok(())
}

/// Check a configured page size
///
/// # Errors
///
/// Returns `ValidationError::InvalidPageSize` for 0 or sizes above [`MAX_PAGE_SIZE`].
pub fn validate_page_size(page_size: usize) -> Result<usize, ValidationError> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::InvalidPageSize(page_size));
    }
    Ok(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readset_id_is_stable() {
        let id = readset_id("dataset", "NA12878");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, readset_id("dataset", "NA12878"));
        assert_ne!(id, readset_id("other", "NA12878"));
    }

    #[test]
    fn test_validate_readset_ids() {
        assert_eq!(validate_readset_ids(&[]), Err(ValidationError::NoReadsets));
        assert!(validate_readset_ids(&["a".to_string()]).is_ok());
        let many: Vec<String> = (0..=MAX_READSETS_PER_QUERY).map(|i| i.to_string()).collect();
        assert_eq!(
            validate_readset_ids(&many),
            Err(ValidationError::TooManyReadsets(MAX_READSETS_PER_QUERY + 1))
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("chr1").is_ok());
        assert!(validate_name("HLA-A*01:01:01:01").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("chr1\n").is_err());
        assert!(validate_name(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(0, 0, 10).is_ok());
        assert!(validate_range(5, 15, 10).is_ok());
        assert_eq!(
            validate_range(10, 5, 100),
            Err(ValidationError::InvalidRange { start: 10, end: 5 })
        );
        assert_eq!(
            validate_range(0, 11, 10),
            Err(ValidationError::SpanTooLarge { span: 11, max: 10 })
        );
    }

    #[test]
    fn test_validate_page_size() {
        assert_eq!(validate_page_size(1024), Ok(1024));
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_page_token() {
        assert!(validate_page_token("abcd").is_ok());
        assert_eq!(
            validate_page_token(&"0".repeat(MAX_PAGE_TOKEN_LENGTH + 1)),
            Err(ValidationError::PageTokenTooLong)
        );
    }
}
