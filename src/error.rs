//! Error types for the caseload normalization pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SourceError`] - the raw input cannot be read as tabular data (fatal)
//! - [`CacheError`] - the derived-file cache cannot be written or read back
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Only unreadable-source and cache I/O problems surface as errors. Per-field
//! problems (unresolved column, unparseable date or amount) are absorbed into
//! the [`Manifest`](crate::models::Manifest) and never abort a run.
//!
//! Error conversion is automatic via `From` implementations, allowing `?` to
//! work across error boundaries.

use thiserror::Error;

// =============================================================================
// Source Errors (fatal)
// =============================================================================

/// The raw input cannot be opened or parsed as tabular data at all.
///
/// No partial result is produced when one of these is returned.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read the input file.
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded with any supported encoding.
    #[error("Failed to decode source: {0}")]
    Encoding(String),

    /// The input contains no data at all.
    #[error("Source is empty")]
    EmptyInput,

    /// The input has no header row.
    #[error("No headers found in source")]
    NoHeaders,

    /// The delimited structure is broken beyond recovery.
    #[error("Malformed tabular data: {0}")]
    Malformed(#[from] csv::Error),
}

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from the derived-file cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error while reading or staging the cache file.
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The atomic replace of the cache file failed.
    #[error("Failed to persist cache file: {0}")]
    Persist(String),

    /// CSV serialization failed while rendering the cache table.
    #[error("Cache serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// The cache file exists but is not a canonical table.
    #[error("Malformed cache file: {0}")]
    Malformed(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the error type returned by [`crate::normalize_file`],
/// [`crate::normalize_bytes`] and [`crate::cache::refresh`]. Normalization
/// itself is infallible once a [`RawTable`](crate::parser::RawTable) exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw source could not be read.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The derived cache could not be written or read.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source-reading operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SourceError -> PipelineError
        let source_err = SourceError::EmptyInput;
        let pipeline_err: PipelineError = source_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // CacheError -> PipelineError
        let cache_err = CacheError::Persist("rename failed".into());
        let pipeline_err: PipelineError = cache_err.into();
        assert!(pipeline_err.to_string().contains("rename failed"));
    }

    #[test]
    fn test_io_error_wrapping() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = SourceError::from(io);
        assert!(err.to_string().contains("no such file"));
    }
}
