//! # Caseload - grant-application record normalization
//!
//! Caseload ingests raw tabular extracts of grant-application records whose
//! column names, casing and coverage vary across sources, and produces a
//! canonical, analysis-ready table plus a manifest of which canonical fields
//! were actually derived.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Raw extract  │────▶│   Parser    │────▶│  Normalize   │────▶│ CanonicalSet│
//! │ (CSV/upload) │     │ (auto-enc)  │     │ (alias+coerce│     │ + Manifest  │
//! └──────────────┘     └─────────────┘     │  + derive)   │     └─────────────┘
//!                                          └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use caseload::{normalize_file, NormalizeOptions};
//!
//! let set = normalize_file("data/raw/applications.csv", &NormalizeOptions::default())?;
//! println!("{} records, {}", set.len(), set.manifest.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Canonical fields, records, manifest
//! - [`parser`] - Delimited reading with auto-detection
//! - [`normalize`] - Alias table, coercion, derived fields, pipeline
//! - [`cache`] - Flat derived-file cache with atomic refresh
//! - [`report`] - Leveled stderr progress logging

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Normalization
pub mod normalize;

// Caching
pub mod cache;

// Reporting
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CacheError, PipelineError, SourceError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    populated_fields, CanonicalField, CanonicalRecord, CanonicalSet, IncomeBracket, Manifest,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, read_bytes, read_file, read_str, RawTable,
};

// =============================================================================
// Re-exports - Normalization
// =============================================================================

pub use normalize::{
    normalize, normalize_bytes, normalize_file, resolve, standardize_header, NormalizeOptions,
    ResolvedColumns, ALIAS_TABLE,
};

// =============================================================================
// Re-exports - Cache
// =============================================================================

pub use cache::{is_stale, refresh, RefreshOutcome, DEFAULT_CACHE, DEFAULT_INPUT};
