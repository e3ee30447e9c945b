//! Normalization: alias resolution, tolerant coercion, derived fields.
//!
//! - `aliases`: header standardization and the canonical alias table
//! - `coerce`: tolerant date/amount parsers and string cleanups
//! - `derive`: derived-field business rules
//! - `pipeline`: the single-pass `normalize` transform
//!
//! ## Usage Flow
//!
//! ```text
//! file/bytes → parser::read_* → normalize::normalize → CanonicalSet (+ Manifest)
//! ```

pub mod aliases;
pub mod coerce;
pub mod derive;
pub mod pipeline;

pub use aliases::{resolve, standardize_header, ResolvedColumns, ALIAS_TABLE};
pub use pipeline::{normalize, normalize_bytes, normalize_file, NormalizeOptions};
