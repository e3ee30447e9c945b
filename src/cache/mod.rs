//! Derived-file cache for the canonical record set.
//!
//! The canonical table is persisted as a flat CSV (canonical field names as
//! the header, passthrough columns after them) and regenerated whenever the
//! raw source is newer than the cache or the cache is absent. Writes go to a
//! temp file in the target directory and are atomically renamed over the
//! destination, so concurrent readers never observe a partial file.
//!
//! Writing is an explicit, separate operation: `normalize` itself never
//! touches the filesystem.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{CacheError, CacheResult, PipelineResult};
use crate::models::{populated_fields, CanonicalField, CanonicalRecord, CanonicalSet, IncomeBracket, Manifest};
use crate::normalize::{self, NormalizeOptions};

/// Default raw-extract location, relative to the working directory.
pub const DEFAULT_INPUT: &str = "data/raw/applications.csv";

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE: &str = "data/processed/normalized.csv";

/// Outcome of a [`refresh`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was newer than the source; nothing was written.
    Fresh,
    /// The cache was regenerated.
    Rebuilt { rows: usize, populated: usize },
}

/// Whether the cache needs regeneration: it is absent, unreadable, or older
/// than the raw input.
pub fn is_stale(input: &Path, cache: &Path) -> bool {
    let cache_mtime = match cache.metadata().and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return true,
    };
    match input.metadata().and_then(|m| m.modified()) {
        Ok(input_mtime) => cache_mtime < input_mtime,
        // No readable input; keep serving the existing cache.
        Err(_) => false,
    }
}

/// Render the canonical set as flat CSV text: canonical field names first,
/// passthrough columns after them, one row per record.
pub fn to_csv_string(set: &CanonicalSet) -> CacheResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = CanonicalField::ALL.iter().map(|f| f.as_str()).collect();
    header.extend(set.manifest.passthrough.iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in &set.records {
        let mut cells: Vec<String> = CanonicalField::ALL
            .iter()
            .map(|f| record.field_str(*f).unwrap_or_default())
            .collect();
        for column in &set.manifest.passthrough {
            cells.push(record.extra.get(column).cloned().unwrap_or_default());
        }
        writer.write_record(&cells)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CacheError::Persist(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CacheError::Persist(e.to_string()))
}

/// Write the canonical set to `path` as a flat CSV, atomically.
pub fn write(set: &CanonicalSet, path: &Path) -> CacheResult<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
    }

    let content = to_csv_string(set)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;

    tmp.persist(path)
        .map_err(|e| CacheError::Persist(e.to_string()))?;
    Ok(())
}

/// Read a previously written canonical CSV back into a [`CanonicalSet`].
///
/// Cell-level reads are tolerant like the pipeline itself; the only hard
/// failure is a file whose header shares no column with the canonical set.
///
/// The manifest is recomputed from the file contents: `populated` and
/// `passthrough` come back, but the run-time `sources` and `unparseable`
/// maps are not persisted in the flat CSV and load empty. Callers needing
/// that reporting re-run the pipeline on the raw input instead.
pub fn load(path: &Path) -> CacheResult<CanonicalSet> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CacheError::Malformed(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CacheError::Malformed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let columns: Vec<(usize, Option<CanonicalField>)> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (i, CanonicalField::parse(h)))
        .collect();
    if columns.iter().all(|(_, f)| f.is_none()) {
        return Err(CacheError::Malformed(
            "no canonical columns in cache header".to_string(),
        ));
    }
    let passthrough: Vec<String> = columns
        .iter()
        .filter(|(_, f)| f.is_none())
        .map(|(i, _)| headers[*i].clone())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| CacheError::Malformed(e.to_string()))?;
        let mut record = CanonicalRecord::default();
        let mut extra = BTreeMap::new();

        for (i, field) in &columns {
            let value = row.get(*i).unwrap_or("").trim();
            match field {
                Some(field) => read_cell(&mut record, *field, value),
                None => {
                    extra.insert(headers[*i].clone(), value.to_string());
                }
            }
        }
        if record.status.is_empty() {
            record.status = "Unknown".to_string();
        }
        if record.application_signed.is_empty() {
            record.application_signed = "Missing".to_string();
        }
        record.extra = extra;
        records.push(record);
    }

    let manifest = Manifest {
        populated: populated_fields(&records),
        sources: BTreeMap::new(),
        unparseable: BTreeMap::new(),
        passthrough,
    };
    Ok(CanonicalSet { records, manifest })
}

/// Regenerate the cache from the raw input when stale (or forced).
///
/// This is the one operation with side effects; callers wanting the data
/// without touching disk use [`normalize::normalize_file`] directly.
pub fn refresh(
    input: &Path,
    cache: &Path,
    options: &NormalizeOptions,
    force: bool,
) -> PipelineResult<RefreshOutcome> {
    if !force && !is_stale(input, cache) {
        return Ok(RefreshOutcome::Fresh);
    }

    let set = normalize::normalize_file(input, options)?;
    write(&set, cache)?;
    Ok(RefreshOutcome::Rebuilt {
        rows: set.len(),
        populated: set.manifest.populated.len(),
    })
}

fn read_cell(record: &mut CanonicalRecord, field: CanonicalField, value: &str) {
    if value.is_empty() {
        return;
    }
    let parse_date = |v: &str| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok();
    let parse_bool = |v: &str| match v {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    };

    match field {
        CanonicalField::RequestDate => record.request_date = parse_date(value),
        CanonicalField::SupportDate => record.support_date = parse_date(value),
        CanonicalField::ProcessingTimeDays => record.processing_time_days = value.parse().ok(),
        CanonicalField::DateOfBirth => record.date_of_birth = parse_date(value),
        CanonicalField::Age => record.age = value.parse().ok(),
        CanonicalField::AssistanceType => record.assistance_type = Some(value.to_string()),
        CanonicalField::AmountGranted => record.amount_granted = value.parse().ok(),
        CanonicalField::AmountUsed => record.amount_used = value.parse().ok(),
        CanonicalField::MonthlyIncome => record.monthly_income = value.parse().ok(),
        CanonicalField::UnusedAmount => record.unused_amount = value.parse().ok(),
        CanonicalField::FullGrantUsed => record.full_grant_used = parse_bool(value),
        CanonicalField::IncomeBracket => record.income_bracket = IncomeBracket::from_label(value),
        CanonicalField::Status => record.status = value.to_string(),
        CanonicalField::ReadyForReview => record.ready_for_review = parse_bool(value),
        CanonicalField::ApplicationSigned => record.application_signed = value.to_string(),
        CanonicalField::SignedByCommittee => record.signed_by_committee = parse_bool(value),
        CanonicalField::Gender => record.gender = Some(value.to_string()),
        CanonicalField::InsuranceType => record.insurance_type = Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_set() -> CanonicalSet {
        normalize::normalize_bytes(
            b"Grant Req Date,Amount,Request Status,Case Worker Notes\n\
              01/05/2024,500,Approved,urgent\n\
              02/10/2024,$1200.50,Pending,",
            &NormalizeOptions {
                reference_year: Some(2025),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_write_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normalized.csv");

        let set = sample_set();
        write(&set, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.records[0].request_date,
            set.records[0].request_date
        );
        assert_eq!(loaded.records[0].amount_granted, Some(500.0));
        assert_eq!(loaded.records[1].amount_granted, Some(1200.5));
        assert_eq!(loaded.records[0].status, "Approved");
        assert_eq!(loaded.records[0].full_grant_used, Some(true));
        assert_eq!(
            loaded.records[0].extra.get("case_worker_notes").map(String::as_str),
            Some("urgent")
        );
        assert_eq!(loaded.manifest.populated, set.manifest.populated);
    }

    #[test]
    fn test_load_recomputes_manifest_without_run_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normalized.csv");

        let set = sample_set();
        assert!(!set.manifest.sources.is_empty());
        write(&set, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.manifest.populated, set.manifest.populated);
        assert_eq!(loaded.manifest.passthrough, set.manifest.passthrough);
        // Run-time reporting is not persisted in the flat CSV.
        assert!(loaded.manifest.sources.is_empty());
        assert!(loaded.manifest.unparseable.is_empty());
    }

    #[test]
    fn test_sub_cent_amounts_survive_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normalized.csv");

        let set = normalize::normalize_bytes(
            b"Amount\n499.005",
            &NormalizeOptions {
                reference_year: Some(2025),
            },
        )
        .unwrap();
        assert_eq!(set.records[0].amount_granted, Some(499.005));

        write(&set, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.records[0].amount_granted, Some(499.005));
    }

    #[test]
    fn test_processing_time_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normalized.csv");

        let set = normalize::normalize_bytes(
            b"Grant Req Date,Payment Submitted?\n01/05/2024,01/15/2024",
            &NormalizeOptions {
                reference_year: Some(2025),
            },
        )
        .unwrap();
        write(&set, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(
            loaded.records[0].support_date,
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(loaded.records[0].processing_time_days, Some(10));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/normalized.csv");
        write(&sample_set(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_rejects_non_canonical_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "foo,bar\n1,2\n").unwrap();
        assert!(matches!(load(&path), Err(CacheError::Malformed(_))));
    }

    #[test]
    fn test_is_stale_without_cache() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.csv");
        std::fs::write(&input, "Amount\n500\n").unwrap();
        assert!(is_stale(&input, &dir.path().join("missing.csv")));
    }

    #[test]
    fn test_is_stale_without_input_keeps_cache() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache.csv");
        std::fs::write(&cache, "amount_granted\n500\n").unwrap();
        assert!(!is_stale(&dir.path().join("gone.csv"), &cache));
    }

    #[test]
    fn test_refresh_rebuilds_then_reports_fresh() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let cache = dir.path().join("cache.csv");
        std::fs::write(&input, "Amount,Request Status\n500,Approved\n").unwrap();

        let options = NormalizeOptions::default();
        let first = refresh(&input, &cache, &options, false).unwrap();
        assert!(matches!(first, RefreshOutcome::Rebuilt { rows: 1, .. }));

        // Cache now at least as new as the input.
        let second = refresh(&input, &cache, &options, false).unwrap();
        assert_eq!(second, RefreshOutcome::Fresh);

        let forced = refresh(&input, &cache, &options, true).unwrap();
        assert!(matches!(forced, RefreshOutcome::Rebuilt { .. }));
    }

    #[test]
    fn test_refresh_after_input_update() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let cache = dir.path().join("cache.csv");
        std::fs::write(&input, "Amount\n500\n").unwrap();

        let options = NormalizeOptions::default();
        refresh(&input, &cache, &options, false).unwrap();

        // Make the input strictly newer than the cache.
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(&input, "Amount\n750\n").unwrap();

        let outcome = refresh(&input, &cache, &options, false).unwrap();
        assert!(matches!(outcome, RefreshOutcome::Rebuilt { rows: 1, .. }));
        let loaded = load(&cache).unwrap();
        assert_eq!(loaded.records[0].amount_granted, Some(750.0));
    }

    #[test]
    fn test_missing_input_is_fatal_for_forced_refresh() {
        let dir = tempdir().unwrap();
        let result = refresh(
            &dir.path().join("gone.csv"),
            &dir.path().join("cache.csv"),
            &NormalizeOptions::default(),
            true,
        );
        assert!(result.is_err());
    }
}
