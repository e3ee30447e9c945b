//! Domain models for the caseload normalization pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`CanonicalField`] - the fixed, documented set of output columns
//! - [`IncomeBracket`] - monthly-income bins with fixed boundaries
//! - [`CanonicalRecord`] - one normalized grant-application row
//! - [`Manifest`] - which canonical fields a pipeline run actually populated
//! - [`CanonicalSet`] - the pipeline output: records plus manifest

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// Canonical Fields
// =============================================================================

/// A canonical output column with a fixed meaning, independent of how the raw
/// source names it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    /// Date the grant was requested.
    RequestDate,
    /// Date support was paid out (payment-submitted date).
    SupportDate,
    /// Days from request to support payout, only when both dates parsed.
    ProcessingTimeDays,
    /// Applicant date of birth.
    DateOfBirth,
    /// Reference year minus birth year, only when a birth date parsed.
    Age,
    /// Class of assistance requested.
    AssistanceType,
    /// Amount granted, as a decimal.
    AmountGranted,
    /// Amount actually used; defaults to the granted amount when no
    /// utilization column exists.
    AmountUsed,
    /// Gross monthly household income.
    MonthlyIncome,
    /// Granted minus used amount.
    UnusedAmount,
    /// Whether the grant was used up within rounding tolerance.
    FullGrantUsed,
    /// Income bin over the monthly income.
    IncomeBracket,
    /// Request status; sentinel `"Unknown"` when absent.
    Status,
    /// Whether the status text marks the application reviewable.
    ReadyForReview,
    /// Signature column text; sentinel `"Missing"` when absent.
    ApplicationSigned,
    /// Whether the signature text counts as signed.
    SignedByCommittee,
    /// Applicant gender, capitalized.
    Gender,
    /// Insurance type, title-cased.
    InsuranceType,
}

impl CanonicalField {
    /// All canonical fields, in cache-file column order.
    pub const ALL: [CanonicalField; 18] = [
        CanonicalField::RequestDate,
        CanonicalField::SupportDate,
        CanonicalField::ProcessingTimeDays,
        CanonicalField::DateOfBirth,
        CanonicalField::Age,
        CanonicalField::AssistanceType,
        CanonicalField::AmountGranted,
        CanonicalField::AmountUsed,
        CanonicalField::MonthlyIncome,
        CanonicalField::UnusedAmount,
        CanonicalField::FullGrantUsed,
        CanonicalField::IncomeBracket,
        CanonicalField::Status,
        CanonicalField::ReadyForReview,
        CanonicalField::ApplicationSigned,
        CanonicalField::SignedByCommittee,
        CanonicalField::Gender,
        CanonicalField::InsuranceType,
    ];

    /// The canonical column name, as written to the cache header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::RequestDate => "request_date",
            CanonicalField::SupportDate => "support_date",
            CanonicalField::ProcessingTimeDays => "processing_time_days",
            CanonicalField::DateOfBirth => "date_of_birth",
            CanonicalField::Age => "age",
            CanonicalField::AssistanceType => "assistance_type",
            CanonicalField::AmountGranted => "amount_granted",
            CanonicalField::AmountUsed => "amount_used",
            CanonicalField::MonthlyIncome => "monthly_income",
            CanonicalField::UnusedAmount => "unused_amount",
            CanonicalField::FullGrantUsed => "full_grant_used",
            CanonicalField::IncomeBracket => "income_bracket",
            CanonicalField::Status => "status",
            CanonicalField::ReadyForReview => "ready_for_review",
            CanonicalField::ApplicationSigned => "application_signed",
            CanonicalField::SignedByCommittee => "signed_by_committee",
            CanonicalField::Gender => "gender",
            CanonicalField::InsuranceType => "insurance_type",
        }
    }

    /// Parse a canonical column name back into a field.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Income Bracket
// =============================================================================

/// Monthly-income bin. Intervals are right-open, so a boundary value belongs
/// to the upper bracket: 2000 is `2–4k`, not `<2k`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IncomeBracket {
    /// [0, 2000)
    Under2k,
    /// [2000, 4000)
    From2kTo4k,
    /// [4000, 6000)
    From4kTo6k,
    /// [6000, 10000)
    From6kTo10k,
    /// [10000, ∞)
    Over10k,
}

impl IncomeBracket {
    /// Classify a monthly income. Negative values fall outside every bin.
    pub fn from_monthly_income(income: f64) -> Option<Self> {
        if !income.is_finite() || income < 0.0 {
            return None;
        }
        Some(if income < 2000.0 {
            IncomeBracket::Under2k
        } else if income < 4000.0 {
            IncomeBracket::From2kTo4k
        } else if income < 6000.0 {
            IncomeBracket::From4kTo6k
        } else if income < 10000.0 {
            IncomeBracket::From6kTo10k
        } else {
            IncomeBracket::Over10k
        })
    }

    /// Display label, matching the historical report wording.
    pub fn label(&self) -> &'static str {
        match self {
            IncomeBracket::Under2k => "<2k",
            IncomeBracket::From2kTo4k => "2–4k",
            IncomeBracket::From4kTo6k => "4–6k",
            IncomeBracket::From6kTo10k => "6–10k",
            IncomeBracket::Over10k => "10k+",
        }
    }

    /// Parse a display label back into a bracket.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "<2k" => Some(IncomeBracket::Under2k),
            "2–4k" => Some(IncomeBracket::From2kTo4k),
            "4–6k" => Some(IncomeBracket::From4kTo6k),
            "6–10k" => Some(IncomeBracket::From6kTo10k),
            "10k+" => Some(IncomeBracket::Over10k),
            _ => None,
        }
    }
}

impl std::fmt::Display for IncomeBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Canonical Record
// =============================================================================

/// One normalized grant-application row.
///
/// Every derived field is an `Option`: `None` means the inputs never resolved
/// or never parsed, which consumers must treat distinctly from a computed
/// `false` or `0`. Only `status` and `application_signed` are plain strings,
/// carrying their sentinel defaults (`"Unknown"` / `"Missing"`) so consumers
/// can filter on exact equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CanonicalRecord {
    pub request_date: Option<NaiveDate>,
    pub support_date: Option<NaiveDate>,
    pub processing_time_days: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<u32>,
    pub assistance_type: Option<String>,
    pub amount_granted: Option<f64>,
    pub amount_used: Option<f64>,
    pub monthly_income: Option<f64>,
    pub unused_amount: Option<f64>,
    pub full_grant_used: Option<bool>,
    pub income_bracket: Option<IncomeBracket>,
    pub status: String,
    pub ready_for_review: Option<bool>,
    pub application_signed: String,
    pub signed_by_committee: Option<bool>,
    pub gender: Option<String>,
    pub insurance_type: Option<String>,
    /// Unmatched raw columns, standardized name -> original cell value.
    /// Preserved so downstream consumers can still query them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// Render a canonical field as its cache-file cell text, or `None` when
    /// the field is absent for this record.
    pub fn field_str(&self, field: CanonicalField) -> Option<String> {
        match field {
            CanonicalField::RequestDate => self.request_date.map(|d| d.to_string()),
            CanonicalField::SupportDate => self.support_date.map(|d| d.to_string()),
            CanonicalField::ProcessingTimeDays => {
                self.processing_time_days.map(|d| d.to_string())
            }
            CanonicalField::DateOfBirth => self.date_of_birth.map(|d| d.to_string()),
            CanonicalField::Age => self.age.map(|a| a.to_string()),
            CanonicalField::AssistanceType => self.assistance_type.clone(),
            CanonicalField::AmountGranted => self.amount_granted.map(format_amount),
            CanonicalField::AmountUsed => self.amount_used.map(format_amount),
            CanonicalField::MonthlyIncome => self.monthly_income.map(format_amount),
            CanonicalField::UnusedAmount => self.unused_amount.map(format_amount),
            CanonicalField::FullGrantUsed => self.full_grant_used.map(|b| b.to_string()),
            CanonicalField::IncomeBracket => self.income_bracket.map(|b| b.label().to_string()),
            CanonicalField::Status => Some(self.status.clone()),
            CanonicalField::ReadyForReview => self.ready_for_review.map(|b| b.to_string()),
            CanonicalField::ApplicationSigned => Some(self.application_signed.clone()),
            CanonicalField::SignedByCommittee => self.signed_by_committee.map(|b| b.to_string()),
            CanonicalField::Gender => self.gender.clone(),
            CanonicalField::InsuranceType => self.insurance_type.clone(),
        }
    }
}

/// Render an amount with the shortest exact `f64` representation, so a cache
/// round-trip reloads the same value the pipeline produced.
fn format_amount(v: f64) -> String {
    v.to_string()
}

// =============================================================================
// Manifest
// =============================================================================

/// What a pipeline run actually produced, beyond the rows themselves.
///
/// Consumers check the manifest before rendering anything that depends on a
/// field that may be absent: an unresolved column or an all-unparseable one
/// shows up here, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Manifest {
    /// Canonical fields non-empty in at least one output row.
    pub populated: BTreeSet<CanonicalField>,
    /// Which raw column supplied each resolved canonical field. Fields with
    /// no entry here had no matching alias in the source.
    pub sources: BTreeMap<CanonicalField, String>,
    /// Per-field count of cells that failed date/amount coercion.
    pub unparseable: BTreeMap<CanonicalField, usize>,
    /// Standardized names of raw columns no alias claimed.
    pub passthrough: Vec<String>,
}

impl Manifest {
    /// Whether a canonical field carries data in this run.
    pub fn is_populated(&self, field: CanonicalField) -> bool {
        self.populated.contains(&field)
    }

    /// One-line summary for progress output.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} canonical fields populated, {} passthrough columns, {} unparseable cells",
            self.populated.len(),
            CanonicalField::ALL.len(),
            self.passthrough.len(),
            self.unparseable.values().sum::<usize>(),
        )
    }
}

/// Compute the populated-field set from a slice of records.
pub fn populated_fields(records: &[CanonicalRecord]) -> BTreeSet<CanonicalField> {
    let mut populated = BTreeSet::new();
    for field in CanonicalField::ALL {
        if records.iter().any(|r| {
            r.field_str(field)
                .is_some_and(|v| !v.trim().is_empty())
        }) {
            populated.insert(field);
        }
    }
    populated
}

// =============================================================================
// Canonical Set
// =============================================================================

/// The pipeline output: an ordered sequence of normalized records plus the
/// population manifest. A pure value; nothing mutates it in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CanonicalSet {
    pub records: Vec<CanonicalRecord>,
    pub manifest: Manifest,
}

impl CanonicalSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_round_trip() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::parse(field.as_str()), Some(field));
        }
        assert_eq!(CanonicalField::parse("not_a_field"), None);
    }

    #[test]
    fn test_bracket_boundaries_go_up() {
        assert_eq!(
            IncomeBracket::from_monthly_income(2000.0),
            Some(IncomeBracket::From2kTo4k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(4000.0),
            Some(IncomeBracket::From4kTo6k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(6000.0),
            Some(IncomeBracket::From6kTo10k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(10000.0),
            Some(IncomeBracket::Over10k)
        );
    }

    #[test]
    fn test_bracket_interior_values() {
        assert_eq!(
            IncomeBracket::from_monthly_income(0.0),
            Some(IncomeBracket::Under2k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(1999.99),
            Some(IncomeBracket::Under2k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(5500.0),
            Some(IncomeBracket::From4kTo6k)
        );
        assert_eq!(
            IncomeBracket::from_monthly_income(250000.0),
            Some(IncomeBracket::Over10k)
        );
    }

    #[test]
    fn test_negative_income_has_no_bracket() {
        assert_eq!(IncomeBracket::from_monthly_income(-100.0), None);
        assert_eq!(IncomeBracket::from_monthly_income(f64::NAN), None);
    }

    #[test]
    fn test_bracket_label_round_trip() {
        for bracket in [
            IncomeBracket::Under2k,
            IncomeBracket::From2kTo4k,
            IncomeBracket::From4kTo6k,
            IncomeBracket::From6kTo10k,
            IncomeBracket::Over10k,
        ] {
            assert_eq!(IncomeBracket::from_label(bracket.label()), Some(bracket));
        }
    }

    #[test]
    fn test_format_amount_is_value_preserving() {
        assert_eq!(format_amount(500.0), "500");
        assert_eq!(format_amount(499.5), "499.5");
        assert_eq!(format_amount(0.01), "0.01");
        assert_eq!(format_amount(0.0), "0");
        // Sub-cent precision must survive a render-and-reparse cycle.
        assert_eq!(format_amount(499.005), "499.005");
        assert_eq!(format_amount(499.005).parse::<f64>().unwrap(), 499.005);
    }

    #[test]
    fn test_populated_fields_ignores_absent() {
        let record = CanonicalRecord {
            amount_granted: Some(500.0),
            status: "Unknown".to_string(),
            application_signed: "Missing".to_string(),
            ..Default::default()
        };
        let populated = populated_fields(&[record]);
        assert!(populated.contains(&CanonicalField::AmountGranted));
        assert!(populated.contains(&CanonicalField::Status));
        assert!(!populated.contains(&CanonicalField::AmountUsed));
        assert!(!populated.contains(&CanonicalField::RequestDate));
    }
}
