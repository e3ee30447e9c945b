//! The normalization pipeline: raw table in, canonical set out.
//!
//! A pure, re-runnable, single-pass transform. Per-field problems (no
//! matching column, unparseable cell) degrade into absent values recorded in
//! the manifest; the only fatal error is an unreadable source, raised by the
//! parser before this module runs.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::models::{populated_fields, CanonicalField, CanonicalRecord, CanonicalSet, IncomeBracket, Manifest};
use crate::parser::{self, RawTable};

use super::aliases::{self, ResolvedColumns};
use super::{coerce, derive};

/// Options for a normalization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Year used for age computation. Defaults to the current UTC year;
    /// fixed in tests so ages stay stable.
    pub reference_year: Option<i32>,
}

impl NormalizeOptions {
    fn resolve_reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }
}

/// Normalize a raw table into canonical records plus a population manifest.
///
/// Infallible and side-effect-free: the same input always produces the same
/// output, and nothing is mutated in place.
pub fn normalize(raw: &RawTable, options: &NormalizeOptions) -> CanonicalSet {
    let resolved = aliases::resolve(&raw.headers);
    let reference_year = options.resolve_reference_year();

    let mut unparseable: BTreeMap<CanonicalField, usize> = BTreeMap::new();
    let mut records = Vec::with_capacity(raw.rows.len());

    for row in &raw.rows {
        // Rows where every cell is blank carry nothing worth defaulting.
        if row.values().all(|v| v.trim().is_empty()) {
            continue;
        }
        records.push(normalize_row(row, &resolved, reference_year, &mut unparseable));
    }

    let manifest = Manifest {
        populated: populated_fields(&records),
        sources: resolved.sources.clone(),
        unparseable,
        passthrough: resolved.passthrough.keys().cloned().collect(),
    };

    CanonicalSet { records, manifest }
}

/// Read and normalize a tabular file in one step.
pub fn normalize_file<P: AsRef<std::path::Path>>(
    path: P,
    options: &NormalizeOptions,
) -> PipelineResult<CanonicalSet> {
    let raw = parser::read_file(path)?;
    Ok(normalize(&raw, options))
}

/// Normalize tabular bytes supplied in memory (e.g. an upload).
pub fn normalize_bytes(bytes: &[u8], options: &NormalizeOptions) -> PipelineResult<CanonicalSet> {
    let raw = parser::read_bytes(bytes)?;
    Ok(normalize(&raw, options))
}

fn normalize_row(
    row: &BTreeMap<String, String>,
    resolved: &ResolvedColumns,
    reference_year: i32,
    unparseable: &mut BTreeMap<CanonicalField, usize>,
) -> CanonicalRecord {
    let cell = |field: CanonicalField| -> Option<&str> {
        resolved
            .source(field)
            .and_then(|header| row.get(header))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };

    let request_date = parse_date_cell(cell(CanonicalField::RequestDate), CanonicalField::RequestDate, unparseable);
    let support_date = parse_date_cell(cell(CanonicalField::SupportDate), CanonicalField::SupportDate, unparseable);
    let processing_time_days = match (request_date, support_date) {
        (Some(requested), Some(supported)) => {
            Some(derive::processing_time_days(requested, supported))
        }
        _ => None,
    };

    let date_of_birth = parse_date_cell(cell(CanonicalField::DateOfBirth), CanonicalField::DateOfBirth, unparseable);
    let age = date_of_birth.and_then(|dob| derive::age(dob, reference_year));

    let amount_granted = parse_amount_cell(cell(CanonicalField::AmountGranted), CanonicalField::AmountGranted, unparseable);

    // Utilization resolution order: an explicit used-amount column wins; a
    // remaining-balance column is inverted against the granted amount; with
    // no utilization column at all, assume the grant was fully used. A
    // resolved column whose cell failed to parse leaves the field absent.
    let amount_used = if resolved.source(CanonicalField::AmountUsed).is_some() {
        parse_amount_cell(cell(CanonicalField::AmountUsed), CanonicalField::AmountUsed, unparseable)
    } else if resolved.source(CanonicalField::UnusedAmount).is_some() {
        let remaining = parse_amount_cell(
            cell(CanonicalField::UnusedAmount),
            CanonicalField::UnusedAmount,
            unparseable,
        );
        match (amount_granted, remaining) {
            (Some(granted), Some(remaining)) => Some(granted - remaining),
            _ => None,
        }
    } else {
        amount_granted
    };

    let unused_amount = match (amount_granted, amount_used) {
        (Some(granted), Some(used)) => Some(derive::unused_amount(granted, used)),
        _ => None,
    };
    let full_grant_used = match (amount_granted, amount_used) {
        (Some(granted), Some(used)) => Some(derive::full_grant_used(granted, used)),
        _ => None,
    };

    let monthly_income = parse_amount_cell(cell(CanonicalField::MonthlyIncome), CanonicalField::MonthlyIncome, unparseable);
    let income_bracket = monthly_income.and_then(IncomeBracket::from_monthly_income);

    // Sentinels, never empty: consumers filter on exact string equality.
    let status = cell(CanonicalField::Status)
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string());
    let application_signed = cell(CanonicalField::ApplicationSigned)
        .map(str::to_string)
        .unwrap_or_else(|| "Missing".to_string());

    let ready_for_review = Some(derive::ready_for_review(&status));
    let signed_by_committee = Some(derive::signed_by_committee(&application_signed));

    let gender = cell(CanonicalField::Gender).map(coerce::capitalize);
    let insurance_type = cell(CanonicalField::InsuranceType).map(coerce::title_case);
    let assistance_type = cell(CanonicalField::AssistanceType).map(str::to_string);

    let extra: BTreeMap<String, String> = resolved
        .passthrough
        .iter()
        .map(|(std_name, raw_header)| {
            let value = row.get(raw_header).map(|v| v.trim()).unwrap_or("");
            (std_name.clone(), value.to_string())
        })
        .collect();

    CanonicalRecord {
        request_date,
        support_date,
        processing_time_days,
        date_of_birth,
        age,
        assistance_type,
        amount_granted,
        amount_used,
        monthly_income,
        unused_amount,
        full_grant_used,
        income_bracket,
        status,
        ready_for_review,
        application_signed,
        signed_by_committee,
        gender,
        insurance_type,
        extra,
    }
}

fn parse_date_cell(
    cell: Option<&str>,
    field: CanonicalField,
    unparseable: &mut BTreeMap<CanonicalField, usize>,
) -> Option<NaiveDate> {
    let value = cell?;
    let parsed = coerce::parse_date(value);
    if parsed.is_none() {
        *unparseable.entry(field).or_insert(0) += 1;
    }
    parsed
}

fn parse_amount_cell(
    cell: Option<&str>,
    field: CanonicalField,
    unparseable: &mut BTreeMap<CanonicalField, usize>,
) -> Option<f64> {
    let value = cell?;
    let parsed = coerce::parse_amount(value);
    if parsed.is_none() {
        *unparseable.entry(field).or_insert(0) += 1;
    }
    parsed
}
