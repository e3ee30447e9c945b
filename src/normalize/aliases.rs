//! Header standardization and the canonical alias table.
//!
//! Raw extracts name the same logical column many ways ("Grant Req Date",
//! "grant_req_date", "Request Status"). Instead of ad hoc existence checks,
//! resolution is one declarative table: each resolvable canonical field lists
//! its known raw-name variants in priority order, and the first variant found
//! among the standardized headers wins. Unmatched headers pass through
//! unchanged so downstream consumers can still query them.

use std::collections::BTreeMap;

use crate::models::CanonicalField;

/// Known raw-name variants per canonical field, in match-priority order.
///
/// Only directly sourceable fields appear here; purely derived fields (age,
/// processing_time_days, full_grant_used, income_bracket, ready_for_review,
/// signed_by_committee) never resolve from a raw column. `unused_amount` is listed because some
/// extracts carry a remaining-balance column the pipeline can invert into
/// `amount_used`.
pub const ALIAS_TABLE: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::RequestDate,
        &[
            "grant_req_date",
            "request_date",
            "grant_request_date",
            "date_of_request",
            "date",
        ],
    ),
    (
        CanonicalField::SupportDate,
        &[
            "support_date",
            "payment_submitted?",
            "payment_submitted",
            "committee_review_date",
        ],
    ),
    (
        CanonicalField::DateOfBirth,
        &["dob", "date_of_birth", "birth_date", "birthdate"],
    ),
    (
        CanonicalField::AssistanceType,
        &[
            "type_of_assistance_class",
            "type_of_assistance",
            "assistance_type",
            "assistance_class",
        ],
    ),
    (
        CanonicalField::AmountGranted,
        &["amount", "amount_granted", "grant_amount", "amount_awarded"],
    ),
    (
        CanonicalField::AmountUsed,
        &["amount_used", "used_amount", "amount_spent", "utilized_amount"],
    ),
    (
        CanonicalField::UnusedAmount,
        &["remaining_balance", "unused_amount", "remaining_amount"],
    ),
    (
        CanonicalField::MonthlyIncome,
        &[
            "total_household_gross_monthly_income",
            "monthly_income",
            "gross_monthly_income",
            "household_income",
            "income",
        ],
    ),
    (
        CanonicalField::Status,
        &["request_status", "status", "application_status"],
    ),
    (
        CanonicalField::ApplicationSigned,
        &[
            "application_signed?",
            "application_signed",
            "signed?",
            "signed",
        ],
    ),
    (CanonicalField::Gender, &["gender", "sex"]),
    (
        CanonicalField::InsuranceType,
        &["insurance_type", "insurance", "type_of_insurance"],
    ),
];

/// Standardize a raw header: trim, lowercase, spaces to underscores, strip
/// parentheses. `" Grant Req Date "` becomes `"grant_req_date"`.
pub fn standardize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['(', ')'], "")
}

/// Outcome of matching raw headers against the alias table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedColumns {
    /// Canonical field -> the raw header (original casing) that supplies it.
    pub sources: BTreeMap<CanonicalField, String>,
    /// Unmatched columns: standardized name -> raw header.
    pub passthrough: BTreeMap<String, String>,
}

impl ResolvedColumns {
    /// The raw header backing a canonical field, if one matched.
    pub fn source(&self, field: CanonicalField) -> Option<&str> {
        self.sources.get(&field).map(String::as_str)
    }
}

/// Match raw headers against the alias table, first variant wins.
///
/// A raw column is claimed by at most one canonical field; once claimed it is
/// not offered to later table entries or to passthrough.
pub fn resolve(headers: &[String]) -> ResolvedColumns {
    let standardized: Vec<(String, &String)> = headers
        .iter()
        .map(|h| (standardize_header(h), h))
        .collect();

    let mut resolved = ResolvedColumns::default();
    let mut claimed: Vec<&String> = Vec::new();

    for (field, variants) in ALIAS_TABLE {
        for variant in *variants {
            if let Some((_, raw)) = standardized
                .iter()
                .find(|(std_name, raw)| std_name == variant && !claimed.contains(raw))
            {
                resolved.sources.insert(*field, (*raw).clone());
                claimed.push(*raw);
                break;
            }
        }
    }

    for (std_name, raw) in &standardized {
        if !claimed.contains(raw) && !std_name.is_empty() {
            resolved.passthrough.insert(std_name.clone(), (*raw).clone());
        }
    }

    resolved
}
