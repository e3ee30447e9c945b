//! Derived-field business rules.
//!
//! Pure functions over already-coerced values. Each is only invoked when its
//! inputs parsed; the pipeline leaves the derived field absent otherwise.

use chrono::{Datelike, NaiveDate};

/// Rounding tolerance on grant utilization: a cent of slack in either
/// direction still counts as fully used.
pub const UTILIZATION_TOLERANCE: f64 = 0.01;

// Absorbs float representation error at the tolerance boundary.
const EPSILON: f64 = 1e-9;

/// Years between the birth date and the reference year. A birth year after
/// the reference year is nonsense data and yields `None` rather than a
/// negative age.
pub fn age(date_of_birth: NaiveDate, reference_year: i32) -> Option<u32> {
    let years = reference_year - date_of_birth.year();
    u32::try_from(years).ok()
}

/// Days from the request to the support payout. Negative when the support
/// date precedes the request date; the anomaly is preserved for consumers
/// rather than masked.
pub fn processing_time_days(request_date: NaiveDate, support_date: NaiveDate) -> i64 {
    (support_date - request_date).num_days()
}

/// Granted minus used, the remaining balance of the grant.
pub fn unused_amount(amount_granted: f64, amount_used: f64) -> f64 {
    amount_granted - amount_used
}

/// Whether the grant was exhausted within [`UTILIZATION_TOLERANCE`].
///
/// Overspend beyond the tolerance reads false as well: a grant whose usage
/// exceeds what was granted is an anomaly, not a cleanly exhausted one.
pub fn full_grant_used(amount_granted: f64, amount_used: f64) -> bool {
    (amount_granted - amount_used).abs() <= UTILIZATION_TOLERANCE + EPSILON
}

/// Whether the status text marks the application reviewable: it mentions
/// approval, or both "ready" and "review" (case-insensitive).
pub fn ready_for_review(status: &str) -> bool {
    let lower = status.to_lowercase();
    lower.contains("approved") || (lower.contains("ready") && lower.contains("review"))
}

/// Whether the signature text counts as a committee signature.
pub fn signed_by_committee(application_signed: &str) -> bool {
    matches!(
        application_signed.trim().to_lowercase().as_str(),
        "yes" | "signed"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_from_birth_year() {
        assert_eq!(age(date(1990, 6, 15), 2024), Some(34));
        assert_eq!(age(date(2024, 1, 1), 2024), Some(0));
    }

    #[test]
    fn test_age_rejects_future_birth_year() {
        assert_eq!(age(date(2030, 1, 1), 2024), None);
    }

    #[test]
    fn test_processing_time_days() {
        assert_eq!(
            processing_time_days(date(2024, 1, 5), date(2024, 1, 15)),
            10
        );
        assert_eq!(
            processing_time_days(date(2024, 1, 5), date(2024, 1, 5)),
            0
        );
        assert_eq!(
            processing_time_days(date(2023, 12, 20), date(2024, 1, 4)),
            15
        );
        // Support before request stays negative, not clamped.
        assert_eq!(
            processing_time_days(date(2024, 1, 15), date(2024, 1, 5)),
            -10
        );
    }

    #[test]
    fn test_unused_amount() {
        assert_eq!(unused_amount(500.0, 350.0), 150.0);
        assert_eq!(unused_amount(500.0, 500.0), 0.0);
    }

    #[test]
    fn test_full_grant_used_within_tolerance() {
        assert!(full_grant_used(500.0, 500.0));
        assert!(full_grant_used(500.0, 499.99));
        assert!(full_grant_used(500.0, 500.01));
    }

    #[test]
    fn test_full_grant_used_beyond_tolerance() {
        assert!(!full_grant_used(500.0, 499.0));
        // Overspend past the tolerance is an anomaly, not full utilization.
        assert!(!full_grant_used(500.0, 600.0));
    }

    #[test]
    fn test_ready_for_review_matches() {
        assert!(ready_for_review("Approved"));
        assert!(ready_for_review("APPROVED - pending payment"));
        assert!(ready_for_review("Ready for Review"));
        assert!(ready_for_review("ready-for-review"));
    }

    #[test]
    fn test_ready_for_review_non_matches() {
        assert!(!ready_for_review("Unknown"));
        assert!(!ready_for_review("Denied"));
        assert!(!ready_for_review("Under review"));
        assert!(!ready_for_review("Ready to submit"));
    }

    #[test]
    fn test_signed_by_committee() {
        assert!(signed_by_committee("Yes"));
        assert!(signed_by_committee("SIGNED"));
        assert!(signed_by_committee(" signed "));
        assert!(!signed_by_committee("No"));
        assert!(!signed_by_committee("Missing"));
        assert!(!signed_by_committee(""));
    }
}
