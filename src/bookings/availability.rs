use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A booked date range on a homestay calendar
///
/// Ranges are half-open: the checkout day itself is free, so back-to-back
/// stays (one guest leaving the day the next arrives) do not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct DateRange {
    #[schema(example = "2025-01-10")]
    pub start: NaiveDate,
    #[schema(example = "2025-01-12")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Check whether two half-open ranges share at least one night
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// What to do when a requested stay collides with an existing booking
///
/// Historically collisions were accepted and sorted out by the host, which
/// produced double bookings. Rejection is now the default; `OVERLAP_POLICY=allow`
/// restores the old behavior for deployments that still want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    Reject,
    Allow,
}

impl OverlapPolicy {
    /// Read the policy from the OVERLAP_POLICY environment variable
    ///
    /// Unset or unrecognized values fall back to `Reject`.
    pub fn from_env() -> Self {
        match std::env::var("OVERLAP_POLICY") {
            Ok(value) if value.eq_ignore_ascii_case("allow") => OverlapPolicy::Allow,
            _ => OverlapPolicy::Reject,
        }
    }

    pub fn rejects(&self) -> bool {
        matches!(self, OverlapPolicy::Reject)
    }
}

/// Check a requested stay against the booked ranges of one homestay
///
/// # Arguments
/// * `requested` - The stay being booked
/// * `booked` - Ranges already held by blocking bookings
///
/// # Returns
/// The first booked range that collides, or `None` when the stay fits
pub fn find_conflict(requested: &DateRange, booked: &[DateRange]) -> Option<DateRange> {
    booked.iter().find(|range| range.overlaps(requested)).copied()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (2020i32..=2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn range_strategy() -> impl Strategy<Value = DateRange> {
        (date_strategy(), 0i64..=60)
            .prop_map(|(start, len)| DateRange::new(start, start + chrono::Duration::days(len)))
    }

    /// Property: overlap is symmetric
    #[test]
    fn prop_overlap_is_symmetric() {
        proptest!(|(a in range_strategy(), b in range_strategy())| {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        });
    }

    /// Property: a non-empty range always overlaps itself, an empty one never
    #[test]
    fn prop_self_overlap_matches_emptiness() {
        proptest!(|(a in range_strategy())| {
            prop_assert_eq!(a.overlaps(&a), a.start < a.end);
        });
    }

    /// Property: two ranges overlap exactly when some night falls in both
    ///
    /// Compares the interval arithmetic against a day-by-day membership scan.
    #[test]
    fn prop_overlap_matches_night_scan() {
        proptest!(|(a in range_strategy(), b in range_strategy())| {
            let mut shared = false;
            let mut night = a.start;
            while night < a.end {
                if night >= b.start && night < b.end {
                    shared = true;
                    break;
                }
                night += chrono::Duration::days(1);
            }

            prop_assert_eq!(a.overlaps(&b), shared);
        });
    }

    /// Property: touching endpoints never count as overlap
    #[test]
    fn prop_touching_ranges_do_not_overlap() {
        proptest!(|(start in date_strategy(), len_a in 1i64..=30, len_b in 1i64..=30)| {
            let a = DateRange::new(start, start + chrono::Duration::days(len_a));
            let b = DateRange::new(a.end, a.end + chrono::Duration::days(len_b));

            prop_assert!(!a.overlaps(&b));
            prop_assert!(!b.overlaps(&a));
        });
    }
}
