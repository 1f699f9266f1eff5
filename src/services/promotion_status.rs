//! Status derivation and the read-side bucket view.
//!
//! [`derive_status`] is the only place a promotion's lifecycle status is
//! computed. Listing, statistics, edit and toggle paths all go through it or
//! through [`PromotionStatus::bucket`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::{DerivedStatus, Promotion, PromotionStatus, StatusBucket};

/// Hours before `end_date` during which a running promotion reads as inactive.
pub const EXPIRING_SOON_HOURS: i64 = 48;

pub fn expiring_soon_window() -> Duration {
    Duration::hours(EXPIRING_SOON_HOURS)
}

/// Which rule produced a derived status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusReason {
    Ended,
    NotStarted,
    UsageExhausted,
    EndingSoon,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAssessment {
    pub status: DerivedStatus,
    pub reason: StatusReason,
}

/// Evaluates the lifecycle rules in priority order; the first match wins.
pub fn assess(
    now: DateTime<Utc>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    current_usage: u32,
    max_usage: u32,
) -> StatusAssessment {
    let (status, reason) = if end_date < now {
        (DerivedStatus::Expired, StatusReason::Ended)
    } else if now < start_date {
        (DerivedStatus::Inactive, StatusReason::NotStarted)
    } else if current_usage >= max_usage {
        (DerivedStatus::Expired, StatusReason::UsageExhausted)
    } else if end_date - now <= expiring_soon_window() {
        (DerivedStatus::Inactive, StatusReason::EndingSoon)
    } else {
        (DerivedStatus::Active, StatusReason::Running)
    };

    StatusAssessment { status, reason }
}

pub fn derive_status(
    now: DateTime<Utc>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    current_usage: u32,
    max_usage: u32,
) -> DerivedStatus {
    assess(now, start_date, end_date, current_usage, max_usage).status
}

pub fn assess_promotion(promotion: &Promotion, now: DateTime<Utc>) -> StatusAssessment {
    assess(
        now,
        promotion.start_date,
        promotion.end_date,
        promotion.current_usage,
        promotion.max_usage,
    )
}

pub fn derive_for(promotion: &Promotion, now: DateTime<Utc>) -> DerivedStatus {
    assess_promotion(promotion, now).status
}

/// Status filter offered by list pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Expired,
}

impl StatusFilter {
    pub fn matches(&self, status: &PromotionStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status.bucket() == StatusBucket::Active,
            Self::Expired => status.bucket() == StatusBucket::Expired,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub active: usize,
    pub expired: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.active + self.expired
    }
}

pub fn count_buckets<'a, I>(promotions: I) -> BucketCounts
where
    I: IntoIterator<Item = &'a Promotion>,
{
    promotions
        .into_iter()
        .fold(BucketCounts::default(), |mut counts, promotion| {
            match promotion.status.bucket() {
                StatusBucket::Active => counts.active += 1,
                StatusBucket::Expired => counts.expired += 1,
            }
            counts
        })
}
