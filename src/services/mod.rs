// Status rules
pub mod promotion_status;
pub mod reconciliation;
pub mod usage;

// Request coordination
pub mod in_flight;

// Administrator workflows
pub mod promotions;

pub use in_flight::{InFlightGuard, InFlightTicket};
pub use promotion_status::{
    assess, derive_status, BucketCounts, StatusAssessment, StatusFilter, StatusReason,
};
pub use promotions::PromotionService;
pub use reconciliation::StatusDrift;
