pub mod listing;
pub mod promotion;
pub mod validation;

pub use listing::{ListQuery, Pagination, PromotionPage, SortKey, DEFAULT_PAGE_SIZE};
pub use promotion::{
    normalize_code, slugify, ContentBlock, ContentBlockKind, DerivedStatus, DiscountType,
    Promotion, PromotionDraft, PromotionInput, PromotionPatch, PromotionStatus, StatusBucket,
};
