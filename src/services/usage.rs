//! Client-side usage accounting.
//!
//! These checks give fast feedback only. The backend performs the real
//! redemption and may still reject it.

use validator::ValidationError;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::validation::{error_with_message, field_error, validate_max_usage};
use crate::models::{Promotion, PromotionPatch};

pub fn check_usage_within(current_usage: u32, max_usage: u32) -> Result<(), ValidationError> {
    if current_usage > max_usage {
        return Err(error_with_message(
            "max_usage_below_current",
            format!(
                "Maximum usage cannot be lower than the {} redemptions already made",
                current_usage
            ),
        ));
    }
    Ok(())
}

pub fn validate_usage(current_usage: u32, max_usage: u32) -> ServiceResult<()> {
    validate_max_usage(max_usage)
        .and_then(|()| check_usage_within(current_usage, max_usage))
        .map_err(|err| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("max_usage", err);
            ServiceError::InvalidFields(errors)
        })
}

/// Rejects lowering the ceiling below what has already been redeemed.
pub fn validate_max_usage_change(promotion: &Promotion, new_max_usage: u32) -> ServiceResult<()> {
    validate_usage(promotion.current_usage, new_max_usage)
}

pub fn remaining_uses(promotion: &Promotion) -> u32 {
    promotion.max_usage.saturating_sub(promotion.current_usage)
}

pub fn is_exhausted(promotion: &Promotion) -> bool {
    promotion.current_usage >= promotion.max_usage
}

/// Update recording one more redemption. Leaves `status` untouched.
pub fn prepare_redemption(promotion: &Promotion) -> ServiceResult<PromotionPatch> {
    if is_exhausted(promotion) {
        return Err(ServiceError::InvalidFields(field_error(
            "current_usage",
            "usage_exhausted",
            format!(
                "Promotion '{}' has reached its limit of {} redemptions",
                promotion.slug, promotion.max_usage
            ),
        )));
    }

    Ok(PromotionPatch {
        current_usage: Some(promotion.current_usage + 1),
        ..Default::default()
    })
}
