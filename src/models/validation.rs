//! Field-level validators shared by drafts, edits and usage accounting.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

use super::promotion::DiscountType;

/// Builds a single-field error set.
pub fn field_error(
    field: &'static str,
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error_with_message(code, message));
    errors
}

pub fn error_with_message(
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error_with_message("required", "This field is required"));
    }
    Ok(())
}

pub fn validate_window(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if end_date <= start_date {
        return Err(error_with_message(
            "date_window",
            "End date must be after start date",
        ));
    }
    Ok(())
}

pub fn validate_max_usage(max_usage: u32) -> Result<(), ValidationError> {
    if max_usage == 0 {
        return Err(error_with_message(
            "max_usage_positive",
            "Maximum usage must be at least 1",
        ));
    }
    Ok(())
}

pub fn validate_discount(
    discount_type: DiscountType,
    value: &Decimal,
) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(error_with_message(
            "discount_negative",
            "Discount value cannot be negative",
        ));
    }
    if discount_type == DiscountType::Percentage && *value > Decimal::ONE_HUNDRED {
        return Err(error_with_message(
            "discount_percentage_range",
            "Percentage discount must be between 0 and 100",
        ));
    }
    Ok(())
}
