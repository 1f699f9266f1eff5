//! Reconciles the persisted `status` field with the derived status.
//!
//! Precedence:
//! - create and every full edit persist the status derived at that instant,
//!   discarding any earlier manual toggle;
//! - a manual toggle only flips between `active` and `expired` and lasts until
//!   the next full edit;
//! - usage increments never rewrite the status; [`prepare_resync`] does that
//!   explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::ValidationErrors;

use super::promotion_status::{assess_promotion, derive_for, derive_status, StatusAssessment};
use super::usage;
use crate::errors::{ConflictField, ServiceError, ServiceResult};
use crate::models::validation::{
    error_with_message, field_error, validate_discount, validate_max_usage, validate_required_text,
    validate_window,
};
use crate::models::{
    normalize_code, slugify, Promotion, PromotionDraft, PromotionInput, PromotionPatch,
    PromotionStatus,
};

/// Persisted status disagreeing with the status derived at some instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDrift {
    pub persisted: PromotionStatus,
    pub derived: StatusAssessment,
}

/// Turns an administrator's draft into the create body.
pub fn prepare_create(draft: &PromotionDraft, now: DateTime<Utc>) -> ServiceResult<PromotionInput> {
    draft.check()?;

    let slug = slugify(&draft.title);
    if slug.is_empty() {
        return Err(ServiceError::InvalidFields(field_error(
            "title",
            "slug_empty",
            "Title must contain at least one letter or digit",
        )));
    }

    let status = derive_status(now, draft.start_date, draft.end_date, 0, draft.max_usage);
    debug!(slug = %slug, status = %status, "prepared promotion for creation");

    Ok(PromotionInput {
        title: draft.title.trim().to_string(),
        slug,
        description: draft.description.clone(),
        image: draft.image.clone(),
        code: draft.code.trim().to_string(),
        discount_type: draft.discount_type,
        discount_value: draft.discount_value,
        start_date: draft.start_date,
        end_date: draft.end_date,
        max_usage: draft.max_usage,
        status: status.into(),
        content: draft.content.clone(),
    })
}

/// Turns a full edit into the update body.
///
/// The resulting status is always re-derived from the merged record. A status
/// supplied in the edit is dropped; use [`prepare_toggle`] for manual changes.
/// A changed title regenerates the slug unless the edit sets one.
pub fn prepare_edit(
    current: &Promotion,
    mut patch: PromotionPatch,
    now: DateTime<Utc>,
) -> ServiceResult<PromotionPatch> {
    if let Some(ignored) = patch.status.take() {
        debug!(slug = %current.slug, status = %ignored, "dropping status from full edit");
    }
    if patch.is_empty() {
        return Err(ServiceError::ValidationError(
            "edit does not change any field".to_string(),
        ));
    }

    if let Some(title) = &patch.title {
        if patch.slug.is_none() && title.trim() != current.title {
            let slug = slugify(title);
            if slug != current.slug {
                patch.slug = Some(slug);
            }
        }
    }

    let merged = patch.apply_to(current);
    validate_record(&merged, current)?;

    let status: PromotionStatus = derive_for(&merged, now).into();
    if status != current.status {
        debug!(
            slug = %current.slug,
            from = %current.status,
            to = %status,
            "edit recomputes persisted status"
        );
    }
    patch.status = Some(status);
    Ok(patch)
}

/// `active` becomes `expired`; anything else becomes `active`.
pub fn toggled_status(current: &PromotionStatus) -> PromotionStatus {
    if current.is_active() {
        PromotionStatus::Expired
    } else {
        PromotionStatus::Active
    }
}

pub fn prepare_toggle(current: &Promotion) -> PromotionPatch {
    PromotionPatch::status_only(toggled_status(&current.status))
}

/// The persisted status after a redemption. Redemptions never touch it.
pub fn status_after_redemption(current: &Promotion) -> PromotionStatus {
    current.status.clone()
}

pub fn drift(promotion: &Promotion, now: DateTime<Utc>) -> Option<StatusDrift> {
    let derived = assess_promotion(promotion, now);
    if promotion.status.matches(derived.status) {
        None
    } else {
        Some(StatusDrift {
            persisted: promotion.status.clone(),
            derived,
        })
    }
}

/// Status-only update bringing the persisted status in line, if it drifted.
pub fn prepare_resync(promotion: &Promotion, now: DateTime<Utc>) -> Option<PromotionPatch> {
    drift(promotion, now)
        .map(|drift| PromotionPatch::status_only(PromotionStatus::from(drift.derived.status)))
}

/// Rejects a code already used by another known promotion.
pub fn ensure_code_available<'a, I>(
    code: &str,
    known: I,
    editing_slug: Option<&str>,
) -> ServiceResult<()>
where
    I: IntoIterator<Item = &'a Promotion>,
{
    let wanted = normalize_code(code);
    let clash = known
        .into_iter()
        .filter(|p| Some(p.slug.as_str()) != editing_slug)
        .find(|p| p.normalized_code() == wanted);

    match clash {
        Some(existing) => Err(ServiceError::conflict(
            ConflictField::Code,
            format!(
                "code '{}' is already used by promotion '{}'",
                code.trim(),
                existing.slug
            ),
        )),
        None => Ok(()),
    }
}

fn validate_record(merged: &Promotion, current: &Promotion) -> ServiceResult<()> {
    let mut errors = ValidationErrors::new();

    if let Err(err) = validate_required_text(&merged.title) {
        errors.add("title", err);
    }
    if merged.slug.is_empty() {
        errors.add(
            "title",
            error_with_message(
                "slug_empty",
                "Title must contain at least one letter or digit",
            ),
        );
    }
    if let Err(err) = validate_required_text(&merged.code) {
        errors.add("code", err);
    }
    if let Err(err) = validate_window(merged.start_date, merged.end_date) {
        errors.add("end_date", err);
    }
    if let Err(err) = validate_discount(merged.discount_type, &merged.discount_value) {
        errors.add("discount_value", err);
    }
    if let Err(err) = validate_max_usage(merged.max_usage) {
        errors.add("max_usage", err);
    } else if merged.max_usage != current.max_usage || merged.current_usage != current.current_usage
    {
        if let Err(err) = usage::check_usage_within(merged.current_usage, merged.max_usage) {
            errors.add("max_usage", err);
        }
    }

    if errors.errors().is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidFields(errors))
    }
}
