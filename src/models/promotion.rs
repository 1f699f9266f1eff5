use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use validator::{Validate, ValidationErrors};

use super::validation::{validate_discount, validate_required_text, validate_window};
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    FreeItem,
}

/// Status computed from dates and usage counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DerivedStatus {
    Active,
    Inactive,
    Expired,
}

/// Two-way grouping used for counting, filtering and colour coding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusBucket {
    Active,
    Expired,
}

/// Status value stored on the record.
///
/// Unknown values coming back from the backend are kept verbatim so that a
/// round trip never rewrites them; they bucket as expired.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PromotionStatus {
    Active,
    Inactive,
    Expired,
    Unrecognized(String),
}

impl PromotionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Only the literal `active` counts as active.
    pub fn bucket(&self) -> StatusBucket {
        match self {
            Self::Active => StatusBucket::Active,
            _ => StatusBucket::Expired,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn matches(&self, derived: DerivedStatus) -> bool {
        *self == PromotionStatus::from(derived)
    }
}

impl From<String> for PromotionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "expired" => Self::Expired,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<&str> for PromotionStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<PromotionStatus> for String {
    fn from(status: PromotionStatus) -> Self {
        match status {
            PromotionStatus::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl From<DerivedStatus> for PromotionStatus {
    fn from(status: DerivedStatus) -> Self {
        match status {
            DerivedStatus::Active => Self::Active,
            DerivedStatus::Inactive => Self::Inactive,
            DerivedStatus::Expired => Self::Expired,
        }
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentBlockKind {
    Text,
    ProgramInfo,
    Combo,
    Note,
    Conditions,
}

/// A typed rendering block. The payload is opaque to the status logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: ContentBlockKind,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_usage: u32,
    #[serde(default)]
    pub current_usage: u32,
    pub status: PromotionStatus,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Promotion {
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.normalized_code() == normalize_code(code)
    }
}

/// What an administrator fills in to create a promotion.
///
/// Slug and status are not part of the draft: both are computed when the
/// draft is turned into a [`PromotionInput`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDraft {
    #[validate(custom = "validate_required_text")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[validate(custom = "validate_required_text")]
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "Maximum usage must be at least 1"))]
    pub max_usage: u32,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl PromotionDraft {
    /// Runs the derived field rules plus the cross-field ones.
    pub fn check(&self) -> Result<(), ServiceError> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Err(err) = validate_window(self.start_date, self.end_date) {
            errors.add("end_date", err);
        }
        if let Err(err) = validate_discount(self.discount_type, &self.discount_value) {
            errors.add("discount_value", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidFields(errors))
        }
    }
}

/// Body of `POST /promotions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionInput {
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub code: String,
    pub discount_type: DiscountType,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_usage: u32,
    pub status: PromotionStatus,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Body of `PUT /promotions/{slug}`: only the fields being changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub discount_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_usage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PromotionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentBlock>>,
}

impl PromotionPatch {
    pub fn status_only(status: PromotionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The record as it would look with this patch applied.
    pub fn apply_to(&self, current: &Promotion) -> Promotion {
        let mut merged = current.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            merged.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }
        if let Some(image) = &self.image {
            merged.image = Some(image.clone());
        }
        if let Some(code) = &self.code {
            merged.code = code.clone();
        }
        if let Some(discount_type) = self.discount_type {
            merged.discount_type = discount_type;
        }
        if let Some(discount_value) = self.discount_value {
            merged.discount_value = discount_value;
        }
        if let Some(start_date) = self.start_date {
            merged.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            merged.end_date = end_date;
        }
        if let Some(max_usage) = self.max_usage {
            merged.max_usage = max_usage;
        }
        if let Some(current_usage) = self.current_usage {
            merged.current_usage = current_usage;
        }
        if let Some(status) = &self.status {
            merged.status = status.clone();
        }
        if let Some(content) = &self.content {
            merged.content = content.clone();
        }
        merged
    }
}

/// Codes compare trimmed and lower-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Lower-cases the title, strips everything that is neither alphanumeric nor
/// whitespace, then joins the remaining words with hyphens. Letters outside
/// ASCII are kept.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}
