use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::promotion::Promotion;
use crate::errors::ServiceError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort key in the backend's `field` / `-field` notation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn newest_first() -> Self {
        Self {
            field: "createdAt".to_string(),
            descending: true,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::newest_first()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

impl FromStr for SortKey {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ServiceError::ValidationError(format!(
                "invalid sort key '{}'",
                raw
            )));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl TryFrom<String> for SortKey {
    type Error = ServiceError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: SortKey,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortKey::newest_first(),
        }
    }
}

impl ListQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Default::default()
        }
    }

    pub fn ensure_valid(&self, max_page_size: u32) -> Result<(), ServiceError> {
        if self.page == 0 {
            return Err(ServiceError::ValidationError(
                "page numbers start at 1".to_string(),
            ));
        }
        if self.limit == 0 || self.limit > max_page_size {
            return Err(ServiceError::ValidationError(format!(
                "page size must be between 1 and {}",
                max_page_size
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(alias = "page")]
    pub current_page: u32,
    pub total_pages: u32,
    #[serde(alias = "total")]
    pub total_items: u64,
    #[serde(alias = "limit")]
    pub page_size: u32,
}

impl Pagination {
    pub fn for_total(current_page: u32, page_size: u32, total_items: u64) -> Self {
        let size = u64::from(page_size.max(1));
        let total_pages = total_items.div_ceil(size);
        Self {
            current_page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            total_items,
            page_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromotionPage {
    pub items: Vec<Promotion>,
    pub pagination: Pagination,
}
