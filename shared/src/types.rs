//! Common types used across the system

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    /// Clamp to sane bounds: page >= 1, 1 <= per_page <= max_per_page
    pub fn clamped(self, max_per_page: u32) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, max_per_page.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total_items: u64) -> Self {
        let per_page = u64::from(pagination.per_page.max(1));
        Self {
            page: pagination.page,
            per_page: pagination.per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page) as u32,
        }
    }
}
