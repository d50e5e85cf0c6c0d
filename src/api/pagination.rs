use serde::Serialize;

use crate::config::ApiConfig;

/// Resolved `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Missing or unparseable values fall back to page 1 and the configured
    /// default size; `limit` is clamped to the configured maximum and `page`
    /// to the last one whose offset still fits in an i64.
    pub fn resolve(page: Option<&str>, limit: Option<&str>, api: &ApiConfig) -> Self {
        let limit = limit
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(api.default_page_size)
            .min(api.max_page_size)
            .max(1);
        let page = page
            .and_then(|p| p.parse::<i64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
            .min(i64::MAX / limit);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, request: PageRequest) -> Self {
        let pages = if total == 0 { 0 } else { (total + request.limit - 1) / request.limit };
        Self {
            total,
            page: request.page,
            limit: request.limit,
            pages,
        }
    }
}
