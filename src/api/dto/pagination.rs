use serde::Serialize;

use crate::domain::pagination::Page;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl PaginationMeta {
    pub fn of<T>(page: &Page<T>) -> Self {
        Self {
            current_page: page.request.page(),
            limit: page.request.limit(),
            total: page.total,
            total_pages: page.total_pages(),
            has_more: page.has_more(),
        }
    }
}
