//! Response envelopes.
//!
//! Every endpoint answers `{success, message?, data?}`; list endpoints add
//! pagination totals alongside `data`.

use serde::Serialize;
use store::Page;

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success with data only.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Success with a human message and data.
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Success envelope for paginated lists.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub success: bool,
    /// Number of items on this page.
    pub count: usize,
    /// Number of items across all pages.
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub data: Vec<T>,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Maps a store page into the envelope.
    pub fn from_page<U>(page: Page<U>, map: impl Fn(U) -> T) -> Self {
        let data: Vec<T> = page.items.into_iter().map(map).collect();
        Self {
            success: true,
            count: data.len(),
            total: page.total,
            page: page.page,
            pages: page.pages,
            data,
        }
    }
}
