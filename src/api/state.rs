//! Shared application state

use std::sync::Arc;

use crate::config::Config;
use crate::domain::PageRequest;
use crate::storage::Storage;

/// Page size defaults applied to list requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl PagingConfig {
    /// Build a page request, filling in and clamping the page size.
    pub fn request(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        let size = page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1));
        PageRequest::new(page.unwrap_or(0), size)
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

impl From<&Config> for PagingConfig {
    fn from(config: &Config) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

/// State handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, paging: PagingConfig) -> Self {
        Self { storage, paging }
    }
}
