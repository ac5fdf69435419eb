// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for provider list operations.
//!
//! Provider list endpoints return results in numbered pages. Callers must never
//! act on a partial listing, so a list call either aggregates every page or fails.

use crate::constants::MAX_LIST_PAGES;
use crate::errors::{Service, SyncError};
use std::future::Future;
use tracing::debug;

/// One page of a listing, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based index of this page
    pub page: u32,
    /// Total number of pages the listing spans
    pub total_pages: u32,
}

/// Fetch every page of a listing, starting at page 1.
///
/// `fetch_page` is called with successive 1-based page numbers until the
/// provider reports the last page (or returns an empty page).
///
/// # Errors
///
/// Returns the first page error, or a non-retryable error when the listing
/// exceeds [`MAX_LIST_PAGES`] pages.
pub async fn list_all_pages<T, F, Fut>(
    service: Service,
    mut fetch_page: F,
) -> Result<Vec<T>, SyncError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, SyncError>>,
{
    let mut all_items = Vec::new();
    let mut page_number = 1;

    loop {
        let page = fetch_page(page_number).await?;

        let item_count = page.items.len();
        all_items.extend(page.items);

        debug!(
            page = page_number,
            items_in_page = item_count,
            total_items = all_items.len(),
            total_pages = page.total_pages,
            "Fetched page from provider API"
        );

        if item_count == 0 || page.page >= page.total_pages {
            break;
        }

        if page_number >= MAX_LIST_PAGES {
            return Err(SyncError::malformed(
                service,
                format!("listing exceeded {MAX_LIST_PAGES} pages"),
            ));
        }
        page_number += 1;
    }

    debug!(
        total_pages = page_number,
        total_items = all_items.len(),
        "Completed paginated list operation"
    );

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
