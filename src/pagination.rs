//! Offset-based pagination for recommendation pages.

use serde::Deserialize;

/// Query parameters selecting a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageParams {
    /// The zero-based page number.
    pub page: usize,
    /// The number of items per page.
    pub size: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 0, size: 12 }
    }
}

/// Take the page of `items` selected by `params`.
///
/// Returns the items on the page and whether further pages exist. A page
/// starting past the end of `items` is empty rather than an error, and a
/// `page * size` that does not fit in a `usize` counts as past the end.
pub fn paginate<T: Clone>(items: &[T], params: PageParams) -> (Vec<T>, bool) {
    let Some(start) = params.page.checked_mul(params.size) else {
        return (Vec::new(), false);
    };
    let end = start.saturating_add(params.size).min(items.len());

    let page = if start < items.len() {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    (page, end < items.len())
}
