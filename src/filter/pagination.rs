use serde::Deserialize;

/// Raw `limit`/`offset` query parameters. Kept as strings so malformed
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageParams {
    pub fn page(&self, max_limit: i64) -> Page {
        Page::from_params(self.limit.as_deref(), self.offset.as_deref(), max_limit)
    }
}

/// A window into a list: at most `limit` rows after skipping `skip`.
///
/// `offset` is a page index, so `skip = limit * offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub skip: i64,
}

impl Page {
    pub fn first(limit: i64) -> Self {
        Self { limit, skip: 0 }
    }

    pub fn from_params(limit: Option<&str>, offset: Option<&str>, max_limit: i64) -> Self {
        let requested = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0);

        let Some(requested) = requested else {
            // No usable limit: no paging, only the server-wide cap
            return Self::first(max_limit);
        };

        let limit = requested.min(max_limit);
        let page_index = offset
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or(0);

        Self {
            limit,
            skip: limit.saturating_mul(page_index),
        }
    }

    /// Apply the window to an in-memory sequence.
    pub fn apply<I: Iterator>(&self, iter: I) -> impl Iterator<Item = I::Item> {
        iter.skip(self.skip as usize).take(self.limit as usize)
    }
}
