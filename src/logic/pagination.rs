use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};

pub const DEFAULT_PAGE_NUMBER: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A validated `(pageNumber, pageSize)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: i64,
    page_size: i64,
}

/// Where a page starts and how many pages the collection spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageRequest {
    pub fn new(page_number: i64, page_size: i64) -> FleetResult<Self> {
        if page_number < 1 || page_size < 1 || page_size > MAX_PAGE_SIZE {
            return Err(FleetError::InvalidPagination(format!(
                "Invalid pagination parameters: pageNumber must be >= 1 and pageSize between 1 and {} (got pageNumber={}, pageSize={})",
                MAX_PAGE_SIZE, page_number, page_size
            )));
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> i64 {
        self.page_number
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Offset of the first row of this page. Pages past the end are allowed
    /// and simply select nothing.
    pub fn offset(&self) -> FleetResult<i64> {
        (self.page_number - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| {
                FleetError::InvalidPagination(format!(
                    "pageNumber {} is out of range",
                    self.page_number
                ))
            })
    }

    pub fn window(&self, total_count: i64) -> FleetResult<PageWindow> {
        Ok(PageWindow {
            offset: self.offset()?,
            limit: self.page_size,
            total_pages: total_pages(total_count, self.page_size),
        })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `ceil(total_count / page_size)`, zero for an empty collection.
pub fn total_pages(total_count: i64, page_size: i64) -> i64 {
    if total_count <= 0 || page_size <= 0 {
        return 0;
    }
    (total_count + page_size - 1) / page_size
}

/// Validates the page parameters and computes the window over `total_count` rows.
pub fn paginate(total_count: i64, page_number: i64, page_size: i64) -> FleetResult<PageWindow> {
    PageRequest::new(page_number, page_size)?.window(total_count)
}

/// Navigation links of one page of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// Builds the link set for `page_number` out of `total_pages`. Every link
/// reuses `path` and `query`, only `pageNumber` is substituted.
pub fn navigation_links(
    path: &str,
    query: Option<&str>,
    page_number: i64,
    total_pages: i64,
) -> NavigationLinks {
    let link = |page: i64| page_url(path, query, page);
    let has_previous = page_number > 1;

    NavigationLinks {
        self_link: link(page_number),
        first: has_previous.then(|| link(1)),
        prev: has_previous.then(|| link(page_number - 1)),
        next: (page_number < total_pages).then(|| link(page_number + 1)),
        last: (total_pages > 0).then(|| link(total_pages)),
    }
}

fn page_url(path: &str, query: Option<&str>, page_number: i64) -> String {
    let page_param = format!("pageNumber={}", page_number);
    let mut params: Vec<String> = Vec::new();
    let mut replaced = false;

    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let key = pair.split('=').next().unwrap_or_default();
        if key == "pageNumber" {
            if !replaced {
                params.push(page_param.clone());
                replaced = true;
            }
        } else {
            params.push(pair.to_string());
        }
    }
    if !replaced {
        params.push(page_param);
    }

    format!("{}?{}", path, params.join("&"))
}
