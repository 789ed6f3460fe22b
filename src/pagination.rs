use axum::http::Uri;
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: i64 = 30;
const MAX_PAGE_SIZE: i64 = 100;

/// Page-number pagination parameters. `page_size` is clamped to 100 no
/// matter what the caller asks for.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn number(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.number() - 1) * self.size()
    }
}

/// Response envelope: total row count, next/previous links, one page of rows.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(uri: &Uri, query: &PageQuery, count: i64, results: Vec<T>) -> Self {
        let page = query.number();
        let size = query.size();
        let has_next = page * size < count;
        let has_previous = page > 1;
        Self {
            count,
            next: has_next.then(|| link_with_page(uri, page + 1)),
            previous: has_previous.then(|| link_with_page(uri, page - 1)),
            results,
        }
    }
}

/// Rebuild the request path and query string with `page` replaced, keeping
/// every other query parameter intact.
fn link_with_page(uri: &Uri, page: i64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page=") && *p != "page")
        .map(|p| p.to_string())
        .collect();
    params.push(format!("page={page}"));
    format!("{}?{}", uri.path(), params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<i64>, page_size: Option<i64>) -> PageQuery {
        PageQuery { page, page_size }
    }

    #[test]
    fn page_size_defaults_to_30() {
        assert_eq!(query(None, None).size(), 30);
    }

    #[test]
    fn page_size_is_clamped_at_100() {
        assert_eq!(query(None, Some(500)).size(), 100);
        assert_eq!(query(None, Some(100)).size(), 100);
        assert_eq!(query(None, Some(0)).size(), 1);
    }

    #[test]
    fn offset_follows_page_number() {
        assert_eq!(query(Some(3), Some(10)).offset(), 20);
        assert_eq!(query(None, None).offset(), 0);
    }

    #[test]
    fn envelope_links_preserve_other_params() {
        let uri: Uri = "/api/food_logs?meal_type=lunch&page=2&page_size=10"
            .parse()
            .unwrap();
        let page = Page::new(&uri, &query(Some(2), Some(10)), 35, vec![0u8; 10]);
        assert_eq!(page.count, 35);
        assert_eq!(
            page.next.as_deref(),
            Some("/api/food_logs?meal_type=lunch&page_size=10&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("/api/food_logs?meal_type=lunch&page_size=10&page=1")
        );
    }

    #[test]
    fn envelope_omits_links_at_bounds() {
        let uri: Uri = "/api/food_logs".parse().unwrap();
        let page = Page::new(&uri, &query(Some(1), Some(30)), 20, vec![0u8; 20]);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
