//! Filter / sort / paginate parameters shared by the list endpoints.
//!
//! Query-string values are untrusted. Sort keys are resolved against a
//! per-endpoint whitelist of SQL expressions, so only known column names
//! ever reach a query.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Common list query parameters: `?search=&sort=&order=&page=&per_page=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Sortable columns for one endpoint: (public key, SQL expression).
pub struct SortSpec {
    pub columns: &'static [(&'static str, &'static str)],
    pub default_key: &'static str,
}

impl SortSpec {
    /// Resolve the requested key to its SQL expression.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&'static str, String> {
        let key = requested
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.default_key);
        self.columns
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, expr)| *expr)
            .ok_or_else(|| {
                let allowed: Vec<&str> = self.columns.iter().map(|(name, _)| *name).collect();
                format!("Unknown sort key '{}', expected one of: {}", key, allowed.join(", "))
            })
    }
}

impl ListParams {
    /// 1-based page, never below 1.
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn per_page(&self) -> i64 {
        match self.per_page {
            Some(n) if n >= 1 => n.min(MAX_PER_PAGE),
            _ => DEFAULT_PER_PAGE,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    /// ILIKE pattern for the search term, or `None` when blank.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern)
    }
}

/// Wrap `term` in `%` after escaping LIKE metacharacters.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// One page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let per_page = params.per_page();
        Self {
            items,
            total,
            page: params.page(),
            per_page,
            total_pages: (total + per_page - 1) / per_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: SortSpec = SortSpec {
        columns: &[("name", "r.name"), ("created_at", "r.created_at")],
        default_key: "name",
    };

    #[test]
    fn page_and_per_page_are_clamped() {
        let params = ListParams {
            page: Some(0),
            per_page: Some(5_000),
            ..Default::default()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);
        assert_eq!(params.offset(), 0);

        let params = ListParams {
            page: Some(3),
            per_page: Some(-1),
            ..Default::default()
        };
        assert_eq!(params.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn sort_keys_resolve_through_whitelist() {
        assert_eq!(SPEC.resolve(None), Ok("r.name"));
        assert_eq!(SPEC.resolve(Some("  ")), Ok("r.name"));
        assert_eq!(SPEC.resolve(Some("created_at")), Ok("r.created_at"));
        let err = SPEC.resolve(Some("name; DROP TABLE rubros")).unwrap_err();
        assert!(err.contains("expected one of: name, created_at"));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        let blank = ListParams {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.search_pattern(), None);
        let params = ListParams {
            search: Some(" acme ".into()),
            ..Default::default()
        };
        assert_eq!(params.search_pattern().as_deref(), Some("%acme%"));
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = ListParams {
            per_page: Some(10),
            ..Default::default()
        };
        assert_eq!(Page::new(Vec::<u8>::new(), 0, &params).total_pages, 0);
        assert_eq!(Page::new(Vec::<u8>::new(), 10, &params).total_pages, 1);
        assert_eq!(Page::new(Vec::<u8>::new(), 11, &params).total_pages, 2);
    }

    #[test]
    fn order_parses_from_query_values() {
        let params: ListParams = serde_json::from_str(r#"{"order":"desc"}"#).unwrap();
        assert_eq!(params.order, SortOrder::Desc);
        assert_eq!(params.order.as_sql(), "DESC");
        assert_eq!(ListParams::default().order, SortOrder::Asc);
    }
}
