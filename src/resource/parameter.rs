//! Request parameters: paging, search, filters, local filters and sorts.

use serde::{Deserialize, Serialize};

/// One request's listing parameters.
///
/// `local_filters` are never decoded from request input; trusted code appends them
/// (e.g. `company_id eq 42` for tenant scoping).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub limit: usize,
    /// 1-based.
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub search: String,
    /// `field operator value...`, e.g. `name eq foo`, `count in (1 2 3)`.
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default, skip_deserializing)]
    pub local_filters: Vec<String>,
    /// `field direction`, e.g. `created_on desc`.
    #[serde(default, alias = "sort")]
    pub sorts: Vec<String>,
}

#[derive(Serialize)]
struct PageQuery<'a> {
    limit: usize,
    page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
}

impl Parameter {
    pub fn new(limit: usize, page: usize) -> Self {
        Parameter {
            limit,
            page,
            ..Parameter::default()
        }
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn local_filter(mut self, filter: impl Into<String>) -> Self {
        self.local_filters.push(filter.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sorts.push(sort.into());
        self
    }

    /// Query string for paging links: `?limit=..&page=..[&search=..]`.
    pub fn uri(&self) -> String {
        let query = PageQuery {
            limit: self.limit,
            page: self.page,
            search: (!self.search.is_empty()).then_some(self.search.as_str()),
        };
        format!("?{}", serde_urlencoded::to_string(&query).unwrap_or_default())
    }
}
