//! Query specifications: filters, sort and pagination for one fetch.
//!
//! A [`QuerySpec`] is an immutable value owned by the caller (a view, a
//! deep link) and pushed into a sync engine. The engine never edits it
//! beyond applying [`QuerySpec::reconcile`].

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Page size used when the caller has not chosen one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Required value for a filtered attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FilterValue {
    /// Interprets raw text (a URL parameter, a CLI flag) as the narrowest
    /// matching value: boolean, then integer, then text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Int)
                .unwrap_or_else(|_| Self::Text(raw.to_string())),
        }
    }

    /// Returns the boolean value, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Parses a `key=value` filter argument.
pub fn parse_filter(input: &str) -> Result<(String, FilterValue), Error> {
    let Some((key, value)) = input.split_once('=') else {
        return Err(Error::InvalidFilter(format!("expected key=value, got {input:?}")));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::InvalidFilter("filter key must not be empty".into()));
    }
    Ok((key.to_string(), FilterValue::parse(value.trim())))
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Attribute name → required value. An absent key is unconstrained.
pub type Filters = BTreeMap<String, FilterValue>;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Wire form used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::InvalidSort(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Field plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    /// Ascending sort on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending sort on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    /// Parses `field` or `field:order` (e.g. `name:desc`).
    pub fn parse(input: &str) -> Result<Self, Error> {
        let (field, order) = match input.split_once(':') {
            Some((field, order)) => (field, order.parse()?),
            None => (input, SortOrder::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::InvalidSort("sort field must not be empty".into()));
        }
        Ok(Self {
            field: field.to_string(),
            order,
        })
    }
}

/// Inclusive bounds for an acceptable page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizeBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for PageSizeBounds {
    fn default() -> Self {
        Self { min: 10, max: 100 }
    }
}

impl PageSizeBounds {
    /// Returns true if `size` lies within the bounds.
    pub fn contains(&self, size: u32) -> bool {
        let (min, max) = self.ordered();
        (min..=max).contains(&size)
    }

    /// Pulls `size` into the bounds.
    pub fn clamp(&self, size: u32) -> u32 {
        let (min, max) = self.ordered();
        size.clamp(min, max)
    }

    /// Inverted bounds are read with their ends swapped.
    fn ordered(&self) -> (u32, u32) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }
}

/// Filters + sort + pagination describing what to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    /// 1-indexed page number.
    pub page: u32,
    pub page_size: u32,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            filters: Filters::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QuerySpec {
    /// Creates the default spec: unfiltered, unsorted, first page.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn without_filter(mut self, key: &str) -> Self {
        self.filters.remove(key);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns true if filters, sort or page size differ from `other`.
    /// The page number is not compared.
    pub fn differs_beyond_page(&self, other: &QuerySpec) -> bool {
        self.filters != other.filters
            || self.sort != other.sort
            || self.page_size != other.page_size
    }

    /// Computes the spec to store when `requested` replaces `previous`.
    ///
    /// Whenever filters, sort or page size change, the page is forced back
    /// to 1, even if the caller asked for a different page. A page of 0 is
    /// treated as 1.
    pub fn reconcile(previous: &QuerySpec, requested: QuerySpec) -> QuerySpec {
        let mut next = requested;
        if next.page == 0 || next.differs_beyond_page(previous) {
            next.page = 1;
        }
        next
    }

    /// Flattens the spec into HTTP query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.field.clone()));
            pairs.push(("order".to_string(), sort.order.as_str().to_string()));
        }
        for (key, value) in &self.filters {
            pairs.push((key.clone(), value.to_string()));
        }
        pairs
    }
}
