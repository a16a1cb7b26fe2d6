//! Building blocks of the `critter-dash` binary: configuration loading,
//! command-line query parsing and plain-text rendering.

pub mod config;
pub mod render;

use anyhow::{Context, Result};
use critter_types::{parse_filter, QuerySpec, SortSpec};

pub use config::DashConfig;

/// Builds the initial query from `watch` arguments.
pub fn build_query(
    filters: &[String],
    sort: Option<&str>,
    page: Option<u32>,
    page_size: u32,
) -> Result<QuerySpec> {
    let mut query = QuerySpec::new().with_page_size(page_size);
    for raw in filters {
        let (key, value) = parse_filter(raw).with_context(|| format!("bad --filter {raw:?}"))?;
        query = query.with_filter(key, value);
    }
    if let Some(sort) = sort {
        query = query.with_sort(SortSpec::parse(sort).with_context(|| format!("bad --sort {sort:?}"))?);
    }
    if let Some(page) = page {
        query = query.with_page(page.max(1));
    }
    Ok(query)
}
