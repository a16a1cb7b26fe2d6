use critter_types::{
    parse_filter, Error, FilterValue, PageSizeBounds, QuerySpec, SortOrder, SortSpec,
    DEFAULT_PAGE_SIZE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ── Construction ────────────────────────────────────────────────

#[test]
fn default_spec_is_first_page_unfiltered() {
    let spec = QuerySpec::default();
    assert!(spec.filters.is_empty());
    assert!(spec.sort.is_none());
    assert_eq!(spec.page, 1);
    assert_eq!(spec.page_size, DEFAULT_PAGE_SIZE);
}

#[test]
fn builders_compose() {
    let spec = QuerySpec::new()
        .with_filter("is_alive", true)
        .with_filter("species", "glimmerfox")
        .with_sort(SortSpec::desc("level"))
        .with_page(2)
        .with_page_size(50);

    assert_eq!(spec.filters.get("is_alive"), Some(&FilterValue::Bool(true)));
    assert_eq!(
        spec.filters.get("species"),
        Some(&FilterValue::Text("glimmerfox".into()))
    );
    assert_eq!(spec.sort, Some(SortSpec::desc("level")));
    assert_eq!(spec.page, 2);
    assert_eq!(spec.page_size, 50);

    let spec = spec.without_filter("species");
    assert!(!spec.filters.contains_key("species"));
}

// ── Page reset ──────────────────────────────────────────────────

#[test]
fn filter_change_resets_page_keeps_size_and_sort() {
    let previous = QuerySpec::new()
        .with_filter("is_alive", true)
        .with_sort(SortSpec::asc("name"))
        .with_page(3)
        .with_page_size(25);

    let requested = previous.clone().with_filter("is_alive", false);
    let stored = QuerySpec::reconcile(&previous, requested);

    assert_eq!(stored.page, 1);
    assert_eq!(stored.page_size, 25);
    assert_eq!(stored.filters.get("is_alive"), Some(&FilterValue::Bool(false)));
    assert_eq!(stored.sort, Some(SortSpec::asc("name")));
}

#[test]
fn explicit_page_is_overridden_when_sort_changes() {
    let previous = QuerySpec::new().with_page(4);
    let requested = QuerySpec::new()
        .with_sort(SortSpec::desc("name"))
        .with_page(7);

    assert_eq!(QuerySpec::reconcile(&previous, requested).page, 1);
}

#[test]
fn page_size_change_resets_page() {
    let previous = QuerySpec::new().with_page(5).with_page_size(20);
    let requested = previous.clone().with_page_size(50);
    assert_eq!(QuerySpec::reconcile(&previous, requested).page, 1);
}

#[test]
fn page_only_change_is_kept() {
    let previous = QuerySpec::new().with_filter("is_alive", true).with_page(1);
    let requested = previous.clone().with_page(6);
    assert_eq!(QuerySpec::reconcile(&previous, requested).page, 6);
}

#[test]
fn page_zero_is_normalized() {
    let previous = QuerySpec::new();
    let requested = QuerySpec::new().with_page(0);
    assert_eq!(QuerySpec::reconcile(&previous, requested).page, 1);
}

#[test]
fn differs_beyond_page_ignores_page() {
    let a = QuerySpec::new().with_page(1);
    let b = QuerySpec::new().with_page(9);
    assert!(!a.differs_beyond_page(&b));
    assert_ne!(a, b);
}

// ── Query pairs ─────────────────────────────────────────────────

#[test]
fn query_pairs_include_sort_and_filters() {
    let spec = QuerySpec::new()
        .with_filter("is_alive", true)
        .with_filter("level", 3i64)
        .with_sort(SortSpec::desc("name"))
        .with_page(2)
        .with_page_size(10);

    let pairs = spec.to_query_pairs();
    let lookup = |k: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == k)
            .map(|(_, v)| v.as_str())
    };

    assert_eq!(lookup("page"), Some("2"));
    assert_eq!(lookup("pageSize"), Some("10"));
    assert_eq!(lookup("sort"), Some("name"));
    assert_eq!(lookup("order"), Some("desc"));
    assert_eq!(lookup("is_alive"), Some("true"));
    assert_eq!(lookup("level"), Some("3"));
}

#[test]
fn query_pairs_without_sort() {
    let pairs = QuerySpec::new().to_query_pairs();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.iter().all(|(k, _)| k != "sort" && k != "order"));
}

// ── Sort / filter parsing ───────────────────────────────────────

#[test]
fn sort_spec_parse() {
    assert_eq!(SortSpec::parse("name").unwrap(), SortSpec::asc("name"));
    assert_eq!(SortSpec::parse("level:desc").unwrap(), SortSpec::desc("level"));
    assert_eq!(SortSpec::parse("level:ASC").unwrap().order, SortOrder::Asc);
    assert!(SortSpec::parse(":desc").is_err());
    assert!(SortSpec::parse("name:sideways").is_err());
}

#[test]
fn filter_value_parse_picks_narrowest() {
    assert_eq!(FilterValue::parse("true"), FilterValue::Bool(true));
    assert_eq!(FilterValue::parse("false"), FilterValue::Bool(false));
    assert_eq!(FilterValue::parse("-12"), FilterValue::Int(-12));
    assert_eq!(
        FilterValue::parse("mossback"),
        FilterValue::Text("mossback".into())
    );
}

#[test]
fn filter_argument_parse() {
    assert_eq!(
        parse_filter("isAlive=true").unwrap(),
        ("isAlive".to_string(), FilterValue::Bool(true))
    );
    assert_eq!(
        parse_filter(" species = glimmer fox ").unwrap(),
        ("species".to_string(), FilterValue::Text("glimmer fox".into()))
    );
    assert!(matches!(parse_filter("isAlive"), Err(Error::InvalidFilter(_))));
    assert!(matches!(parse_filter("=3"), Err(Error::InvalidFilter(_))));
}

#[test]
fn filter_value_serde_is_untagged() {
    let json = serde_json::to_string(&FilterValue::Bool(true)).unwrap();
    assert_eq!(json, "true");
    let back: FilterValue = serde_json::from_str("42").unwrap();
    assert_eq!(back, FilterValue::Int(42));
}

#[test]
fn spec_deserializes_from_camel_case() {
    let spec: QuerySpec =
        serde_json::from_str(r#"{"page":3,"pageSize":25,"filters":{"is_alive":true}}"#).unwrap();
    assert_eq!(spec.page, 3);
    assert_eq!(spec.page_size, 25);
    assert_eq!(spec.filters.get("is_alive"), Some(&FilterValue::Bool(true)));
    assert!(spec.sort.is_none());
}

// ── Page size bounds ────────────────────────────────────────────

#[test]
fn page_size_bounds_default() {
    let bounds = PageSizeBounds::default();
    assert_eq!(bounds.min, 10);
    assert_eq!(bounds.max, 100);
    assert!(bounds.contains(10));
    assert!(bounds.contains(100));
    assert!(!bounds.contains(9));
    assert!(!bounds.contains(101));
    assert_eq!(bounds.clamp(0), 10);
    assert_eq!(bounds.clamp(500), 100);
    assert_eq!(bounds.clamp(42), 42);
}

#[test]
fn inverted_bounds_are_read_swapped() {
    let bounds = PageSizeBounds { min: 100, max: 10 };
    assert_eq!(bounds.clamp(500), 100);
    assert_eq!(bounds.clamp(1), 10);
    assert_eq!(bounds.clamp(42), 42);
    assert!(bounds.contains(50));
    assert!(!bounds.contains(101));
}

// ── Properties ──────────────────────────────────────────────────

fn spec_strategy() -> impl Strategy<Value = QuerySpec> {
    (
        prop::option::of(any::<bool>()),
        prop::option::of(prop::sample::select(vec!["name", "level", "species"])),
        any::<bool>(),
        0u32..50,
        prop::sample::select(vec![10u32, 20, 25, 50, 100]),
    )
        .prop_map(|(alive, sort_field, desc, page, page_size)| {
            let mut spec = QuerySpec::new().with_page(page).with_page_size(page_size);
            if let Some(alive) = alive {
                spec = spec.with_filter("is_alive", alive);
            }
            if let Some(field) = sort_field {
                spec = spec.with_sort(if desc {
                    SortSpec::desc(field)
                } else {
                    SortSpec::asc(field)
                });
            }
            spec
        })
}

proptest! {
    /// Any change outside the page number lands on page 1.
    #[test]
    fn reconcile_resets_page_on_any_non_page_change(
        previous in spec_strategy(),
        requested in spec_strategy(),
    ) {
        let stored = QuerySpec::reconcile(&previous, requested.clone());
        if requested.differs_beyond_page(&previous) {
            prop_assert_eq!(stored.page, 1);
        }
        prop_assert!(stored.page >= 1);
        prop_assert_eq!(&stored.filters, &requested.filters);
        prop_assert_eq!(&stored.sort, &requested.sort);
        prop_assert_eq!(stored.page_size, requested.page_size);
    }

    /// A pure page change is honoured as given.
    #[test]
    fn reconcile_keeps_pure_page_change(previous in spec_strategy(), page in 1u32..500) {
        let requested = previous.clone().with_page(page);
        prop_assert_eq!(QuerySpec::reconcile(&previous, requested).page, page);
    }
}
