use chrono::{DateTime, TimeZone, Utc};
use critter_sync::source::mock::ScriptedSource;
use critter_sync::{
    ClientFilteredSource, EngineStats, ResourcePage, ResourceSource, SyncConfig, SyncEngine,
    SyncError,
};
use critter_types::{
    AccessKey, Creature, CreatureId, CreatureSummary, Creatures, FetchResponse, FilterValue,
    IdentityState, Pagination, Profile, QuerySpec,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tokio::sync::watch;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn creature(name: &str, breeding: bool) -> Creature {
    Creature {
        id: CreatureId::new(),
        name: name.into(),
        species: "glimmerfox".into(),
        is_alive: true,
        level: 3,
        breeding_ends_at: breeding.then(|| noon() + chrono::TimeDelta::hours(2)),
    }
}

fn server_page(
    page: u32,
    total: u64,
    creatures: Vec<Creature>,
) -> ResourcePage<Creatures> {
    FetchResponse::items(creatures)
        .with_summary(CreatureSummary {
            total,
            alive: total,
            deceased: 0,
        })
        .with_pagination(Pagination::from_totals(page, 100, total))
}

fn breeding_source(
    inner: Arc<ScriptedSource<Creatures>>,
    config: &SyncConfig,
) -> ClientFilteredSource<Creatures, Arc<ScriptedSource<Creatures>>> {
    ClientFilteredSource::new(inner, config).with_predicate(
        "isBreeding",
        |creature: &Creature, wanted: &FilterValue| {
            wanted.as_bool() == Some(creature.is_breeding(noon()))
        },
    )
}

fn key() -> AccessKey {
    AccessKey::new("k1")
}

// ── Pass-through ────────────────────────────────────────────────

#[tokio::test]
async fn queries_without_local_keys_pass_through_untouched() {
    let inner = Arc::new(ScriptedSource::new(Ok(server_page(
        2,
        250,
        vec![creature("a", false)],
    ))));
    let source = breeding_source(inner.clone(), &SyncConfig::default());
    let query = QuerySpec::new()
        .with_filter("isAlive", true)
        .with_page(2)
        .with_page_size(20);

    let page = source.fetch(&key(), &query).await.unwrap();

    assert_eq!(inner.calls().len(), 1);
    assert_eq!(inner.calls()[0].query, query);
    assert_eq!(page.pagination.map(|p| p.page), Some(2));
}

// ── Local filtering ─────────────────────────────────────────────

#[tokio::test]
async fn local_key_walks_every_server_page_at_max_size() {
    let inner = Arc::new(ScriptedSource::new(Ok(FetchResponse::items(Vec::new()))));
    inner.push(Ok(server_page(
        1,
        150,
        vec![
            creature("Ember", true),
            creature("Moss", false),
            creature("Pip", true),
        ],
    )));
    inner.push(Ok(server_page(
        2,
        150,
        vec![creature("Quill", false), creature("Rune", true)],
    )));
    let source = breeding_source(inner.clone(), &SyncConfig::default());
    let query = QuerySpec::new()
        .with_filter("isBreeding", true)
        .with_filter("isAlive", true)
        .with_page_size(20);

    let page = source.fetch(&key(), &query).await.unwrap();

    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ember", "Pip", "Rune"]);
    assert_eq!(page.pagination, None);
    assert_eq!(page.summary.map(|s| s.total), Some(150));

    let calls = inner.calls();
    assert_eq!(calls.len(), 2);
    for (index, call) in calls.iter().enumerate() {
        assert_eq!(call.query.page, index as u32 + 1);
        assert_eq!(call.query.page_size, 100);
        assert!(!call.query.filters.contains_key("isBreeding"));
        assert_eq!(
            call.query.filters.get("isAlive"),
            Some(&FilterValue::Bool(true))
        );
    }
}

#[tokio::test]
async fn local_key_false_keeps_the_complement() {
    let inner = Arc::new(ScriptedSource::new(Ok(server_page(
        1,
        3,
        vec![
            creature("Ember", true),
            creature("Moss", false),
            creature("Pip", true),
        ],
    ))));
    let source = breeding_source(inner, &SyncConfig::default());

    let page = source
        .fetch(&key(), &QuerySpec::new().with_filter("isBreeding", false))
        .await
        .unwrap();

    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Moss"]);
}

#[tokio::test]
async fn response_without_pagination_ends_the_walk() {
    let inner = Arc::new(ScriptedSource::new(Ok(FetchResponse::items(vec![
        creature("Ember", true),
    ]))));
    let source = breeding_source(inner.clone(), &SyncConfig::default());

    let page = source
        .fetch(&key(), &QuerySpec::new().with_filter("isBreeding", true))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test]
async fn hitting_the_page_cap_is_an_error() {
    let config = SyncConfig {
        client_filter_page_cap: 3,
        ..SyncConfig::default()
    };
    // every page claims there is another one
    let endless = FetchResponse::items(vec![creature("Ember", true)])
        .with_pagination(Pagination::from_totals(1, 100, 10_000));
    let inner = Arc::new(ScriptedSource::new(Ok(endless)));
    let source = breeding_source(inner.clone(), &config);

    let result = source
        .fetch(&key(), &QuerySpec::new().with_filter("isBreeding", true))
        .await;

    assert_eq!(result.unwrap_err(), SyncError::TooManyResults { cap: 3 });
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test]
async fn inner_failure_aborts_the_walk() {
    let inner = Arc::new(ScriptedSource::new(Ok(FetchResponse::items(Vec::new()))));
    inner.push(Ok(server_page(1, 150, vec![creature("Ember", true)])));
    inner.push(Err(SyncError::Api(critter_api::ApiError::Network(
        "reset".into(),
    ))));
    let source = breeding_source(inner.clone(), &SyncConfig::default());

    let result = source
        .fetch(&key(), &QuerySpec::new().with_filter("isBreeding", true))
        .await;

    assert!(matches!(result, Err(SyncError::Api(_))));
    assert_eq!(inner.call_count(), 2);
}

// ── Through an engine ───────────────────────────────────────────

#[tokio::test]
async fn engine_surfaces_the_cap_error_as_state() {
    let config = SyncConfig {
        client_filter_page_cap: 2,
        ..SyncConfig::default()
    };
    let endless = FetchResponse::items(vec![creature("Ember", true)])
        .with_pagination(Pagination::from_totals(1, 100, 10_000));
    let inner = Arc::new(ScriptedSource::new(Ok(endless)));
    let source: Arc<dyn ResourceSource<Creatures>> = Arc::new(breeding_source(inner, &config));
    let (_id_tx, id_rx) = watch::channel(IdentityState::Resolved {
        access_key: key(),
        profile: Profile::default(),
    });

    let handle = SyncEngine::start_with_query(
        source,
        id_rx,
        config,
        QuerySpec::new().with_filter("isBreeding", true),
    );
    let mut stats = handle.stats();
    stats
        .wait_for(|s: &EngineStats| s.failed == 1)
        .await
        .unwrap();

    let state = handle.state();
    assert!(state.items.is_empty());
    assert!(!state.is_loading);
    assert_eq!(
        state.error.as_deref(),
        Some(SyncError::TooManyResults { cap: 2 }.to_string().as_str())
    );
}
