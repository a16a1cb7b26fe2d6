//! Headless terminal dashboard for the critter game API.
//!
//! Resolves the signed-in user's identity, keeps one collection in sync and
//! prints every published state. Also shows the account link code with a
//! live countdown, renewing it whenever it expires.
//!
//! Usage:
//!   critter-dash --token $TOKEN whoami
//!   critter-dash watch creatures --filter isAlive=true --sort name:desc
//!   critter-dash link-code

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use critter_api::{ApiClient, Mutations};
use critter_countdown::{
    Clock, CorrectiveAction, Countdown, CountdownTicker, SystemClock, Watchdog, WatchdogState,
    WatchdogTask, DEFAULT_TICK,
};
use critter_dash::render::{render_countdown, render_identity, render_state, ItemLine, SummaryLine};
use critter_dash::{build_query, DashConfig};
use critter_identity::{
    HttpProfileExchange, HttpSessionProvider, IdentityResolver, LinkCodeRefresher, LINK_CODE_TTL,
};
use critter_sync::{ClientFilteredSource, HttpSource, ResourceSource, SyncConfig, SyncEngine};
use critter_types::{
    Creature, Creatures, FilterValue, IdentityState, Inventory, MailId, Mailbox, QuerySpec,
    ResourceKind, VorestCreatures,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Delay before asking again after a failed link code renewal.
const RENEW_RETRY_SECS: i64 = 10;

#[derive(Parser, Debug)]
#[command(name = "critter-dash")]
#[command(about = "Headless dashboard for the critter game API")]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(long, env = "CRITTER_API_URL")]
    api_url: Option<String>,

    /// Session token from the identity provider
    #[arg(long, env = "CRITTER_TOKEN", hide_env_values = true)]
    token: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the identity and print the profile
    Whoami,
    /// Keep a collection in sync and print every update until Ctrl-C
    Watch {
        #[arg(value_enum)]
        resource: ResourceArg,

        /// Filter as key=value (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Sort as field or field:desc
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show a link code and renew it on expiry until Ctrl-C
    LinkCode,
    /// Claim the reward attached to a mailbox message
    Claim {
        /// Mail id (UUID)
        mail_id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResourceArg {
    Creatures,
    Inventory,
    Mailbox,
    Vorest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = DashConfig::load(args.config.as_deref())?.with_api_url(args.api_url);
    debug!("API base URL: {}", config.api.base_url);
    let client = ApiClient::new(config.api.clone()).context("failed to build API client")?;
    let resolver = build_resolver(&client, &args.token);

    match args.command {
        Command::Whoami => whoami(&resolver).await,
        Command::Watch {
            resource,
            filters,
            sort,
            page,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(config.sync.default_page_size);
            let query = build_query(&filters, sort.as_deref(), page, page_size)?;
            watch_command(resource, client, resolver, config.sync, query).await
        }
        Command::LinkCode => link_code(client, &args.token).await,
        Command::Claim { mail_id } => claim(client, resolver, config.sync, &mail_id).await,
    }
}

fn build_resolver(client: &ApiClient, token: &str) -> Arc<IdentityResolver> {
    Arc::new(IdentityResolver::new(
        Arc::new(HttpSessionProvider::new(client.clone(), token)),
        Arc::new(HttpProfileExchange::new(client.clone(), token)),
    ))
}

async fn whoami(resolver: &IdentityResolver) -> Result<()> {
    let state = resolver.resolve().await;
    println!("{}", render_identity(&state));
    if let IdentityState::Failed { error } = state {
        anyhow::bail!("identity resolution failed: {error}");
    }
    Ok(())
}

async fn watch_command(
    resource: ResourceArg,
    client: ApiClient,
    resolver: Arc<IdentityResolver>,
    config: SyncConfig,
    query: QuerySpec,
) -> Result<()> {
    match resource {
        ResourceArg::Creatures => {
            // the API has no breeding filter; evaluate it on the client
            let inner = HttpSource::<Creatures>::new(client);
            let source = ClientFilteredSource::<Creatures, _>::new(inner, &config)
                .with_predicate("isBreeding", |creature: &Creature, wanted: &FilterValue| {
                    wanted.as_bool() == Some(creature.is_breeding(Utc::now()))
                });
            watch_resource::<Creatures>(Arc::new(source), resolver, config, query).await
        }
        ResourceArg::Inventory => {
            let source = HttpSource::<Inventory>::new(client);
            watch_resource::<Inventory>(Arc::new(source), resolver, config, query).await
        }
        ResourceArg::Mailbox => {
            let source = HttpSource::<Mailbox>::new(client);
            watch_resource::<Mailbox>(Arc::new(source), resolver, config, query).await
        }
        ResourceArg::Vorest => {
            let source = HttpSource::<VorestCreatures>::new(client);
            watch_resource::<VorestCreatures>(Arc::new(source), resolver, config, query).await
        }
    }
}

async fn watch_resource<R>(
    source: Arc<dyn ResourceSource<R>>,
    resolver: Arc<IdentityResolver>,
    config: SyncConfig,
    query: QuerySpec,
) -> Result<()>
where
    R: ResourceKind,
    R::Item: ItemLine,
    R::Summary: SummaryLine,
{
    let mut identity = resolver.subscribe();
    let handle = SyncEngine::start_with_query(source, identity.clone(), config, query);
    let resolving = tokio::spawn({
        let resolver = Arc::clone(&resolver);
        async move { resolver.resolve().await }
    });

    let mut states = handle.subscribe();
    print!("{}", render_state(R::NAME, &states.borrow_and_update()));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted, stopping {} engine", R::NAME);
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("{}", render_state(R::NAME, &states.borrow_and_update()));
            }
            changed = identity.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = identity.borrow_and_update().clone();
                println!("{}", render_identity(&current));
                if current.is_dead_end() {
                    break;
                }
            }
        }
    }

    handle.stop().await;
    resolving.abort();
    Ok(())
}

async fn link_code(client: ApiClient, token: &str) -> Result<()> {
    let refresher = Arc::new(LinkCodeRefresher::new(client, token));
    let mut code = refresher
        .request()
        .await
        .context("failed to request a link code")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let action: Arc<dyn CorrectiveAction> = refresher.clone();
    let watchdog = WatchdogTask::spawn(
        Watchdog::armed(code.expires_at),
        action,
        Arc::clone(&clock),
        DEFAULT_TICK,
    );

    let mut codes = refresher.subscribe();
    let mut status = watchdog.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut out = std::io::stdout();

    loop {
        println!(
            "\nLink code: {} (valid until {})",
            code.code,
            code.expires_at.format("%H:%M:%S")
        );
        let countdown = Countdown::new(code.expires_at, LINK_CODE_TTL);
        let (_ticker, mut snapshots) =
            CountdownTicker::spawn(countdown, Arc::clone(&clock), DEFAULT_TICK);
        let mut ticking = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    println!();
                    watchdog.shutdown().await;
                    return Ok(());
                }
                changed = snapshots.changed(), if ticking => {
                    if changed.is_err() {
                        ticking = false;
                        continue;
                    }
                    let line = render_countdown(&code.code, &snapshots.borrow_and_update());
                    write!(out, "\r{line}    ")?;
                    out.flush()?;
                }
                changed = codes.changed() => {
                    changed.context("link code stream closed")?;
                    let next = codes.borrow_and_update().clone();
                    if let Some(next) = next {
                        code = next;
                        break;
                    }
                }
                changed = status.changed() => {
                    changed.context("watchdog stopped")?;
                    let current = status.borrow_and_update().clone();
                    if current.state == WatchdogState::Idle {
                        if let Some(error) = current.last_error {
                            warn!("Link code renewal failed: {}", error);
                            let retry_at = Utc::now() + TimeDelta::seconds(RENEW_RETRY_SECS);
                            watchdog.arm(retry_at).await?;
                        }
                    }
                }
            }
        }
    }
}

async fn claim(
    client: ApiClient,
    resolver: Arc<IdentityResolver>,
    config: SyncConfig,
    mail_id: &str,
) -> Result<()> {
    let mail = MailId::parse(mail_id).with_context(|| format!("invalid mail id {mail_id:?}"))?;
    let identity = resolver.resolve().await;
    let Some(key) = identity.access_key().cloned() else {
        anyhow::bail!("{}", render_identity(&identity));
    };

    let source: Arc<dyn ResourceSource<Mailbox>> = Arc::new(HttpSource::<Mailbox>::new(client.clone()));
    let mailbox = SyncEngine::start(source, resolver.subscribe(), config);
    let receipt = mailbox
        .settle_mutation(Mutations::new(client).claim_mail(&key, mail).await)
        .await?;
    println!(
        "Claimed: +{} points, +{} coins",
        receipt.points_awarded, receipt.coins_awarded
    );

    let mut states = mailbox.subscribe();
    let settled = states
        .wait_for(|state| !state.is_fetching())
        .await
        .map(|state| render_state(Mailbox::NAME, &state))
        .context("mailbox engine stopped")?;
    print!("{settled}");

    match resolver.refresh_profile().await {
        Ok(state) => println!("{}", render_identity(&state)),
        Err(e) => warn!("Profile refresh failed: {}", e),
    }
    mailbox.stop().await;
    Ok(())
}
