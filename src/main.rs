use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use autobrowse::config::DEFAULT_NAMESPACE;
use autobrowse::transport::DEFAULT_TIMEOUT_SECS;
use autobrowse::{
    AutoGrow, BufferContainer, Event, EventSender, KeyValueStore, PageCache, ProjectConfig,
    ScrollSignal, SqliteStore, TailViewport, TemplateRenderer, items_at,
};

/// Rows the headless viewport pretends to show
const VIEWPORT_ROWS: u64 = 40;

#[derive(Parser)]
#[command(name = "autobrowse", version)]
#[command(about = "Pull a paged endpoint the way an infinitely scrolling page would", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ./autobrowse.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print pages until the endpoint runs out of items
    Pull(PullArgs),

    /// Inspect or clear persisted pages
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args)]
struct PullArgs {
    /// Endpoint to fetch from; pages are requested at URL/OFFSET/COUNT
    url: Option<String>,

    /// Offset of the first request
    #[arg(long)]
    offset: Option<u64>,

    /// Items per page
    #[arg(long)]
    count: Option<u64>,

    /// Total items available on the server
    #[arg(long)]
    total: Option<u64>,

    /// Template applied to each item, e.g. "<li>{{ name }}</li>"
    #[arg(long)]
    template: Option<String>,

    /// JSON pointer to the item array inside a page, e.g. /items
    #[arg(long)]
    items_pointer: Option<String>,

    /// Persist pages so the next pull replays them
    #[arg(long)]
    use_storage: bool,

    #[command(flatten)]
    store: StoreArgs,

    /// Milliseconds between simulated scroll signals
    #[arg(long, default_value_t = 50)]
    interval_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database holding persisted pages (defaults to ~/.autobrowse/storage.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Prefix of the persisted keys
    #[arg(long)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show what is persisted for a namespace
    Show(StoreArgs),

    /// Remove persisted pages
    Clear {
        #[command(flatten)]
        store: StoreArgs,

        /// Flush every key in the database, not just the namespace
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(
    cli_path: Option<PathBuf>,
    config: &ProjectConfig,
) -> Result<SqliteStore> {
    let store = match cli_path.or_else(|| config.storage.path.clone()) {
        Some(path) => SqliteStore::new(path)?,
        None => SqliteStore::default_location()?,
    };
    debug!(path = %store.path().display(), "opened page storage");
    Ok(match config.storage.quota_bytes {
        Some(quota) => store.with_quota(quota),
        None => store,
    })
}

fn resolve_namespace(cli: Option<String>, config: &ProjectConfig) -> String {
    cli.unwrap_or_else(|| {
        if config.options.namespace.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            config.options.namespace.clone()
        }
    })
}

/// Feed scroll signals to the session and watch its events.
///
/// Returns the error of the first failed request, or `None` once the
/// session stopped listening.
async fn drive(
    signals: mpsc::Sender<ScrollSignal>,
    mut events: mpsc::Receiver<Event>,
    every: Duration,
) -> Option<String> {
    let mut ticker = interval(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if signals.send(ScrollSignal).await.is_err() {
                    return None;
                }
            }
            event = events.recv() => match event {
                Some(Event::FetchFailed { error, .. }) => return Some(error),
                Some(event) => debug!(?event, "session event"),
                None => return None,
            },
        }
    }
}

async fn pull(args: PullArgs, config: ProjectConfig) -> Result<()> {
    let url = args
        .url
        .clone()
        .or_else(|| config.url.clone())
        .context("no url given (pass one or set `url` in autobrowse.toml)")?;

    let mut options = config.options.clone();
    if let Some(offset) = args.offset {
        options.offset = offset;
    }
    if let Some(count) = args.count {
        options.count = count;
    }
    if let Some(total) = args.total {
        options.total_count = total;
    }
    options.use_storage |= args.use_storage;
    options.namespace = resolve_namespace(args.store.namespace.clone(), &config);

    let template = args
        .template
        .clone()
        .or_else(|| config.render.template.clone())
        .unwrap_or_else(|| "{{ . }}".to_string());
    let items_pointer = args
        .items_pointer
        .clone()
        .or_else(|| config.render.items_pointer.clone())
        .unwrap_or_default();

    let mut renderer = TemplateRenderer::new(template);
    if !items_pointer.is_empty() {
        renderer = renderer.with_items_pointer(items_pointer.clone());
    }

    let timeout = Duration::from_secs(
        args.timeout_secs
            .or(config.http.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );

    let container = Arc::new(BufferContainer::echo());
    let viewport = Arc::new(TailViewport::new(container.clone(), VIEWPORT_ROWS));
    let (events, event_rx) = EventSender::channel(64);

    let mut builder = AutoGrow::builder(&url)
        .options(options.clone())
        .renderer(renderer)
        .items_returned(items_at(items_pointer))
        .container(container)
        .viewport(viewport)
        .events(events)
        .http_transport(timeout)
        .context("failed to create HTTP transport")?;

    if options.use_storage {
        let store = open_store(args.store.db.clone(), &config)
            .context("failed to open page storage")?;
        builder = builder.store(Arc::new(store));
    }

    let session = builder.build().context("failed to build session")?;

    info!(url = %url, count = options.count, total = options.total_count, "pulling");

    let (signal_tx, signal_rx) = mpsc::channel(8);
    let driver = tokio::spawn(drive(
        signal_tx,
        event_rx,
        Duration::from_millis(args.interval_ms.max(1)),
    ));

    let report = session.run(signal_rx).await.context("session failed")?;
    let failure = driver.await.context("scroll driver panicked")?;

    info!(
        offset = report.offset,
        pages = report.pages_loaded,
        render_failures = report.render_failures,
        phase = %report.phase,
        "pull finished"
    );

    if let Some(error) = failure {
        anyhow::bail!("fetch failed: {}", error);
    }

    Ok(())
}

async fn show_cache(args: StoreArgs, config: &ProjectConfig) -> Result<()> {
    let namespace = resolve_namespace(args.namespace, config);
    let store = open_store(args.db, config).context("failed to open page storage")?;
    let cache = PageCache::new(Arc::new(store), &namespace, 0);

    let owner = cache.owner().await?;
    let pages = cache.stored_pages().await?;

    let (Some(owner), Some(pages)) = (owner, pages) else {
        println!("No cached pages.");
        return Ok(());
    };

    println!("namespace:  {}", namespace);
    println!("url:        {}", owner);
    println!("pages:      {}", pages.len());
    println!(
        "offset:     {}",
        cache
            .stored_offset()
            .await?
            .map_or_else(|| "-".to_string(), |o| o.to_string())
    );
    println!(
        "scroll top: {}",
        cache.stored_scroll_top().await?.unwrap_or(0)
    );

    Ok(())
}

async fn clear_cache(args: StoreArgs, all: bool, config: &ProjectConfig) -> Result<()> {
    let namespace = resolve_namespace(args.namespace, config);
    let store = Arc::new(open_store(args.db, config).context("failed to open page storage")?);

    if all {
        store.flush().await?;
        println!("Cleared all persisted keys.");
    } else {
        PageCache::new(store, &namespace, 0).reset().await?;
        println!("Cleared namespace: {}", namespace);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => ProjectConfig::load_from(path)?,
        None => ProjectConfig::load().unwrap_or_else(|e| {
            debug!(error = %e, "failed to load config, using defaults");
            ProjectConfig::default()
        }),
    };

    match cli.command {
        Commands::Pull(args) => pull(args, config).await?,
        Commands::Cache { action } => match action {
            CacheAction::Show(store) => show_cache(store, &config).await?,
            CacheAction::Clear { store, all } => clear_cache(store, all, &config).await?,
        },
    }

    Ok(())
}
