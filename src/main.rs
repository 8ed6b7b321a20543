use anyhow::{Context, bail};
use api_client::{ApiClient, HttpApiClient};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::Cell;
use configuration::{LoggingConfig, PageId, Settings};
use core_types::{LogFilter, LogLevel, RiskLimitsUpdate, StrategyParamsUpdate};
use dashboard::pages::{logs, overview, risk, strategies};
use dashboard::{Dashboard, Hooks, widgets};
use query_cache::{QueryCache, SystemClock};
use serde_json::{Map, Value};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::Instrument;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// The main entry point for the Watchtower console.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = configuration::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // The live console owns the terminal, so it only logs to file.
    let interactive = !matches!(cli.command, Commands::Watch(_));
    let _log_guard = init_tracing(&settings.logging, interactive);

    let client: Arc<dyn ApiClient> =
        Arc::new(HttpApiClient::new(&settings.api).context("Invalid API configuration")?);
    tracing::debug!(base_url = %settings.api.base_url, "Client ready.");

    match cli.command {
        Commands::Watch(args) => handle_watch(args, &settings, client).await,
        Commands::Snapshot(args) => handle_snapshot(args, &settings, client).await,
        Commands::Status => handle_status(client.as_ref()).await,
        Commands::Risk(command) => handle_risk(command, &one_shot_hooks(&settings, client)).await,
        Commands::Strategy(command) => handle_strategy(command, &one_shot_hooks(&settings, client)).await,
        Commands::Logs(args) => handle_logs(args, &settings, client.as_ref()).await,
        Commands::LogsTail(args) => handle_logs_tail(args, client.as_ref()).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A terminal console for monitoring and steering a trading backend.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to ./watchtower.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live console until Ctrl-C.
    Watch(WatchArgs),
    /// Render one page once, after its data has loaded.
    Snapshot(SnapshotArgs),
    /// Show service info, connectivity, engines and the derived trading mode.
    Status,
    /// Inspect or change risk limits.
    #[command(subcommand)]
    Risk(RiskCommand),
    /// List, toggle or reconfigure strategies.
    #[command(subcommand)]
    Strategy(StrategyCommand),
    /// Query the backend log store.
    Logs(LogsArgs),
    /// Print the last lines of an engine's log.
    LogsTail(LogsTailArgs),
}

#[derive(Parser)]
struct WatchArgs {
    /// Page to open (defaults to console.default_page).
    #[arg(long, value_enum)]
    page: Option<PageId>,

    /// Cycle to the next page every N seconds.
    #[arg(long, value_name = "SECS")]
    rotate: Option<u64>,

    /// Also tail this engine's log on the logs page.
    #[arg(long)]
    tail_engine: Option<String>,
}

#[derive(Parser)]
struct SnapshotArgs {
    #[arg(long, value_enum)]
    page: Option<PageId>,

    /// Give up waiting for data after this many seconds and print what is there.
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    timeout: u64,

    #[arg(long)]
    tail_engine: Option<String>,
}

#[derive(Subcommand)]
enum RiskCommand {
    /// Print the limits in force.
    Show,
    /// Change some limits; the others keep their current value.
    Set(RiskSetArgs),
}

#[derive(Parser)]
struct RiskSetArgs {
    #[arg(long)]
    max_position_size: Option<f64>,
    #[arg(long)]
    max_daily_loss: Option<f64>,
    #[arg(long)]
    max_drawdown_pct: Option<f64>,
    #[arg(long)]
    max_open_orders: Option<u32>,
    #[arg(long)]
    max_leverage: Option<f64>,
    /// Halt all trading.
    #[arg(long, conflicts_with = "resume")]
    halt: bool,
    /// Lift a trading halt.
    #[arg(long)]
    resume: bool,
}

#[derive(Subcommand)]
enum StrategyCommand {
    List,
    Enable { id: String },
    Disable { id: String },
    /// Update parameters, e.g. `--set window=20 --set symbol=BTCUSDT`.
    Params {
        id: String,
        /// A `key=value` pair; the value is parsed as JSON, else taken as a string.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_param, required = true)]
        set: Vec<(String, Value)>,
    },
}

#[derive(Parser)]
struct LogsArgs {
    /// Defaults to console.logs_limit.
    #[arg(long)]
    limit: Option<u32>,
    /// DEBUG, INFO, WARN, ERROR or CRITICAL.
    #[arg(long)]
    level: Option<LogLevel>,
    #[arg(long)]
    contains: Option<String>,
    #[arg(long)]
    kind: Option<String>,
}

#[derive(Parser)]
struct LogsTailArgs {
    #[arg(long)]
    engine: String,
    #[arg(long, default_value_t = 100)]
    lines: u32,
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in `{}`", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

// ==============================================================================
// Tracing
// ==============================================================================

/// Installs the global subscriber. The returned guard flushes the log file.
fn init_tracing(config: &LoggingConfig, console: bool) -> WorkerGuard {
    let (file_layer, guard) = configuration::logging::file_layer(config);

    let indicatif_layer = IndicatifLayer::new();
    let stderr_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(indicatif_layer.get_stderr_writer())
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(configuration::logging::env_filter(config))
        .with(file_layer)
        .with(stderr_layer)
        .with(console.then_some(indicatif_layer))
        .init();

    guard
}

/// Runs `future` inside a span that shows a spinner with `message`.
async fn with_spinner<F: Future>(message: &str, future: F) -> F::Output {
    let span = tracing::info_span!("request");
    span.pb_set_message(message);
    future.instrument(span).await
}

// ==============================================================================
// Console Commands
// ==============================================================================

fn start_dashboard(
    settings: &Settings,
    client: Arc<dyn ApiClient>,
    page: Option<PageId>,
    tail_engine: Option<String>,
) -> (QueryCache, Dashboard) {
    let cache = QueryCache::start(settings.cache.clone(), Arc::new(SystemClock));
    let hooks = Hooks::new(cache.clone(), client, settings.polling.clone());
    let page = page.unwrap_or(settings.console.default_page);
    let dashboard = Dashboard::mount(&hooks, &settings.console, page, tail_engine);
    (cache, dashboard)
}

async fn handle_watch(
    args: WatchArgs,
    settings: &Settings,
    client: Arc<dyn ApiClient>,
) -> anyhow::Result<()> {
    let (cache, mut dashboard) = start_dashboard(settings, client, args.page, args.tail_engine);
    tracing::info!(page = ?dashboard.active(), "Console started.");

    let mut redraw = tokio::time::interval(settings.console.refresh());
    redraw.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut rotation = args.rotate.filter(|secs| *secs > 0).map(|secs| {
        let period = Duration::from_secs(secs);
        tokio::time::interval_at(Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            _ = redraw.tick() => draw(&dashboard, &cache)?,
            _ = next_rotation(&mut rotation) => {
                dashboard.next_page();
                draw(&dashboard, &cache)?;
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    drop(dashboard);
    cache.shutdown();
    tracing::info!("Console stopped.");
    Ok(())
}

async fn next_rotation(rotation: &mut Option<Interval>) {
    match rotation {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn draw(dashboard: &Dashboard, cache: &QueryCache) -> anyhow::Result<()> {
    let frame = dashboard.render(cache.now_ms());
    let mut stdout = std::io::stdout().lock();
    // Clear the screen and home the cursor before each frame.
    write!(stdout, "\x1B[2J\x1B[H{}", frame).context("Failed to draw the console")?;
    stdout.flush().context("Failed to draw the console")?;
    Ok(())
}

async fn handle_snapshot(
    args: SnapshotArgs,
    settings: &Settings,
    client: Arc<dyn ApiClient>,
) -> anyhow::Result<()> {
    let (cache, dashboard) = start_dashboard(settings, client, args.page, args.tail_engine);

    let timeout = Duration::from_secs(args.timeout);
    let settled = with_spinner("Waiting for the backend...", dashboard.wait_until_settled(timeout)).await;
    if !settled {
        tracing::warn!(timeout_secs = args.timeout, "Not every query answered in time.");
    }

    println!("{}", dashboard.render(cache.now_ms()));

    drop(dashboard);
    cache.shutdown();
    Ok(())
}

// ==============================================================================
// One-shot Commands
// ==============================================================================

/// Hooks for the risk and strategy commands. Nothing is subscribed, so the
/// invalidation after a mutation has no views to refresh.
fn one_shot_hooks(settings: &Settings, client: Arc<dyn ApiClient>) -> Hooks {
    let cache = QueryCache::new(settings.cache.clone(), Arc::new(SystemClock));
    Hooks::new(cache, client, settings.polling.clone())
}

async fn handle_status(client: &dyn ApiClient) -> anyhow::Result<()> {
    let (meta, auth, time, engines) = with_spinner("Querying backend status...", async {
        futures::join!(
            client.meta(),
            client.auth_status(),
            client.system_time(),
            client.engines_status()
        )
    })
    .await;

    // The heartbeat failing means nothing else is worth printing.
    let time = time.context("Backend is unreachable")?;
    let offset_ms = (time.utc - Utc::now()).num_milliseconds();

    let (service, version) = match &meta {
        Ok(meta) => (Cell::new(&meta.name), Cell::new(&meta.version)),
        Err(e) => (Cell::new(format!("unavailable: {}", e)), Cell::new(widgets::PLACEHOLDER)),
    };
    let user = match &auth {
        Ok(auth) if auth.authenticated => widgets::opt(auth.user.as_deref()),
        Ok(_) => "not authenticated".to_string(),
        Err(e) => format!("unavailable: {}", e),
    };
    let mode = match &engines {
        Ok(engines) => status::derive_mode(Some(engines.as_slice())).to_string(),
        Err(_) => widgets::PLACEHOLDER.to_string(),
    };

    let card = widgets::card(vec![
        ("Service", service),
        ("Version", version),
        ("User", Cell::new(user)),
        ("Server time", Cell::new(widgets::timestamp(Some(time.utc)))),
        ("Clock offset", Cell::new(format!("{} ms", offset_ms))),
        ("Mode", Cell::new(mode)),
    ]);
    println!("{}", card);

    match engines {
        Ok(engines) if engines.is_empty() => println!("No engines."),
        Ok(engines) => println!("{}", overview::render_engines(&engines)),
        Err(e) => println!("Failed to load engines: {}", e),
    }
    Ok(())
}

async fn handle_risk(command: RiskCommand, hooks: &Hooks) -> anyhow::Result<()> {
    let limits = match command {
        RiskCommand::Show => with_spinner("Loading risk limits...", hooks.fetch_risk_limits())
            .await
            .context("Failed to load risk limits")?,
        RiskCommand::Set(args) => {
            let update = RiskLimitsUpdate {
                max_position_size: args.max_position_size,
                max_daily_loss: args.max_daily_loss,
                max_drawdown_pct: args.max_drawdown_pct,
                max_open_orders: args.max_open_orders,
                max_leverage: args.max_leverage,
                trading_halted: if args.halt {
                    Some(true)
                } else if args.resume {
                    Some(false)
                } else {
                    None
                },
            };
            if update.is_empty() {
                bail!("Nothing to update: pass at least one limit, --halt or --resume");
            }

            let limits = with_spinner("Updating risk limits...", hooks.update_risk_limits(&update))
                .await
                .context("Failed to update risk limits")?;
            tracing::info!(?update, "Risk limits updated.");
            limits
        }
    };

    println!("{}", risk::render_limits(&limits));
    Ok(())
}

async fn handle_strategy(command: StrategyCommand, hooks: &Hooks) -> anyhow::Result<()> {
    let listed = match command {
        StrategyCommand::List => with_spinner("Loading strategies...", hooks.fetch_strategies())
            .await
            .context("Failed to load strategies")?,
        StrategyCommand::Enable { id } => {
            let detail = with_spinner("Enabling strategy...", hooks.enable_strategy(&id))
                .await
                .with_context(|| format!("Failed to enable strategy {}", id))?;
            tracing::info!(%id, "Strategy enabled.");
            vec![detail]
        }
        StrategyCommand::Disable { id } => {
            let detail = with_spinner("Disabling strategy...", hooks.disable_strategy(&id))
                .await
                .with_context(|| format!("Failed to disable strategy {}", id))?;
            tracing::info!(%id, "Strategy disabled.");
            vec![detail]
        }
        StrategyCommand::Params { id, set } => {
            let update = StrategyParamsUpdate {
                params: set.into_iter().collect::<Map<String, Value>>(),
            };
            let detail = with_spinner(
                "Updating strategy parameters...",
                hooks.update_strategy_params(&id, &update),
            )
            .await
            .with_context(|| format!("Failed to update parameters of strategy {}", id))?;
            tracing::info!(%id, params = %strategies::format_params(&update.params), "Strategy parameters updated.");
            vec![detail]
        }
    };

    if listed.is_empty() {
        println!("No strategies.");
    } else {
        println!("{}", strategies::render_strategies(&listed));
    }
    Ok(())
}

async fn handle_logs(args: LogsArgs, settings: &Settings, client: &dyn ApiClient) -> anyhow::Result<()> {
    let filter = LogFilter {
        limit: args.limit.unwrap_or(settings.console.logs_limit),
        level: args.level.map(|level| level.to_string()),
        contains: args.contains,
        kind: args.kind,
    };

    let response = with_spinner("Loading logs...", client.logs(&filter))
        .await
        .context("Failed to load logs")?;

    if response.logs.is_empty() {
        println!("No log entries.");
    } else {
        println!("{}", logs::render_logs(&response));
    }
    Ok(())
}

async fn handle_logs_tail(args: LogsTailArgs, client: &dyn ApiClient) -> anyhow::Result<()> {
    let tail = with_spinner("Loading engine log...", client.logs_tail(&args.engine, args.lines))
        .await
        .with_context(|| format!("Failed to tail the log of engine {}", args.engine))?;

    println!("{}", logs::render_tail(&tail));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_as_json_or_string() {
        assert_eq!(parse_param("window=20").unwrap(), ("window".to_string(), Value::from(20)));
        assert_eq!(parse_param("active=true").unwrap().1, Value::Bool(true));
        assert_eq!(
            parse_param("symbol=BTCUSDT").unwrap().1,
            Value::String("BTCUSDT".to_string())
        );
        assert_eq!(parse_param("note=a=b").unwrap().1, Value::String("a=b".to_string()));
        assert!(parse_param("window").is_err());
        assert!(parse_param("=5").is_err());
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "watchtower", "strategy", "params", "mean_rev", "--set", "window=20", "--set", "z=1.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Strategy(StrategyCommand::Params { id, set }) => {
                assert_eq!(id, "mean_rev");
                assert_eq!(set.len(), 2);
            }
            _ => panic!("unexpected command"),
        }

        assert!(Cli::try_parse_from(["watchtower", "risk", "set", "--halt", "--resume"]).is_err());
        assert!(Cli::try_parse_from(["watchtower", "watch", "--page", "risk", "--rotate", "5"]).is_ok());
        assert!(Cli::try_parse_from(["watchtower", "logs", "--level", "verbose"]).is_err());
    }
}
