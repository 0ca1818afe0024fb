use std::path::Path;

use clap::{Parser, Subcommand};
use sento_core::{AppConfig, LogFormat, LogOutput};
use sento_crawler::{AppContext, CrawlSettings, Shutdown};
use sento_db::PgStore;
use sento_geocode::NominatimClient;
use sento_twitter::TwitterClient;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Prefix of the rotated log files; the date is appended on rollover.
const LOG_FILE_NAME: &str = "sento_crawler.log";

type Context = AppContext<PgStore, TwitterClient, NominatimClient>;

#[derive(Debug, Parser)]
#[command(name = "sento")]
#[command(about = "Trend and post crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run both crawl loops until interrupted (the default).
    Run,
    /// Run a single trend discovery cycle.
    Trends,
    /// Run a single post extraction cycle over the current relevant trends.
    Posts,
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = sento_core::load_app_config()?;
    // Dropping the guard flushes buffered log lines, so it lives until the
    // crawl loops have joined.
    let _log_guard = init_tracing(&config)?;

    let pool_config = sento_db::PoolConfig::from_app_config(&config);
    let pool = sento_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Some(Commands::Db {
            command: DbCommands::Ping,
        }) => {
            sento_db::ping(&pool).await?;
            tracing::info!("database reachable");
        }
        Some(Commands::Db {
            command: DbCommands::Migrate,
        }) => {
            let applied = sento_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
        }
        Some(Commands::Trends) => {
            sento_db::run_migrations(&pool).await?;
            let context = build_context(&config, pool)?;
            let summary = context
                .trend_discovery()
                .run_cycle(&Shutdown::never())
                .await?;
            tracing::info!(
                regions = summary.regions,
                regions_failed = summary.regions_failed,
                trends = summary.trends,
                enriched = summary.enriched,
                "trend discovery cycle complete"
            );
        }
        Some(Commands::Posts) => {
            sento_db::run_migrations(&pool).await?;
            let context = build_context(&config, pool)?;
            let summary = context
                .post_extraction()
                .run_cycle(&Shutdown::never())
                .await?;
            tracing::info!(
                trends = summary.trends,
                failed = summary.failed,
                posts_stored = summary.posts_stored,
                "post extraction cycle complete"
            );
        }
        Some(Commands::Run) | None => {
            sento_db::run_migrations(&pool).await?;
            let context = build_context(&config, pool)?;
            run_loops(&context).await?;
        }
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    let (writer, guard) = log_writer(config.log_output, Path::new(&config.log_dir))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(config.log_output == LogOutput::Console);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(guard)
}

/// Non-blocking writer for the configured output. Lines are buffered on a
/// worker thread until the returned guard is dropped.
fn log_writer(output: LogOutput, dir: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    Ok(match output {
        LogOutput::Console => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::DailyRotatingFile => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_NAME)
                .build(dir)?;
            tracing_appender::non_blocking(appender)
        }
    })
}

fn build_context(config: &AppConfig, pool: sento_db::PgPool) -> anyhow::Result<Context> {
    Ok(AppContext::new(
        PgStore::new(pool),
        TwitterClient::from_app_config(config)?,
        NominatimClient::from_app_config(config)?,
        CrawlSettings::from_app_config(config),
    ))
}

/// Runs trend discovery and post extraction side by side until a shutdown
/// signal arrives, then waits for both to wind down.
async fn run_loops(context: &Context) -> anyhow::Result<()> {
    let (trigger, shutdown) = sento_crawler::shutdown::channel();

    let discovery = context.trend_discovery();
    let trends_shutdown = shutdown.clone();
    let trends = tokio::spawn(async move { discovery.run(trends_shutdown).await });

    let extraction = context.post_extraction();
    let posts = tokio::spawn(async move { extraction.run(shutdown).await });

    tracing::info!("crawler started");
    shutdown_signal().await;
    trigger.trigger();

    let (trends, posts) = tokio::join!(trends, posts);
    trends?;
    posts?;
    tracing::info!("crawler stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping crawl loops");
}
