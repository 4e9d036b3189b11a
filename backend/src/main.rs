use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use craftstats::config::Config;
use craftstats::services::ExtensionService;
use craftstats::{AppState, create_router};

#[derive(Parser, Debug)]
#[command(name = "craftstats", about = "Extension analytics backend for Minecraft servers")]
struct Args {
    /// Override server.host from config
    #[arg(long)]
    host: Option<String>,

    /// Override server.port from config
    #[arg(long)]
    port: Option<u16>,

    /// Override database.url from config
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // The real subscriber needs the loaded config, but config loading
    // itself logs (missing file, env overrides). Run it under a temporary
    // stderr subscriber so those messages are not dropped.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, Config::load)
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    // Keep the appender guard alive for the lifetime of the process.
    let _log_guard = init_tracing(&config)?;

    let options = SqliteConnectOptions::from_str(&config.database.url)
        .context("Invalid database URL")?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let state = Arc::new(AppState {
        extension_service: ExtensionService::new(pool),
        config: config.clone(),
    });
    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("craftstats listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging filter")?;

    match &config.logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("craftstats.log"));
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        },
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            Ok(None)
        },
    }
}
