//! Application entry point.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::api::{RouterConfig, create_router_with_config};
use wallet_ledger::app::AppState;
use wallet_ledger::domain::ConfigError;
use wallet_ledger::infra::{PostgresClient, PostgresConfig};

/// Application configuration
struct Config {
    database_url: SecretString,
    host: String,
    port: u16,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    db_connect_retry_count: u32,
    db_connect_retry_delay: Duration,
    db_max_connections: u32,
}

impl Config {
    fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URL".to_string()))?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(Self {
            database_url,
            host,
            port: env_or("PORT", 8080)?,
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 10)?),
            shutdown_timeout: Duration::from_secs(env_or("SHUTDOWN_TIMEOUT_SECS", 10)?),
            db_connect_retry_count: env_or("DB_CONNECT_RETRY_COUNT", 10)?,
            db_connect_retry_delay: Duration::from_secs(env_or("DB_CONNECT_RETRY_DELAY_SECS", 2)?),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("Wallet ledger v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;

    let db_config = PostgresConfig {
        max_connections: config.db_max_connections,
        ..PostgresConfig::default()
    };
    let postgres_client = PostgresClient::connect_with_retry(
        config.database_url.expose_secret(),
        db_config,
        config.db_connect_retry_count,
        config.db_connect_retry_delay,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    postgres_client
        .run_migrations()
        .await
        .context("Failed to apply migrations")?;
    info!("Database connected and migrations applied");

    let postgres_client = Arc::new(postgres_client);
    let app_state = Arc::new(AppState::new(postgres_client.clone(), postgres_client));

    let router = create_router_with_config(
        app_state,
        RouterConfig {
            request_timeout: config.request_timeout,
            ..RouterConfig::default()
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server starting on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => result??,
        _ = stop_rx.wait_for(|stopped| *stopped) => {
            info!(
                timeout_secs = config.shutdown_timeout.as_secs(),
                "Draining in-flight requests"
            );
            match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!("Shutdown timeout elapsed, aborting remaining requests");
                    server.abort();
                }
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
