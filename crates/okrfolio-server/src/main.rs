use anyhow::Result;
use chrono::Utc;
use okrfolio_storage::PortfolioStore;
use rand::Rng;
use std::fmt::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use okrfolio_server::app;
use okrfolio_server::config::ServerConfig;
use okrfolio_server::demo_seed;
use okrfolio_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  okrfolio-server [config.toml]              Start the server");
    eprintln!("  okrfolio-server init-demo <config.toml>    Create the demo account and sample portfolio");
}

#[tokio::main]
async fn main() -> Result<()> {
    okrfolio_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("okrfolio=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("init-demo") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("init-demo requires <config.toml> argument")
            })?;
            run_init_demo(config_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

async fn open_store(config: &ServerConfig) -> Result<PortfolioStore> {
    let db_url = config.database.connection_url();
    let store = PortfolioStore::new(&db_url, Path::new(&config.database.data_dir))
        .await?
        .with_password_cost(config.auth.bcrypt_cost);
    Ok(store)
}

async fn run_init_demo(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    let store = open_store(&config).await?;
    let inserted = demo_seed::init_demo_account(&store).await?;
    tracing::info!(
        email = demo_seed::DEMO_EMAIL,
        inserted,
        "Demo account ready"
    );
    Ok(())
}

/// 32 random bytes as hex.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.database.data_dir,
        db = %config.database.redacted_url(),
        "okrfolio-server starting"
    );

    let store = Arc::new(open_store(&config).await?);

    let jwt_secret = match &config.auth.jwt_secret {
        Some(secret) => Arc::new(secret.clone()),
        None => {
            tracing::warn!("No jwt_secret configured. A random secret was generated and will change on restart. Set [auth].jwt_secret in config for production use.");
            Arc::new(generate_secret())
        }
    };

    let state = AppState {
        store,
        start_time: Utc::now(),
        jwt_secret,
        token_expire_secs: config.auth.token_expire_secs,
        config: Arc::new(config.clone()),
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
