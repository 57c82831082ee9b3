use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wispr_server::api::{self, ApiState, AuthContext};
use wispr_server::{Config, RadiusServer, Store};

/// Drain window for in-flight RADIUS handlers at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// wisprd - lightweight RADIUS server for hotspots and WISPs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "wisprd")]
struct Cli {
    /// Override RADIUS_AUTH_PORT
    #[arg(long)]
    auth_port: Option<u16>,

    /// Override RADIUS_ACCT_PORT
    #[arg(long)]
    acct_port: Option<u16>,

    /// Override DASHBOARD_PORT
    #[arg(long)]
    http_port: Option<u16>,

    /// Override DATABASE_PATH
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            process::exit(1);
        }
    };
    if let Some(port) = cli.auth_port {
        config.auth_port = port;
    }
    if let Some(port) = cli.acct_port {
        config.acct_port = port;
    }
    if let Some(port) = cli.http_port {
        config.dashboard_port = port;
    }
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("wisprd v{}", env!("CARGO_PKG_VERSION"));
    if config.jwt_secret_is_default() {
        warn!("JWT_SECRET not set; admin tokens use the built-in development secret");
    }

    let store = match Store::open(&config.database_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(path = %config.database_path, error = %e, "failed to open store");
            process::exit(1);
        }
    };
    if let Err(e) = store
        .seed(&config.admin_username, &config.admin_password)
        .await
    {
        error!(error = %e, "failed to seed store");
        process::exit(1);
    }

    let server = match RadiusServer::bind(&config, Arc::clone(&store)).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to bind RADIUS listeners");
            process::exit(1);
        }
    };

    let api_state = ApiState {
        store: Arc::clone(&store),
        tokens: Arc::new(AuthContext::new(&config.jwt_secret)),
        started_at: Instant::now(),
        default_secret: config.default_secret.clone(),
    };
    let http_listener =
        match tokio::net::TcpListener::bind(("0.0.0.0", config.dashboard_port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(port = config.dashboard_port, error = %e, "failed to bind admin API");
                process::exit(1);
            }
        };
    info!(port = config.dashboard_port, "admin API listening");

    let http = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, api::router(api_state)).await {
            error!(error = %e, "admin API server error");
        }
    });

    info!("server started, press Ctrl+C to stop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "RADIUS server error");
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    // Stop accepting (run future dropped by select), drain, close
    server.drain(SHUTDOWN_GRACE).await;
    http.abort();
    store.close().await;
    info!("shutdown complete");
}
