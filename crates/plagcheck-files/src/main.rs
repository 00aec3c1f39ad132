use clap::Parser;
use plagcheck_common::logging;
use plagcheck_files::config::FileServiceConfig;
use plagcheck_files::repo::FileRepository;
use plagcheck_files::service::FileService;
use plagcheck_files::storage::ObjectStore;
use plagcheck_files::routes;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "plagcheck-files", about = "Object custody service for academic submissions")]
struct Args {
    #[arg(long, env = "PLAGCHECK_FILES_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path = plagcheck_common::config::resolve_config_path(
        args.config,
        "PLAGCHECK_FILES_CONFIG",
    );

    let config: FileServiceConfig =
        match plagcheck_common::config::load("PLAGCHECK_FILES_", config_path.as_deref()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ failed to load configuration: {e}");
                std::process::exit(1);
            }
        };

    logging::init(&config.logging);
    info!("🚀 starting plagcheck-files");

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_open_conns)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.connection_string())
        .await
    {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "❌ failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!(error = %e, "❌ migration failed");
        std::process::exit(1);
    }
    info!("✅ migrations applied");

    let store = match ObjectStore::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "❌ failed to initialize object store");
            std::process::exit(1);
        }
    };
    store.try_ensure_bucket().await;

    let repo = FileRepository::new(pool);
    let max_body_bytes = config.upload.max_size_bytes as usize;
    let file_service = Arc::new(FileService::new(repo, store, config.clone()));
    let app = routes::create_router(file_service, max_body_bytes);

    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, address = %config.server.address, "❌ failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(address = %config.server.address, "✅ plagcheck-files listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "❌ server error");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("🛑 shutdown signal received, draining connections");
}
