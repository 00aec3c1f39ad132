use clap::Parser;
use plagcheck_common::broker::BrokerClient;
use plagcheck_common::logging;
use plagcheck_works::clients::{AnalysisServiceClient, FileServiceClient};
use plagcheck_works::config::WorkServiceConfig;
use plagcheck_works::repo::WorkRepository;
use plagcheck_works::routes;
use plagcheck_works::service::WorkService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "plagcheck-works", about = "Work registry service for academic submissions")]
struct Args {
    #[arg(long, env = "PLAGCHECK_WORKS_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path =
        plagcheck_common::config::resolve_config_path(args.config, "PLAGCHECK_WORKS_CONFIG");

    let config: WorkServiceConfig =
        match plagcheck_common::config::load("PLAGCHECK_WORKS_", config_path.as_deref()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ failed to load configuration: {e}");
                std::process::exit(1);
            }
        };

    logging::init(&config.logging);
    info!("🚀 starting plagcheck-works");

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

    let files = match FileServiceClient::new(&config.files_service) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "❌ failed to build file service client");
            std::process::exit(1);
        }
    };
    let analysis = match AnalysisServiceClient::new(&config.analysis_service) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "❌ failed to build analysis service client");
            std::process::exit(1);
        }
    };

    let broker = match BrokerClient::connect(&config.rabbitmq).await {
        Ok(b) => Some(b),
        Err(e) => {
            warn!(error = %e, "⚠️ broker unavailable at startup; work.created publish will be skipped until an operator reprocess");
            None
        }
    };

    let repo = WorkRepository::new(pool);
    let max_body_bytes = 64 * 1024 * 1024;
    let work_service = Arc::new(WorkService::new(repo, files, analysis, broker));
    let app = routes::create_router(work_service, max_body_bytes);

    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, address = %config.server.address, "❌ failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(address = %config.server.address, "✅ plagcheck-works listening");

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
