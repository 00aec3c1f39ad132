use clap::Parser;
use plagcheck_common::logging;
use plagcheck_gateway::config::GatewayConfig;
use plagcheck_gateway::proxy::Backend;
use plagcheck_gateway::routes;
use plagcheck_gateway::state::GatewayState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "plagcheck-gateway", about = "Edge gateway for the plagiarism-checking platform")]
struct Args {
    #[arg(long, env = "PLAGCHECK_GATEWAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path =
        plagcheck_common::config::resolve_config_path(args.config, "PLAGCHECK_GATEWAY_CONFIG");

    let config: GatewayConfig =
        match plagcheck_common::config::load("PLAGCHECK_GATEWAY_", config_path.as_deref()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ failed to load configuration: {e}");
                std::process::exit(1);
            }
        };

    logging::init(&config.logging);
    info!("🚀 starting plagcheck-gateway");

    let files = match Backend::new("files", &config.files_service) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "❌ failed to build files backend client");
            std::process::exit(1);
        }
    };
    let works = match Backend::new("works", &config.works_service) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "❌ failed to build works backend client");
            std::process::exit(1);
        }
    };
    let analysis = match Backend::new("analysis", &config.analysis_service) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "❌ failed to build analysis backend client");
            std::process::exit(1);
        }
    };

    let state = Arc::new(GatewayState {
        files,
        works,
        analysis,
        started_at: Instant::now(),
    });

    let app = routes::create_router(
        state,
        &config.cors,
        Duration::from_secs(config.proxy.request_timeout),
    );

    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, address = %config.server.address, "❌ failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(address = %config.server.address, "✅ plagcheck-gateway listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service)
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
