use clap::Parser;
use plagcheck_analysis::clients::{FileServiceClient, WorkServiceClient};
use plagcheck_analysis::config::AnalysisServiceConfig;
use plagcheck_analysis::repo::ReportRepository;
use plagcheck_analysis::routes;
use plagcheck_analysis::worker::{self, AnalysisContext};
use plagcheck_common::broker::BrokerClient;
use plagcheck_common::logging;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "plagcheck-analysis", about = "Plagiarism detection engine for academic submissions")]
struct Args {
    #[arg(long, env = "PLAGCHECK_ANALYSIS_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config_path =
        plagcheck_common::config::resolve_config_path(args.config, "PLAGCHECK_ANALYSIS_CONFIG");

    let config: AnalysisServiceConfig =
        match plagcheck_common::config::load("PLAGCHECK_ANALYSIS_", config_path.as_deref()) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ failed to load configuration: {e}");
                std::process::exit(1);
            }
        };

    logging::init(&config.logging);
    info!("🚀 starting plagcheck-analysis");

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
    let works = match WorkServiceClient::new(&config.work_service) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "❌ failed to build work service client");
            std::process::exit(1);
        }
    };

    let broker = match BrokerClient::connect(&config.rabbitmq).await {
        Ok(b) => Some(b),
        Err(e) => {
            warn!(error = %e, "⚠️ broker unavailable at startup; worker pool will stay idle until an operator restart");
            None
        }
    };

    let repo = ReportRepository::new(pool);
    let ctx = Arc::new(AnalysisContext {
        repo,
        files,
        works,
        broker,
        config: config.analysis.clone(),
        wordcloud_url: format!("{}/wordcloud", config.wordcloud_service.url.trim_end_matches('/')),
    });

    // Worker pool drains the broker alongside the HTTP server; it idles on
    // its own if no broker connected at startup (§4.4 "Worker pool").
    let worker_ctx = (*ctx).clone();
    tokio::spawn(async move {
        worker::run_worker_pool(worker_ctx).await;
    });

    let app = routes::create_router(ctx);

    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, address = %config.server.address, "❌ failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(address = %config.server.address, "✅ plagcheck-analysis listening");

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
