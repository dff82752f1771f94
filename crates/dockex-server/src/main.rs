mod cli;
mod logging;

use std::sync::Arc;

use dockex_docker::DockerClient;
use dockex_exporter::{
    AppState, BuildInfo, Exporter, builtin_scrapers, exporter::log_enabled_scrapers,
    exporter_router,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = match cli::parse_from(std::env::args_os(), builtin_scrapers()) {
        Ok(settings) => settings,
        Err(err) => err.exit(),
    };
    let cli::Settings { cli, scrapers } = settings;

    if cli.version {
        print!("{}", BuildInfo::current());
        return Ok(());
    }

    logging::init(cli.log_level, cli.log_format, &cli.log_output)?;

    let docker_config = cli.docker_config();
    let docker = DockerClient::new(&docker_config)?;
    info!(
        host = %docker.endpoint(),
        api_version = %docker_config.api_version,
        "using docker daemon"
    );

    let exporter = Arc::new(Exporter::new(
        Arc::new(docker),
        scrapers,
        cli.exporter_config(),
    )?);
    log_enabled_scrapers(&exporter);

    let state = Arc::new(AppState::new(exporter, cli.telemetry_path.clone())?);
    let app = exporter_router(state);

    let addr = cli.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, telemetry_path = %cli.telemetry_path, "dockex listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dockex stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
