use clap::Parser;
use debit_note_service::{
    app,
    config::{self, AppConfig},
    handlers::health,
    services::in_memory::InMemoryLedger,
    AppState,
};
use std::{path::PathBuf, sync::Arc};
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "debit-note-service", version, about = "Debit note generation service")]
struct Cli {
    /// Directory holding default.toml and the per-environment overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// JSON fixture loaded into the ledger, overriding `seed_file` from config
    #[arg(long)]
    seed_file: Option<PathBuf>,
}

fn build_ledger(cfg: &AppConfig, cli: &Cli) -> Result<InMemoryLedger, Box<dyn std::error::Error>> {
    let seed = cli
        .seed_file
        .clone()
        .or_else(|| cfg.seed_file.as_ref().map(PathBuf::from));

    match seed {
        Some(path) => Ok(InMemoryLedger::from_seed_file(path)?),
        None => {
            info!("no seed file configured; starting with an empty ledger");
            Ok(InMemoryLedger::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::load_config_from(&cli.config_dir)?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    health::init_start_time();

    let ledger = Arc::new(build_ledger(&cfg, &cli)?);
    info!(
        environment = %cfg.environment,
        reverse_sign = cfg.reverse_sign,
        documents = ledger.document_count(),
        "ledger ready"
    );

    let addr = cfg.bind_address();
    let router = app(AppState::new(cfg, ledger));

    info!("debit-note-service listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
