use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use kinship::config::{ConfigLoader, KinshipConfig, validate_config};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use kinship_server::cli::CliArgs;
use kinship_server::config::ServerConfig;
use kinship_server::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let server_config = ServerConfig::from_cli_and_env(&cli_args)?;
    let kinship_config = load_kinship_config(&cli_args, &server_config)?;

    let _log_guard = kinship::logging::init(&kinship_config.logging)?;

    info!("Starting Kinship server v{}", kinship::VERSION);
    info!(
        storage = %kinship_config.storage.engine,
        reconcile_on_list = kinship_config.reconciliation.reconcile_on_list,
        "Configuration loaded"
    );

    let kinship = kinship::init(kinship_config).await?;
    let app_state = Arc::new(AppState::new(kinship, server_config.clone()));

    let app = create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on {}", addr);
    info!("API documentation available at http://{}/docs", addr);

    if server_config.enable_auth {
        info!("Authentication is enabled");
    } else {
        info!(
            header = %server_config.trusted_identity_header,
            "Authentication is disabled, trusting identity header"
        );
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Defaults, then config files, then `KINSHIP_*` env, then CLI flags.
fn load_kinship_config(cli_args: &CliArgs, server_config: &ServerConfig) -> Result<KinshipConfig> {
    let mut loader = ConfigLoader::new();
    loader.load_default_files();
    if let Some(path) = &server_config.config_file {
        loader
            .load_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }
    loader.load_env();

    let mut config = loader.extract()?;

    if let Some(level) = cli_args.log_level {
        config.logging.level = level;
    }
    if let Some(engine) = cli_args.storage {
        config.storage.engine = engine;
    }
    if let Some(data_dir) = &cli_args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    validate_config(&config)?;
    Ok(config)
}
