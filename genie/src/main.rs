use aggregator::config::Config as GenieConfig;
use aggregator::{AggregationEngine, BuildError, api};
use clap::{Args, Parser};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use upstream::{ResilientClient, SetupError};

mod config;
mod telemetry;

#[derive(Parser)]
#[command(version, about = "Artist pages built from MusicBrainz, Cover Art Archive and Wikipedia")]
enum CliCommand {
    /// Run the artist API and the admin listener
    Serve(ServeArgs),
    /// Build one artist record and print it as JSON
    Lookup(LookupArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(Args)]
struct LookupArgs {
    #[arg(long)]
    config_file_path: Option<PathBuf>,
    /// MusicBrainz artist id
    id: String,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Client(#[from] SetupError),
    #[error(transparent)]
    Serve(#[from] api::ServeError),
    #[error("admin listener failed: {0}")]
    Admin(std::io::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Serve(args) => run(Some(args.config_file_path), serve),
        CliCommand::Lookup(args) => {
            let id = args.id;
            run(args.config_file_path, move |config| lookup(config, id))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run<F, Fut>(config_file_path: Option<PathBuf>, command: F) -> Result<(), CliError>
where
    F: FnOnce(GenieConfig) -> Fut,
    Fut: Future<Output = Result<(), CliError>>,
{
    let config = match config_file_path {
        Some(path) => config::Config::from_file(&path)?,
        None => config::Config::default(),
    };
    let _telemetry = telemetry::init(&config.logging, config.metrics.as_ref())?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    rt.block_on(command(config.genie))
}

fn engine(config: &GenieConfig) -> Result<AggregationEngine, CliError> {
    let client = ResilientClient::new(&config.client)?;
    Ok(AggregationEngine::new(client, config.upstreams.clone()))
}

async fn serve(config: GenieConfig) -> Result<(), CliError> {
    let app = api::router(engine(&config)?, config.build_timeout());
    let listener = api::bind(&config.listener).await?;

    let ready = Arc::new(AtomicBool::new(false));
    let admin_ready = ready.clone();
    let admin = AdminService::<_, Infallible>::new(move || admin_ready.load(Ordering::Relaxed));

    ready.store(true, Ordering::Relaxed);
    tracing::info!("genie started");

    tokio::try_join!(
        async { api::serve(listener, app).await.map_err(CliError::from) },
        async {
            run_http_service(
                &config.admin_listener.host,
                config.admin_listener.port,
                admin,
            )
            .await
            .map_err(CliError::Admin)
        },
    )?;

    Ok(())
}

async fn lookup(config: GenieConfig, id: String) -> Result<(), CliError> {
    let record = engine(&config)?.build(&id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
