use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use timeslot_server::auth::PasswordHasher;
use timeslot_server::backend::Backend;
use timeslot_server::config::{AppConfig, BackendKind, BackendSettings, CliConfig, FileConfig};
use timeslot_server::server::{metrics, run_server, RequestsLoggingLevel};
use timeslot_server::{MemoryBackend, SupabaseBackend};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Where users, timeslots, bookings and events are stored.
    #[clap(long, value_enum, default_value = "memory")]
    pub backend: BackendKind,

    /// Base URL of the Supabase project.
    #[clap(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Service key of the Supabase project.
    #[clap(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Timeout in seconds for Supabase requests.
    #[clap(long)]
    pub supabase_timeout_sec: Option<u64>,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            backend: self.backend,
            supabase_url: self.supabase_url.clone(),
            supabase_key: self.supabase_key.clone(),
            supabase_timeout_sec: self.supabase_timeout_sec,
        }
    }
}

fn make_backend(settings: &BackendSettings) -> Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match settings {
        BackendSettings::Memory => {
            info!("Using in-memory backend, data will not survive a restart");
            Arc::new(MemoryBackend::new(PasswordHasher::Argon2))
        }
        BackendSettings::Supabase(supabase) => {
            info!("Using Supabase backend at {}", supabase.url);
            Arc::new(
                SupabaseBackend::new(&supabase.url, &supabase.key, supabase.timeout_sec)
                    .context("Failed to create Supabase client")?,
            )
        }
    };
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let backend = make_backend(&app_config.backend)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(
        app_config.server_config(),
        backend,
        env!("GIT_HASH").to_string(),
    )
    .await
}
