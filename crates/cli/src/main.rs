mod config_commands;
mod doctor_commands;
mod predict_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    digitbot_classifier::OnnxClassifier,
    digitbot_config::{DigitbotConfig, LoadedConfig, Severity},
    digitbot_gateway::GatewayState,
    digitbot_line::LineClient,
};

#[derive(Parser)]
#[command(name = "digitbot", version, about = "digitbot: handwritten digit recognition for LINE")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: search ./ then ~/.config/digitbot/).
    #[arg(long, global = true, env = "DIGITBOT_CONFIG")]
    config: Option<PathBuf>,

    // Server arguments (used when no subcommand is provided, or with `serve`)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Model file (overrides config value).
    #[arg(long, global = true)]
    model: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Classify local image files with the configured model.
    Predict(predict_commands::PredictArgs),
    /// Check configuration and model before deploying.
    Doctor,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

impl Cli {
    /// Discover and load the config, then apply command-line overrides.
    fn load_config(&self) -> anyhow::Result<LoadedConfig> {
        let mut loaded = digitbot_config::discover_and_load(self.config.as_deref())?;
        self.apply_overrides(&mut loaded.config);
        Ok(loaded)
    }

    fn apply_overrides(&self, config: &mut DigitbotConfig) {
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref model) = self.model {
            config.model.path = model.clone();
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        // Default: start the server when no subcommand is provided
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Predict(ref args)) => predict_commands::handle_predict(&cli, args).await,
        Some(Commands::Doctor) => doctor_commands::handle_doctor(&cli).await,
        Some(Commands::Config { ref action }) => config_commands::handle_config(&cli, action),
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "digitbot starting");

    let loaded = cli.load_config()?;
    match loaded.path {
        Some(ref path) => info!(path = %path.display(), "loaded config"),
        None => info!("no config file found, using defaults and environment"),
    }
    let config = loaded.config;

    let result = digitbot_config::validate(&config, loaded.path.clone());
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!("{d}"),
            Severity::Warning => warn!("{d}"),
            Severity::Info => info!("{d}"),
        }
    }
    if result.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `digitbot doctor` for details",
            result.count(Severity::Error)
        );
    }

    let model = config.model.clone();
    let classifier = tokio::task::spawn_blocking(move || OnnxClassifier::load(&model))
        .await?
        .context("failed to load digit model")?;
    let messaging = LineClient::new(&config.line)?;
    let channel_secret = config
        .line
        .channel_secret
        .clone()
        .context("LINE channel secret is not configured")?;

    let state = GatewayState::new(channel_secret, Arc::new(messaging), Arc::new(classifier))
        .with_preprocess(config.preprocess.clone())
        .with_replies(config.replies.clone());

    digitbot_gateway::start_gateway(&config.server.bind, config.server.port, Arc::new(state)).await
}
