use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use tessera::{
    AppState, Config, create_app,
    gallery::{CompositionContext, CompositionRequest},
    options::{JsonFileOptionStore, Settings},
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Compose a gallery and print its markup
    Compose {
        /// Attributes as key=value pairs, e.g. ids=1,2,3 layout=masonry
        attributes: Vec<String>,

        /// Render in preview mode (at most 40 images)
        #[arg(long)]
        preview: bool,

        /// Post whose attached images are used when no ids resolve
        #[arg(long)]
        post: Option<u64>,
    },

    /// Inspect or maintain the stored plugin options
    #[command(subcommand)]
    Options(OptionsCommands),
}

#[derive(Subcommand, Debug)]
enum OptionsCommands {
    /// Print the effective options as JSON
    Show,
    /// Delete the stored options record
    Reset,
    /// Fold legacy option keys into the unified record
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Compose {
            attributes,
            preview,
            post,
        }) => compose(&config, &attributes, preview, post),
        Some(Commands::Options(cmd)) => handle_options_command(&config, cmd),
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, &cli.config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, &cli.config, None, None, None).await
        }
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

fn compose(
    config: &Config,
    attributes: &[String],
    preview: bool,
    post: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(config)?;
    let request = CompositionRequest::from_args(attributes);
    let context = CompositionContext {
        post_id: post,
        preview,
    };
    println!("{}", state.composer.compose(&request, &context));
    Ok(())
}

fn handle_options_command(
    config: &Config,
    cmd: OptionsCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileOptionStore::open(&config.options.store)?;
    let settings = Settings::new(Arc::new(store));

    match cmd {
        OptionsCommands::Show => {
            let options = settings.try_load()?;
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        OptionsCommands::Reset => {
            settings.reset()?;
            println!("Options reset to defaults");
        }
        OptionsCommands::Migrate => {
            let report = settings.migrate()?;
            if report.written {
                println!(
                    "Migrated options: {} from legacy keys, {} from defaults",
                    report.from_legacy.len(),
                    report.from_default.len()
                );
            } else {
                println!("Options are already at the current schema version");
            }
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    config_path: &Path,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Library manifest: {:?}", config.library.manifest);
    info!("Option store: {:?}", config.options.store);

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app_state = AppState::from_config(&config)?;
    let app = create_app(app_state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
