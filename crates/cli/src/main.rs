use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dogcam")]
#[command(about = "dogcam: Slack slash-command dog pictures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: DOGCAM_CONFIG_PATH or ~/.dogcam/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook gateway. Image requests go to the fetcher over RPC.
    Gateway {
        /// Config file path (default: DOGCAM_CONFIG_PATH or ~/.dogcam/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run the fetch service that the gateway calls for images.
    Fetcher {
        /// Config file path (default: DOGCAM_CONFIG_PATH or ~/.dogcam/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// RPC port (default from config or 9090)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("dogcam {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Fetcher { config, port }) => {
            if let Err(e) = run_fetcher(config, port).await {
                log::error!("fetcher failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(dogcam::config::default_config_path);
    let dir = dogcam::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = dogcam::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    dogcam::gateway::run_gateway(config).await
}

async fn run_fetcher(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = dogcam::config::load_config(config_path)?;
    if let Some(p) = port {
        config.fetcher.port = p;
    }
    log::info!(
        "starting fetcher on {}:{} (config {})",
        config.fetcher.bind,
        config.fetcher.port,
        path.display()
    );
    dogcam::rpc::run_fetcher(config).await
}
