use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use voldis_config::Config;
use voldis_core::Store;
use voldis_engine::Engine;
use voldis_store::RedisStore;

#[derive(Parser)]
#[command(name = "voldis", version, about = "Redis-backed volume synchronization")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a volume directory and verify the store is reachable
    Create {
        /// Volume name
        name: String,
    },
    /// Delete a volume directory from disk
    Remove {
        /// Volume name
        name: String,
    },
    /// Print the mountpoint for a volume
    Path {
        /// Volume name
        name: String,
    },
    /// Mount one or more volumes and synchronize them until interrupted
    Mount {
        /// Volume names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Unmount a volume previously mounted in this process
    ///
    /// Exposed mainly for parity with the engine interface; outside of a
    /// long-running mount session it has nothing to detach.
    Unmount {
        /// Volume name
        name: String,
    },
    /// Show the effective configuration
    Config,
}

fn find_config() -> Option<PathBuf> {
    // 1. VOLDIS_CONFIG environment variable
    if let Ok(path) = std::env::var("VOLDIS_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. voldis.yaml in current directory
    let cwd_config = PathBuf::from("voldis.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. ~/.config/voldis/config.yaml
    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/voldis/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config.or_else(find_config).ok_or(
        "No configuration file found. Use --config, set VOLDIS_CONFIG, or create voldis.yaml",
    )?;

    let config = Config::from_file(&config_path)?;
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(format!("Invalid configuration: {}", problems.join("; ")).into());
    }

    // Commands that never touch the store.
    match &cli.command {
        Commands::Path { name } => {
            println!("{}", config.volume_root.join(name).display());
            return Ok(());
        }
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            return Ok(());
        }
        _ => {}
    }

    let store: Arc<dyn Store> = Arc::new(RedisStore::connect(&config.store).await?);
    let engine = Engine::new(store, config.volume_root.clone(), config.reconcile_interval());

    match cli.command {
        Commands::Create { name } => {
            let mountpoint = engine.create(&name).await?;
            println!("{}", mountpoint.display());
        }
        Commands::Remove { name } => {
            engine.remove(&name).await?;
        }
        Commands::Mount { names } => {
            for name in &names {
                let mountpoint = engine.mount(name).await?;
                println!("{}", mountpoint.display());
            }
            info!("Synchronizing; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            engine.shutdown().await;
        }
        Commands::Unmount { name } => {
            engine.unmount(&name).await;
        }
        Commands::Path { .. } | Commands::Config => unreachable!(),
    }

    Ok(())
}
