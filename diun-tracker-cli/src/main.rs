mod inspect;
mod server;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::server::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "diun-tracker")]
#[command(version)]
#[command(about = "Tracks Diun image update notifications per scan cycle", long_about = None)]
struct Args {
    /// Log level used when RUST_LOG is not set
    #[arg(short = 'v', long = "log-level", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the webhook receiver
    Serve {
        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "diun-tracker.toml")]
        config: String,

        /// Listening address
        #[arg(short = 'H', long = "hostname")]
        hostname: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Path to the update document
        #[arg(short = 's', long = "storage-file")]
        storage_file: Option<PathBuf>,
    },
    /// Print stored updates, newest first
    List {
        /// Path to the update document
        #[arg(
            short = 's',
            long = "storage-file",
            env = "DIUN_TRACKER_STORAGE_FILE",
            default_value = "updates.json"
        )]
        storage_file: PathBuf,
    },
    /// Print the update summary as JSON
    Summary {
        /// Path to the update document
        #[arg(
            short = 's',
            long = "storage-file",
            env = "DIUN_TRACKER_STORAGE_FILE",
            default_value = "updates.json"
        )]
        storage_file: PathBuf,
    },
    /// Drop every stored update
    Clear {
        /// Path to the update document
        #[arg(
            short = 's',
            long = "storage-file",
            env = "DIUN_TRACKER_STORAGE_FILE",
            default_value = "updates.json"
        )]
        storage_file: PathBuf,
    },
}

fn init_logging(level: &str) {
    let default_filter = format!("diun_tracker={0},diun_tracker_lib={0},tower_http=warn", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Args::parse();
    init_logging(&cli.log_level);

    let result = match cli.cmd {
        Command::Serve {
            config,
            hostname,
            port,
            storage_file,
        } => {
            server::run_serve(ServeArgs {
                config_path: config,
                hostname,
                port,
                storage_file,
            })
            .await
        }
        Command::List { storage_file } => inspect::run_list(&storage_file).await,
        Command::Summary { storage_file } => inspect::run_summary(&storage_file).await,
        Command::Clear { storage_file } => inspect::run_clear(&storage_file).await,
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        process::exit(1);
    }
}
