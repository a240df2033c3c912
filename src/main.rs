use clap::{Parser, Subcommand};
use log::{error, info};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;

// Added for tracing file logging
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dfsend::{
    AppConfig, EventKind, LocalFsTransport, TransferRequest, TransferSessionManager, err_code,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional path to a JSON config file
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send files to a device over the loopback transport
    Send {
        /// Target device id
        #[arg(short, long)]
        device: String,

        /// Source file paths
        #[arg(short, long, required = true, num_args = 1..)]
        source: Vec<String>,

        /// Destination paths, one per source
        #[arg(long, required = true, num_args = 1..)]
        dest: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}

// Function to initialize tracing and file logging
// Returns a WorkerGuard that must be kept alive for logs to be written
fn init_logging(log_file_prefix: &str) -> Result<WorkerGuard, Box<dyn Error>> {
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", log_file_prefix);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false); // Don't use ANSI codes in files

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // This guard needs to stay in scope, otherwise logs stop writing.
    let _guard = init_logging("dfsend")?;

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());
    config.validate()?;

    match cli.command {
        Commands::Send {
            device,
            source,
            dest,
        } => {
            config.ensure_directories()?;

            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let transport = LocalFsTransport::from_config(&config)
                .with_known_device(device.clone())
                .with_inbound_reports(inbound_tx);

            let manager = TransferSessionManager::new(Arc::new(transport));
            manager.spawn_inbound_pump(inbound_rx);

            manager.subscribe(EventKind::SendFinished, |result| {
                match serde_json::to_string(result) {
                    Ok(json) => println!("sendFinished: {json}"),
                    Err(e) => error!("Failed to render event payload: {e}"),
                }
            });
            manager.subscribe(EventKind::ReceiveFinished, |result| {
                match serde_json::to_string(result) {
                    Ok(json) => println!("receiveFinished: {json}"),
                    Err(e) => error!("Failed to render event payload: {e}"),
                }
            });

            let file_count = source.len() as u32;
            info!(
                "Sending {} file(s) to device {} via receive root {}",
                file_count, device, config.receive_directory
            );

            let handle = manager.initiate(TransferRequest::new(
                device.as_str(),
                source,
                dest,
                file_count,
            ))?;
            let code = handle.wait().await;

            if code == err_code::NO_ERROR {
                println!("Transfer complete (status 0)");
            } else {
                error!("Transfer failed with status {code}");
                return Err(format!("transfer failed with status {code}").into());
            }

            // Let the inbound pump drain the loopback report before exiting.
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
