mod events;
mod respond;
mod run;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use radar_transport::{Device, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "radar-node", about = "Mesh neighbor discovery (radar)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover neighbors and print changes as JSON lines.
    Run {
        /// Interface to probe on, as NAME=ADDR/BROADCAST (repeatable).
        #[arg(long = "device", required = true)]
        devices: Vec<Device>,
        /// JSON config file; flags override its fields.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Radar UDP port.
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Do not answer other nodes' probes.
        #[arg(long)]
        no_respond: bool,
        #[command(flatten)]
        overrides: settings::Overrides,
    },

    /// Only answer other nodes' probes.
    Respond {
        /// Radar UDP port.
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    eprintln!("radar-node v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run {
            devices,
            config,
            port,
            no_respond,
            overrides,
        } => {
            let config = settings::resolve(config.as_deref(), &overrides)?;
            run::run(devices, port, !no_respond, config).await?;
        }

        Command::Respond { port } => {
            respond::run(port).await?;
        }
    }

    Ok(())
}
