mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pulse_config::SinkKind;
use pulse_core::PulseError;

#[derive(Parser)]
#[command(
    name = "pulse",
    version,
    about = "Extract PCoIP performance metrics from compressed log batches"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a log batch and publish the extracted metrics
    Process {
        /// Payload or `{"awslogs":{"data":...}}` envelope (stdin if omitted or "-")
        file: Option<PathBuf>,
        /// Metrics namespace (overrides config and environment)
        #[arg(short, long)]
        namespace: Option<String>,
        /// Config file (defaults to ./pulse.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Sink: json, http or prometheus
        #[arg(long)]
        sink: Option<SinkKind>,
        /// Endpoint for the http sink
        #[arg(long)]
        endpoint: Option<String>,
        /// Extract without publishing
        #[arg(long)]
        dry_run: bool,
        /// Print the dispatch report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a payload from plain log lines (`<ms>\t<message>` or `<message>`)
    Encode {
        /// Log file (stdin if omitted or "-")
        file: Option<PathBuf>,
        /// Log stream name; must contain the instance id
        #[arg(short, long)]
        log_stream: String,
        /// Wrap the payload in an `awslogs` envelope
        #[arg(long)]
        envelope: bool,
    },
    /// List extraction rules in evaluation order
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Process {
            file,
            namespace,
            config,
            sink,
            endpoint,
            dry_run,
            json,
        } => {
            let args = commands::process::ProcessArgs {
                file,
                namespace,
                config,
                sink,
                endpoint,
                dry_run,
                json,
            };
            commands::process::run(args).await
        }
        Commands::Encode {
            file,
            log_stream,
            envelope,
        } => {
            logging::init(None);
            commands::encode::run(file, log_stream, envelope)
        }
        Commands::Rules { json } => {
            logging::init(None);
            commands::rules::run(json)
        }
    };

    if let Err(e) = result {
        match &e {
            PulseError::Decode(_) => {
                eprintln!("Error: payload corrupt, batch dropped: {e}");
            }
            PulseError::OriginNotFound(_) => {
                eprintln!("Error: log stream has no instance id, batch dropped: {e}");
            }
            _ => {
                eprintln!("Error: {e}");
            }
        }
        std::process::exit(1);
    }
}
