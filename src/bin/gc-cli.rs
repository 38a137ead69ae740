use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use serde_json::Value;

use gc_transfer::config::{load_config, ClientConfig};
use gc_transfer::lifecycle::cancel_on_ctrl_c;
use gc_transfer::observability::init_logging;
use gc_transfer::{
    Cancellation, CaseTarget, Client, Socket, SocketCatalog, SocketValueSpec, SuperKind,
};

#[derive(Parser)]
#[command(name = "gc-cli")]
#[command(about = "Upload data to and list resources of a Grand Challenge instance", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API token, overrides the configuration and the environment
    #[arg(long, global = true)]
    token: Option<String>,

    /// API root, e.g. https://grand-challenge.org/api/v1/
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record of a list endpoint as JSON lines
    List {
        /// Endpoint path relative to the API root, e.g. algorithms/
        endpoint: String,
        /// Filter as key=value, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Upload files to one socket of a new archive item or display set
    Upload {
        #[arg(long, value_enum)]
        target: TargetArg,
        /// API URL of the archive or reader study
        #[arg(long)]
        parent: String,
        #[arg(long)]
        socket: String,
        #[arg(long, value_enum, default_value_t = SuperKindArg::Image)]
        super_kind: SuperKindArg,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Fetch a case snapshot by API URL
    Status { api_url: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    Archive,
    DisplaySet,
}

#[derive(Clone, Copy, ValueEnum)]
enum SuperKindArg {
    Image,
    File,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn build_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(token) = &cli.token {
        config.api.token = Some(token.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(&config.observability);

    let client = Client::from_config(&config)?;
    let cancel = Cancellation::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::List { endpoint, params } => {
            let mut records = std::pin::pin!(client.iterate::<Value>(&endpoint, params, cancel));
            while let Some(record) = records.next().await {
                println!("{}", serde_json::to_string(&record?)?);
            }
        }
        Commands::Upload {
            target,
            parent,
            socket,
            super_kind,
            files,
        } => {
            let super_kind = match super_kind {
                SuperKindArg::Image => SuperKind::Image,
                SuperKindArg::File => SuperKind::File,
            };
            let catalog = SocketCatalog::new([Socket::new(&socket, super_kind.as_str(), super_kind)]);
            let target = match target {
                TargetArg::Archive => CaseTarget::new_archive_item(parent, catalog),
                TargetArg::DisplaySet => CaseTarget::new_display_set(parent, catalog),
            };
            let specs = [SocketValueSpec::from_files(socket, files)];

            let case = client.create_case(&specs, &target, &cancel).await?;
            tracing::info!(case = %case.api_url, "Upload finished; processing continues server-side");
            println!("{}", serde_json::to_string_pretty(&case.raw)?);
        }
        Commands::Status { api_url } => {
            let snapshot: Value = client.pages().detail(&api_url, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
