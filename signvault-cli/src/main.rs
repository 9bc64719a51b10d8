use clap::{Parser, Subcommand};
use signvault::{
    parse_identifiers, BatchReport, ClientConfig, ContentIdentifier, GatewayClient,
    RetrievalOutcome,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "signvault",
    about = "Store and retrieve lesson media on a content-addressed network"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON client config. Environment variables still supply the token when
    /// the file has none.
    #[arg(long, env = "SIGNVAULT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one object to stdout, or to a file with --output
    Get {
        id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Fetch one object and pretty-print it as JSON
    GetJson { id: String },
    /// Upload a file under its file name
    Put { path: PathBuf },
    /// Validate a JSON file and upload it
    PutJson {
        path: PathBuf,
        /// Display name; defaults to the file name
        #[arg(long)]
        name: Option<String>,
    },
    /// Fetch many objects concurrently
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Save each object as <dir>/<id> instead of reporting sizes
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print the public gateway URL for an identifier
    Url { id: String },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> signvault::Result<ClientConfig> {
    match path {
        Some(path) => {
            let mut config = ClientConfig::load(path)?;
            if config.api_token.is_none() {
                config.api_token = ClientConfig::from_env()?.api_token;
            }
            Ok(config)
        }
        None => ClientConfig::from_env(),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Returns `Ok(false)` when the command ran but some work items failed.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let client = GatewayClient::new(load_config(cli.config.as_deref())?)?;

    match cli.command {
        Command::Get { id, output } => {
            let id = ContentIdentifier::new(id)?;
            match output {
                Some(path) => {
                    let saved = client.save_to_path(&id, &path).await?;
                    tracing::info!("Saved {} to {}", id, saved.display());
                }
                None => {
                    use std::io::Write;
                    let bytes = client.fetch_bytes(&id).await?;
                    std::io::stdout().write_all(&bytes)?;
                }
            }
        }
        Command::GetJson { id } => {
            let id = ContentIdentifier::new(id)?;
            let value = client.fetch_json(&id).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Put { path } => {
            let id = client.put_file(&path).await?;
            println!("{}", id);
        }
        Command::PutJson { path, name } => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("{}: {}", path.display(), e))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))?;
            let name = name.unwrap_or_else(|| display_name(&path));
            let id = client.put_json(&value, &name).await?;
            println!("{}", id);
        }
        Command::Batch { ids, dir } => {
            let ids = parse_identifiers(&ids)?;
            let outcomes = client.retrieve_batch(&ids, dir.as_deref()).await?;
            for id in &ids {
                match outcomes.get(id) {
                    Some(RetrievalOutcome::Bytes(bytes)) => {
                        println!("{}\tok\t{} bytes", id, bytes.len())
                    }
                    Some(RetrievalOutcome::SavedTo(path)) => {
                        println!("{}\tok\t{}", id, path.display())
                    }
                    Some(RetrievalOutcome::Failure(e)) => println!("{}\tfailed\t{}", id, e),
                    None => {}
                }
            }
            if outcomes.failed() > 0 {
                tracing::warn!(
                    "{} of {} retrievals failed",
                    outcomes.failed(),
                    outcomes.len()
                );
            }
            return Ok(outcomes.failed() == 0);
        }
        Command::Url { id } => {
            let id = ContentIdentifier::new(id)?;
            println!("{}", client.gateway_url(&id));
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
