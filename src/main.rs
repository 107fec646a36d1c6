//! docgate binary
//!
//! # Usage
//!
//! ```bash
//! # Run the HTTP gateway
//! docgate serve --config docgate.yaml
//!
//! # Check an operation request before an automated job runs it
//! OPERATION=read COLLECTION=users QUERY='{"role":"agent"}' docgate validate
//! ```

use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docgate::config::GatewayConfig;
use docgate::core::validation::{OperationRequest, SUCCESS_MESSAGE, validate};
use docgate::server::ServerBuilder;
use docgate::{identity, storage};

/// docgate - collection-oriented REST gateway over a document store
#[derive(Parser, Debug)]
#[command(name = "docgate")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Path to configuration file (YAML)
        #[arg(short, long, env = "DOCGATE_CONFIG")]
        config: Option<String>,

        /// Override the configured bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Validate an operation request; exits non-zero on rejection
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// read, create, update or delete
    #[arg(long, env = "OPERATION")]
    operation: Option<String>,

    /// Target collection
    #[arg(long, env = "COLLECTION")]
    collection: Option<String>,

    /// Serialized query (JSON)
    #[arg(long, env = "QUERY")]
    query: Option<String>,

    /// Serialized payload (JSON)
    #[arg(long, env = "DATA")]
    data: Option<String>,

    /// Configuration file providing the collection allow-set
    #[arg(short, long, env = "DOCGATE_CONFIG")]
    config: Option<String>,
}

fn load_config(path: Option<&str>) -> anyhow::Result<GatewayConfig> {
    match path {
        Some(path) => GatewayConfig::from_yaml_file(path),
        None => Ok(GatewayConfig::default_config()),
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: Option<String>, bind: Option<String>) -> anyhow::Result<ExitCode> {
    let mut config = load_config(config.as_deref())?;
    if let Some(bind) = bind {
        config.bind_address = bind;
    }

    init_tracing(&config.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        collections = ?config.collections,
        "Starting docgate"
    );

    let store = storage::from_config(&config.storage).await?;
    let provider = identity::from_config(&config.identity)?;
    let addr = config.bind_address.clone();

    ServerBuilder::new()
        .with_config(config)
        .with_shared_store(store)
        .with_shared_identity_provider(provider)
        .serve(&addr)
        .await?;

    Ok(ExitCode::SUCCESS)
}

/// Check the request; the verdict goes to `out` on success and `err` on rejection
fn run_validation(
    args: ValidateArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<bool> {
    let config = load_config(args.config.as_deref())?;
    let request = OperationRequest {
        operation: args.operation,
        collection: args.collection,
        query: args.query,
        data: args.data,
    };

    match validate(&request, &config.collections) {
        Ok(_) => {
            writeln!(out, "{}", SUCCESS_MESSAGE)?;
            Ok(true)
        }
        Err(rejection) => {
            writeln!(err, "{}", rejection)?;
            Ok(false)
        }
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, bind } => serve(config, bind).await,
        Command::Validate(args) => {
            let passed = run_validation(args, &mut std::io::stdout(), &mut std::io::stderr())?;
            Ok(exit_code(passed))
        }
    }
}
