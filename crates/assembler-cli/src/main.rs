//! ergo-assemble: build unsigned and reduced Ergo transactions from JSON requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use assembler_core::AssemblerConfig;
use clap::Parser;
use ergo_tx::{
    AddressBook, AddressCodec, BlockHeader, ChainPrimitives, NetworkContext, Proxied, TxAssembler,
    TxRequest, TxRequestProxy,
};

#[derive(Parser)]
#[command(name = "ergo-assemble", about = "Assemble unsigned Ergo transactions")]
struct Cli {
    /// Path to a TOML (or .json) assembler configuration file.
    #[arg(long, env = "ERGO_ASSEMBLE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "ERGO_ASSEMBLE_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Transaction request (EIP-12 style JSON).
    #[arg(long)]
    request: PathBuf,

    /// Current chain height, used as the creation height of change and fee boxes.
    #[arg(long)]
    height: u32,

    /// JSON object mapping addresses to ErgoTree hex, used to pay change.
    #[arg(long)]
    address_book: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the unsigned transaction as JSON.
    Build {
        #[command(flatten)]
        args: RequestArgs,
    },
    /// Print the EIP-19 reduced transaction as hex.
    Reduce {
        #[command(flatten)]
        args: RequestArgs,

        /// Block headers as served by a node, newest first.
        #[arg(long)]
        headers: PathBuf,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AssemblerConfig> {
    match path {
        Some(path) => {
            let config = AssemblerConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(AssemblerConfig::default()),
    }
}

fn load_request(path: &Path) -> anyhow::Result<TxRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    let proxy: TxRequestProxy = serde_json::from_str(&text)
        .with_context(|| format!("parsing request {}", path.display()))?;
    Ok(TxRequest::from_proxy(&proxy)?)
}

fn load_headers(path: &Path) -> anyhow::Result<Vec<BlockHeader>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading headers {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing headers {}", path.display()))
}

#[cfg(not(feature = "ergo-lib"))]
fn primitives() -> Arc<dyn ChainPrimitives> {
    Arc::new(ergo_tx::NativePrimitives)
}

#[cfg(feature = "ergo-lib")]
fn primitives() -> Arc<dyn ChainPrimitives> {
    Arc::new(ergo_tx::SigmaRustPrimitives)
}

fn addresses(
    book: Option<&Path>,
    network: assembler_core::Network,
) -> anyhow::Result<Arc<dyn AddressCodec>> {
    if let Some(path) = book {
        let book = AddressBook::load(path)
            .with_context(|| format!("loading address book {}", path.display()))?;
        tracing::debug!("Address book with {} entries", book.len());
        return Ok(Arc::new(book));
    }
    #[cfg(feature = "ergo-lib")]
    {
        Ok(Arc::new(ergo_tx::Base58Addresses::new(network)))
    }
    #[cfg(not(feature = "ergo-lib"))]
    {
        let _ = network;
        tracing::warn!("No address book given; requests with change will fail");
        Ok(Arc::new(AddressBook::new()))
    }
}

fn assembler(config: AssemblerConfig, args: &RequestArgs) -> anyhow::Result<TxAssembler> {
    let addresses = addresses(args.address_book.as_deref(), config.network)?;
    Ok(TxAssembler::new(primitives(), addresses, config))
}

fn run(cli: Cli) -> anyhow::Result<serde_json::Value> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Build { args } => {
            let request = load_request(&args.request)?;
            let network = NetworkContext { height: args.height };
            let unsigned = assembler(config, &args)?
                .build_unsigned_transaction(&request, &network)
                .context("building transaction")?;
            Ok(serde_json::json!({
                "transaction": unsigned.to_ergo_tx().to_proxy(),
                "feeOutput": unsigned.fee_output.as_ref().map(Proxied::to_proxy),
                "bytesToSign": hex::encode(unsigned.bytes_to_sign()?),
            }))
        }
        Command::Reduce { args, headers } => {
            let request = load_request(&args.request)?;
            let headers = load_headers(&headers)?;
            let network = NetworkContext { height: args.height };
            let reduced = assembler(config, &args)?
                .build_reduced_transaction(&request, &headers, &network)
                .context("reducing transaction")?;
            Ok(serde_json::json!({
                "txId": reduced.tx_id,
                "reducedTx": reduced.to_hex(),
            }))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let output = run(cli)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
