//! Gamma contract runner
//!
//! Loads a contract definition, executes it against a gamma budget and
//! prints the outcome as JSON.
//!
//! Exit codes: 0 on success, 1 when the execution failed, 2 on usage or I/O
//! errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gamma_program_runtime::{ContextOptions, InMemoryChainState, Value};
use gamma_vm::{ContractCode, EngineConfig, ExecutionEngine, ExecutionOutcome};

/// Run a Gamma contract definition against a gamma budget
#[derive(Parser, Debug)]
#[command(name = "gamma-run", version, about, long_about = None)]
struct Cli {
    /// Contract definition (JSON)
    contract: PathBuf,

    /// Gamma budget of the execution
    #[arg(long)]
    budget: u64,

    /// Execution context options (JSON); the --block-* flags override its fields
    #[arg(long)]
    options: Option<PathBuf>,

    /// Block index
    #[arg(long)]
    block_index: Option<u64>,

    /// Block hash
    #[arg(long)]
    block_hash: Option<String>,

    /// Block nonce
    #[arg(long)]
    block_nonce: Option<u64>,

    /// Transaction id
    #[arg(long)]
    transaction_id: Option<String>,

    /// Public operation to run instead of the entry point
    #[arg(long)]
    entry: Option<String>,

    /// Operation arguments as a JSON array
    #[arg(long, requires = "entry")]
    args: Option<String>,

    /// Contract definition to register for cross-contract calls (repeatable)
    #[arg(long)]
    register: Vec<PathBuf>,

    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Include the forwarded state updates in the output
    #[arg(long)]
    show_updates: bool,

    /// Echo contract log messages to stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.debug {
            log::LevelFilter::Info
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let exit_code = match run(&cli) {
        Ok(success) => {
            if success {
                0
            } else {
                1
            }
        }
        Err(err) => {
            eprintln!("gamma-run: {:#}", err);
            2
        }
    };

    process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => serde_json::from_str::<EngineConfig>(&read(path)?)
            .with_context(|| format!("invalid engine configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.debug_mode |= cli.debug;

    let chain = Arc::new(InMemoryChainState::new());
    let mut engine = ExecutionEngine::new(config)?
        .with_storage(chain.clone())
        .with_state_sink(chain.clone());

    for path in &cli.register {
        let name = engine
            .register(ContractCode::Json(read(path)?))
            .with_context(|| format!("cannot register {}", path.display()))?;
        log::debug!("registered {} from {}", name, path.display());
    }

    let code = ContractCode::Json(read(&cli.contract)?);
    let options = context_options(cli)?;

    let outcome = match &cli.entry {
        Some(operation) => {
            let args = parse_args(cli.args.as_deref())?;
            engine.execute_call(&code, &options, cli.budget, operation, args)
        }
        None => engine.execute(&code, &options, cli.budget),
    };

    print_outcome(&outcome, cli.show_updates.then_some(chain.as_ref()))?;
    Ok(outcome.is_success())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn context_options(cli: &Cli) -> Result<ContextOptions> {
    let mut options = match &cli.options {
        Some(path) => serde_json::from_str::<ContextOptions>(&read(path)?)
            .with_context(|| format!("invalid context options {}", path.display()))?,
        None => ContextOptions::default(),
    };
    if cli.block_index.is_some() {
        options.block_index = cli.block_index;
    }
    if cli.block_hash.is_some() {
        options.block_hash = cli.block_hash.clone();
    }
    if cli.block_nonce.is_some() {
        options.block_nonce = cli.block_nonce;
    }
    if cli.transaction_id.is_some() {
        options.transaction_id = cli.transaction_id.clone();
    }
    Ok(options)
}

fn parse_args(args: Option<&str>) -> Result<Vec<Value>> {
    let Some(args) = args else {
        return Ok(Vec::new());
    };
    let json: serde_json::Value = serde_json::from_str(args).context("--args is not valid JSON")?;
    let serde_json::Value::Array(items) = json else {
        bail!("--args must be a JSON array");
    };
    items
        .iter()
        .map(|item| Value::from_json(item).with_context(|| format!("unsupported argument {}", item)))
        .collect()
}

fn print_outcome(outcome: &ExecutionOutcome, chain: Option<&InMemoryChainState>) -> Result<()> {
    let mut json = outcome.to_json();
    if let (Some(chain), serde_json::Value::Object(map)) = (chain, &mut json) {
        map.insert(
            "state_updates".to_string(),
            serde_json::to_value(chain.updates()?)?,
        );
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
