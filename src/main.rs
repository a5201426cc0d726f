use std::sync::Arc;

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};

use duet::adapters::{FilePersistence, ReqwestHttpClient};
use duet::backend::Dispatcher;
use duet::cli::{parse_args, version_line, CliCommand, CliOptions, Repl, USAGE};
use duet::config::ClientConfig;
use duet::engine::ChatEngine;
use duet::logging::init_logging;
use duet::store::SessionStore;

fn main() -> Result<()> {
    let command = parse_args(std::env::args());

    // Handle flags that need no runtime before any initialization
    match &command {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        CliCommand::Invalid(reason) => {
            eprintln!("Error: {}\n\n{}", reason, USAGE);
            std::process::exit(2);
        }
        CliCommand::Health(_) | CliCommand::Run(_) => {}
    }

    color_eyre::install()?;
    init_logging();

    let runtime = tokio::runtime::Runtime::new()?;
    match command {
        CliCommand::Health(options) => runtime.block_on(run_health(options)),
        CliCommand::Run(options) => runtime.block_on(run_chat(options)),
        _ => Ok(()),
    }
}

fn load_config(options: &CliOptions) -> ClientConfig {
    options.apply(ClientConfig::from_env())
}

fn build_dispatcher(config: &ClientConfig) -> Result<Dispatcher> {
    let http = ReqwestHttpClient::with_connect_timeout(config.connect_timeout)
        .wrap_err("Failed to build HTTP client")?;
    Ok(Dispatcher::from_config(config, Arc::new(http)))
}

async fn run_health(options: CliOptions) -> Result<()> {
    let config = load_config(&options);
    let dispatcher = build_dispatcher(&config)?;

    match dispatcher.health_check().await {
        Ok(true) => {
            println!("{} is up", config.base_url);
            Ok(())
        }
        Ok(false) => bail!("{} answered with an error status", config.base_url),
        Err(e) => Err(e).wrap_err_with(|| format!("{} is unreachable", config.base_url)),
    }
}

async fn run_chat(options: CliOptions) -> Result<()> {
    let config = load_config(&options);
    info!(
        "Starting duet against {} (mode {}, data in {})",
        config.base_url,
        config.default_mode,
        config.data_dir.display()
    );

    let dispatcher = build_dispatcher(&config)?;
    let store = SessionStore::open(FilePersistence::new(&config.data_dir));
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Arc::new(ChatEngine::new(store, dispatcher).with_updates(tx));

    println!(
        "{} - session {} ({} mode). Type /help for commands.",
        version_line(),
        engine.current_session_id(),
        config.default_mode
    );

    let mut repl = Repl::new(engine.clone(), config.default_mode, std::io::stdout()).with_updates(rx);
    repl.run(BufReader::new(tokio::io::stdin()))
        .await
        .wrap_err("Failed to read input")?;

    let flushed = engine.with_store(|store| store.flush());
    if !flushed {
        warn!("Some changes could not be saved to {}", config.data_dir.display());
    }
    Ok(())
}
