//! moltmint - automated token agents for the Moltbook platform.
//!
//! Runs a fleet of bot accounts through mint, wallet-link and transfer
//! inscriptions, one cooldown-tracked bot at a time.

use anyhow::{Context, Result};
use clap::Parser;
use moltmint::accounts::{load_bots, ProxyPool};
use moltmint::cli::{Cli, Commands};
use moltmint::config::{Config, LlmBackend};
use moltmint::gateway::PlatformGateway;
use moltmint::http::ProxiedHttpClient;
use moltmint::llm::{ClaudeClient, LlmClient, OllamaClient};
use moltmint::retry::RetryPolicy;
use moltmint::scheduler::MintScheduler;
use moltmint::solver::ChallengeSolver;
use moltmint::status::StatusStore;
use moltmint::token::MintPayload;
use std::io::{stdin, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("moltmint.toml"));

    match cli.command {
        Commands::Init { path } => init_config(&path.unwrap_or(config_path)),
        Commands::AutoMint => {
            let config = load_config(&config_path)?;
            let mut scheduler = build_scheduler(&config)?;
            print_banner(&config, scheduler.bots().len());
            scheduler.run().await;
            Ok(())
        }
        Commands::LinkWallet => {
            let config = load_config(&config_path)?;
            if config.mint.wallet.is_empty() {
                anyhow::bail!("mint.wallet is empty; set it in the config before linking");
            }
            let mut scheduler = build_scheduler(&config)?;
            let report = scheduler.run_link(&config.mint.wallet).await;
            println!(
                "\nLink complete: {} linked, {} skipped, {} failed",
                report.linked, report.skipped, report.failed
            );
            Ok(())
        }
        Commands::Transfer => {
            let config = load_config(&config_path)?;
            let mut scheduler = build_scheduler(&config)?;
            run_transfer_prompt(&config, &mut scheduler).await
        }
    }
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{:?} already exists, refusing to overwrite", path);
    }
    Config::default_config().to_file(path)?;
    println!("Wrote default configuration to {:?}", path);
    println!("Fill in mint.wallet and create the accounts files before running.");
    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path)
        .with_context(|| format!("Cannot load {:?}. Run 'moltmint init' to create one", path))
}

/// Wire up all the components from configuration
fn build_scheduler(config: &Config) -> Result<MintScheduler> {
    let bots = load_bots(&config.accounts.bots_file)?;
    if bots.is_empty() {
        anyhow::bail!(
            "No bot accounts found in {:?}",
            config.accounts.bots_file
        );
    }

    let proxies = ProxyPool::load(&config.accounts.proxies_file)?;
    if proxies.is_empty() {
        println!("No proxies configured, using direct connections");
    } else {
        println!("Loaded {} proxies for rotation", proxies.len());
    }

    let store = StatusStore::load(&config.accounts.status_file);

    let llm: Arc<dyn LlmClient> = match config.llm.backend {
        LlmBackend::ClaudeApi => Arc::new(ClaudeClient::new(
            config.llm.resolve_api_key()?,
            config.llm.model.clone(),
        )?),
        LlmBackend::Ollama => {
            Arc::new(OllamaClient::new(&config.llm.ollama_url, &config.llm.model)?)
        }
    };

    let http = ProxiedHttpClient::new(
        Duration::from_secs(config.network.request_timeout_secs),
        config.network.proxy_plain_http,
    );
    let retry = RetryPolicy::new(
        config.network.max_retries,
        Duration::from_millis(config.network.retry_base_delay_ms),
    );
    let gateway = PlatformGateway::new(
        http,
        retry,
        proxies,
        &config.platform.api_base,
        &config.platform.submolt,
    );

    let payload = MintPayload::mint(
        &config.mint.protocol,
        &config.mint.ticker,
        config.mint.amount,
    );

    Ok(MintScheduler::new(
        Arc::new(gateway),
        ChallengeSolver::new(llm),
        store,
        bots,
        payload,
        config.schedule.clone(),
    ))
}

fn print_banner(config: &Config, bot_count: usize) {
    println!("{}", "=".repeat(64));
    println!("   moltmint auto-mint");
    println!("{}", "=".repeat(64));
    println!("\nBots: {}", bot_count);
    println!("Mint: {} x{} ({})", config.mint.ticker, config.mint.amount, config.mint.protocol);
    println!("Model: {}", config.llm.model);
    println!("Cooldown: {}s", config.schedule.default_cooldown_secs);
    println!("\nPress Ctrl+C to stop.\n");
}

/// One-shot interactive transfer
async fn run_transfer_prompt(config: &Config, scheduler: &mut MintScheduler) -> Result<()> {
    println!("Accounts:");
    for (index, bot) in scheduler.bots().iter().enumerate() {
        println!("  [{}] {}", index, bot.name);
    }
    println!();

    let index: usize = prompt("Sender index: ")?
        .parse()
        .context("Sender index must be a number")?;
    let to = prompt("Recipient name: ")?;
    if to.is_empty() {
        anyhow::bail!("Recipient name cannot be empty");
    }
    let ticker_input = prompt(&format!("Ticker [{}]: ", config.mint.ticker))?;
    let ticker = if ticker_input.is_empty() {
        config.mint.ticker.clone()
    } else {
        ticker_input
    };
    let amount: u64 = prompt("Amount: ")?
        .parse()
        .context("Amount must be a positive whole number")?;

    let finalized = scheduler.run_transfer(index, &ticker, amount, &to).await?;
    if finalized {
        println!("\nTransfer posted.");
    } else {
        println!("\nTransfer did not finalize, see the log above.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
