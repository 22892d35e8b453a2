use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use clap::{Parser, Subcommand};
use eyre::{eyre, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod dex;
mod display;
mod error;
mod execution;
mod math;
mod monitor;
mod price;
mod simulation;
mod stats;
mod trader;
mod wallet;

use config::Config;
use dex::{LocalVenue, Reserves, Token, TokenPair, UniswapV2Venue, Venue};
use execution::{ContractBackend, ExecutionMode, TradeExecutor};
use math::Fixed;
use price::PriceOracle;
use simulation::{EqualizationSolver, ProfitabilityEvaluator, QuoteSimulator};
use stats::CycleJournal;
use trader::{Assessor, CycleOutcome, EventGate};

#[derive(Parser)]
#[command(name = "pair-arb")]
#[command(about = "Two-pool constant-product arbitrage monitor", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch swaps on both pools and evaluate after each one (default)
    Watch,

    /// Run a single evaluation cycle now, never submitting a trade
    Check,

    /// Evaluate two offline pools without touching a chain
    Evaluate {
        /// Pool A reserves as BASE,QUOTE in whole tokens (18 decimals)
        #[arg(long)]
        pool_a: String,

        /// Pool B reserves as BASE,QUOTE in whole tokens (18 decimals)
        #[arg(long)]
        pool_b: String,

        /// Swap fee of both pools in basis points
        #[arg(long, default_value = "30")]
        fee_bps: u32,

        /// Minimum absolute divergence in percent
        #[arg(long, default_value = "0.5")]
        threshold: String,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder().with_env_filter(filter);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn connect(config: &Config) -> Result<DynProvider> {
    let ws = WsConnect::new(config.require_rpc_url()?);
    let provider = match &config.signer {
        Some(signer) => ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_ws(ws)
            .await?
            .erased(),
        None => ProviderBuilder::new().connect_ws(ws).await?.erased(),
    };
    Ok(provider)
}

/// Wire venues, pricing and execution around one provider.
/// Returns the gate, the two pair addresses (A, B) and the resolved tokens.
async fn build_gate(
    config: &Config,
    provider: &DynProvider,
    mode: ExecutionMode,
) -> Result<(Arc<EventGate>, [Address; 2], TokenPair)> {
    let pair = wallet::fetch_pair(provider, config.arb_for, config.arb_against).await?;
    info!(
        "pair: {} ({}) against {} ({})",
        pair.quote.symbol, pair.quote.address, pair.base.symbol, pair.base.address
    );

    let venue_a = UniswapV2Venue::connect("Uniswap", provider.clone(), config.uniswap, &pair).await?;
    let venue_b =
        UniswapV2Venue::connect("Sushiswap", provider.clone(), config.sushiswap, &pair).await?;
    let pairs = [venue_a.pair_address(), venue_b.pair_address()];

    let assessor = Assessor::new(
        Arc::new(venue_a),
        Arc::new(venue_b),
        pair.clone(),
        PriceOracle::new(config.call_timeout),
        EqualizationSolver::new(config.threshold.clone()),
        ProfitabilityEvaluator::new(
            QuoteSimulator::new(config.call_timeout),
            config.gas_limit,
            config.gas_price,
        ),
        config.display_precision,
    );

    let backend = ContractBackend::new(
        provider.clone(),
        config.require_account()?,
        config.arbitrage_contract,
    );
    let executor = TradeExecutor::new(Arc::new(backend), mode, config.call_timeout);

    let mut gate = EventGate::new(assessor, executor, config.gas_limit);
    if let Some(path) = &config.journal_path {
        let journal = CycleJournal::open(path)?;
        info!("journaling cycles to {}", journal.path().display());
        gate = gate.with_journal(journal);
    }

    Ok((Arc::new(gate), pairs, pair))
}

async fn run_watch(config: Config) -> Result<()> {
    let provider = connect(&config).await?;
    let mode = config.execution_mode();
    let (gate, pairs, _) = build_gate(&config, &provider, mode).await?;

    info!(
        "threshold {}% | gas limit {} | mode {:?}",
        config.threshold, config.gas_limit, mode
    );
    monitor::watch_swaps(&provider, pairs, gate).await
}

async fn run_check(config: Config) -> Result<()> {
    let provider = connect(&config).await?;
    let account = config.require_account()?;
    let (gate, _, pair) = build_gate(&config, &provider, ExecutionMode::SimulationOnly).await?;

    let balances = wallet::BalanceSnapshot {
        quote: wallet::token_balance(&provider, pair.quote.address, account).await?,
        base: wallet::token_balance(&provider, pair.base.address, account).await?,
        native: wallet::native_balance(&provider, account).await?,
    };
    wallet::print_balances(account, &balances, &pair);

    match gate.check().await? {
        CycleOutcome::Executed { receipt, .. } => info!("simulated trade, receipt net {}", receipt.net),
        CycleOutcome::NotProfitable { .. } => info!("opportunity rejected"),
        CycleOutcome::NoOpportunity { .. } => info!("no opportunity"),
        CycleOutcome::Dropped => {}
    }
    Ok(())
}

fn parse_pool(raw: &str) -> Result<Reserves> {
    let (base, quote) = raw
        .split_once(',')
        .ok_or_else(|| eyre!("expected BASE,QUOTE, got {}", raw))?;
    let amount = |value: &str| -> Result<U256> {
        let value = value.trim();
        if value.starts_with('-') {
            return Err(eyre!("reserves must be positive: {}", value));
        }
        Ok(parse_units(value, 18)?.get_absolute())
    };
    Ok(Reserves::new(amount(base)?, amount(quote)?))
}

async fn run_evaluate(pool_a: &str, pool_b: &str, fee_bps: u32, threshold: &str) -> Result<()> {
    let pair = TokenPair {
        base: Token {
            address: Address::repeat_byte(0xbb),
            symbol: "BASE".to_string(),
            decimals: 18,
        },
        quote: Token {
            address: Address::repeat_byte(0xaa),
            symbol: "QUOTE".to_string(),
            decimals: 18,
        },
    };
    let venue_a: Arc<dyn Venue> = Arc::new(LocalVenue::new("A", &pair, parse_pool(pool_a)?, fee_bps));
    let venue_b: Arc<dyn Venue> = Arc::new(LocalVenue::new("B", &pair, parse_pool(pool_b)?, fee_bps));
    let threshold: Fixed = threshold.parse()?;

    let assessor = Assessor::new(
        venue_a,
        venue_b,
        pair,
        PriceOracle::new(None),
        EqualizationSolver::new(threshold),
        ProfitabilityEvaluator::new(QuoteSimulator::new(None), config::DEFAULT_GAS_LIMIT, U256::ZERO),
        config::DEFAULT_DISPLAY_PRECISION,
    );

    let assessment = assessor.assess(None).await?;
    match (&assessment.opportunity, &assessment.decision) {
        (Some(opportunity), Some(decision)) => info!(
            "{} | go: {}",
            opportunity.direction, decision.go
        ),
        _ => info!(
            "no opportunity at {:.4}% divergence",
            assessment.snapshot.divergence
        ),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    match cli.command {
        Some(Commands::Watch) | None => run_watch(Config::from_env()?).await,
        Some(Commands::Check) => run_check(Config::from_env()?).await,
        Some(Commands::Evaluate {
            pool_a,
            pool_b,
            fee_bps,
            threshold,
        }) => run_evaluate(&pool_a, &pool_b, fee_bps, &threshold).await,
    }
}
