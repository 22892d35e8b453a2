//! Runtime configuration, loaded once at startup from the environment (.env)

use std::future::IntoFuture;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::utils::parse_units;
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use tokio::time::error::Elapsed;

use crate::error::ConfigError;
use crate::execution::ExecutionMode;
use crate::math::Fixed;

pub const DEFAULT_GAS_LIMIT: u64 = 400_000;
pub const DEFAULT_GAS_PRICE_GWEI: &str = "50";
pub const DEFAULT_DISPLAY_PRECISION: u32 = 2;
pub const MAX_DISPLAY_PRECISION: u32 = 18;

/// Canonical Uniswap V2 style deployments on Ethereum mainnet
pub mod contracts {
    use alloy::primitives::{address, Address};

    pub const UNISWAP_V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
    pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

    pub const SUSHISWAP_FACTORY: Address = address!("C0AEe478e3658e2610c5F7A4A2E1777cE9e4f2Ac");
    pub const SUSHISWAP_ROUTER: Address = address!("d9e1cE17f2641f24aE83637ab66a2cca9C378B9F");
}

/// Factory + router of one venue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueContracts {
    pub factory: Address,
    pub router: Address,
}

#[derive(Debug)]
pub struct Config {
    pub rpc_url: Option<String>,
    /// Asset profit is measured in (quote)
    pub arb_for: Address,
    /// Asset traded against it (base)
    pub arb_against: Address,
    /// Minimum absolute divergence, in percent
    pub threshold: Fixed,
    pub gas_limit: u64,
    /// Wei per gas unit
    pub gas_price: U256,
    pub display_precision: u32,
    pub live_execution: bool,
    pub signer: Option<PrivateKeySigner>,
    pub account: Option<Address>,
    pub arbitrage_contract: Option<Address>,
    pub uniswap: VenueContracts,
    pub sushiswap: VenueContracts,
    pub call_timeout: Option<Duration>,
    pub journal_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let arb_for = parse_address("ARB_FOR", get("ARB_FOR"))?
            .ok_or(ConfigError::MissingField { field: "ARB_FOR" })?;
        let arb_against = parse_address("ARB_AGAINST", get("ARB_AGAINST"))?
            .ok_or(ConfigError::MissingField { field: "ARB_AGAINST" })?;
        if arb_for == arb_against {
            return Err(ConfigError::InvalidValue {
                field: "ARB_AGAINST",
                reason: "must differ from ARB_FOR".to_string(),
            });
        }

        let threshold_raw = get("PRICE_DIFFERENCE")
            .ok_or(ConfigError::MissingField { field: "PRICE_DIFFERENCE" })?;
        let threshold = Fixed::from_str(&threshold_raw).map_err(|e| ConfigError::InvalidValue {
            field: "PRICE_DIFFERENCE",
            reason: e.to_string(),
        })?;
        if threshold.is_negative() {
            return Err(ConfigError::InvalidValue {
                field: "PRICE_DIFFERENCE",
                reason: "must not be negative".to_string(),
            });
        }

        let gas_limit = match get("GAS_LIMIT") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: "GAS_LIMIT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_GAS_LIMIT,
        };

        let gas_price_raw = get("GAS_PRICE_GWEI").unwrap_or_else(|| DEFAULT_GAS_PRICE_GWEI.to_string());
        if gas_price_raw.starts_with('-') {
            return Err(ConfigError::InvalidValue {
                field: "GAS_PRICE_GWEI",
                reason: "must not be negative".to_string(),
            });
        }
        let gas_price = parse_units(&gas_price_raw, "gwei")
            .map_err(|e| ConfigError::InvalidValue {
                field: "GAS_PRICE_GWEI",
                reason: e.to_string(),
            })?
            .get_absolute();

        let display_precision = match get("UNITS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p <= MAX_DISPLAY_PRECISION)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "UNITS",
                    reason: format!("expected an integer in 0..={}", MAX_DISPLAY_PRECISION),
                })?,
            None => DEFAULT_DISPLAY_PRECISION,
        };

        let live_execution = parse_bool("LIVE_EXECUTION", get("LIVE_EXECUTION"))?;

        let signer = match get("PRIVATE_KEY") {
            Some(raw) => Some(PrivateKeySigner::from_str(&raw).map_err(|e| {
                ConfigError::InvalidValue {
                    field: "PRIVATE_KEY",
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };
        let account = match &signer {
            Some(signer) => Some(signer.address()),
            None => parse_address("ACCOUNT_ADDRESS", get("ACCOUNT_ADDRESS"))?,
        };

        let arbitrage_contract = parse_address("ARBITRAGE_CONTRACT", get("ARBITRAGE_CONTRACT"))?;
        if live_execution {
            if signer.is_none() {
                return Err(ConfigError::MissingField { field: "PRIVATE_KEY" });
            }
            if arbitrage_contract.is_none() {
                return Err(ConfigError::MissingField { field: "ARBITRAGE_CONTRACT" });
            }
        }

        let uniswap = VenueContracts {
            factory: parse_address("UNISWAP_FACTORY", get("UNISWAP_FACTORY"))?
                .unwrap_or(contracts::UNISWAP_V2_FACTORY),
            router: parse_address("UNISWAP_ROUTER", get("UNISWAP_ROUTER"))?
                .unwrap_or(contracts::UNISWAP_V2_ROUTER),
        };
        let sushiswap = VenueContracts {
            factory: parse_address("SUSHISWAP_FACTORY", get("SUSHISWAP_FACTORY"))?
                .unwrap_or(contracts::SUSHISWAP_FACTORY),
            router: parse_address("SUSHISWAP_ROUTER", get("SUSHISWAP_ROUTER"))?
                .unwrap_or(contracts::SUSHISWAP_ROUTER),
        };

        let call_timeout = match get("CALL_TIMEOUT_MS") {
            Some(raw) => Some(Duration::from_millis(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue {
                    field: "CALL_TIMEOUT_MS",
                    reason: e.to_string(),
                }
            })?)),
            None => None,
        };

        Ok(Self {
            rpc_url: get("RPC_URL"),
            arb_for,
            arb_against,
            threshold,
            gas_limit,
            gas_price,
            display_precision,
            live_execution,
            signer,
            account,
            arbitrage_contract,
            uniswap,
            sushiswap,
            call_timeout,
            journal_path: get("CYCLE_JOURNAL").map(PathBuf::from),
        })
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.live_execution {
            ExecutionMode::Live
        } else {
            ExecutionMode::SimulationOnly
        }
    }

    pub fn require_rpc_url(&self) -> Result<&str, ConfigError> {
        self.rpc_url
            .as_deref()
            .ok_or(ConfigError::MissingField { field: "RPC_URL" })
    }

    pub fn require_account(&self) -> Result<Address, ConfigError> {
        self.account.ok_or(ConfigError::MissingField {
            field: "PRIVATE_KEY or ACCOUNT_ADDRESS",
        })
    }
}

fn parse_address(field: &'static str, raw: Option<String>) -> Result<Option<Address>, ConfigError> {
    raw.map(|value| {
        Address::from_str(&value).map_err(|e| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn parse_bool(field: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected true/false, got {}", other),
        }),
    }
}

/// Await `fut`, giving up after `limit` when one is configured.
pub async fn bounded<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Elapsed>
where
    F: IntoFuture,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut.into_future()).await,
        None => Ok(fut.await),
    }
}
