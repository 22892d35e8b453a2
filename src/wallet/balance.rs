use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::sol;

use crate::dex::{Token, TokenPair};
use crate::error::{ConfigError, ExecutionError};

// ERC20 (read-only subset)
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

/// Account holdings relevant to one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub quote: U256,
    pub base: U256,
    /// Native coin, pays gas
    pub native: U256,
}

/// Read decimals and symbol for `address`
pub async fn fetch_token<P: Provider>(provider: &P, address: Address) -> Result<Token, ConfigError> {
    let erc20 = IERC20::new(address, provider);
    let decimals: u8 = erc20
        .decimals()
        .call()
        .await
        .map_err(|e| ConfigError::Chain(format!("decimals() on {}: {}", address, e)))?;
    // Some older tokens return bytes32 here; fall back to the address
    let symbol: String = erc20
        .symbol()
        .call()
        .await
        .unwrap_or_else(|_| address.to_string());

    Ok(Token {
        address,
        symbol,
        decimals,
    })
}

pub async fn fetch_pair<P: Provider>(
    provider: &P,
    quote: Address,
    base: Address,
) -> Result<TokenPair, ConfigError> {
    Ok(TokenPair {
        base: fetch_token(provider, base).await?,
        quote: fetch_token(provider, quote).await?,
    })
}

pub async fn token_balance<P: Provider>(
    provider: &P,
    token: Address,
    account: Address,
) -> Result<U256, ExecutionError> {
    IERC20::new(token, provider)
        .balanceOf(account)
        .call()
        .await
        .map_err(|e| ExecutionError::Balance {
            reason: format!("balanceOf({}) on {}: {}", account, token, e),
        })
}

pub async fn native_balance<P: Provider>(provider: &P, account: Address) -> Result<U256, ExecutionError> {
    provider
        .get_balance(account)
        .await
        .map_err(|e| ExecutionError::Balance {
            reason: format!("eth_getBalance({}): {}", account, e),
        })
}

fn human(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Print wallet balances in a formatted way
pub fn print_balances(account: Address, balances: &BalanceSnapshot, pair: &TokenPair) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      WALLET BALANCES                         ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Wallet: {:?}", account);
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  {:>12}: {:>28}", pair.quote.symbol, human(balances.quote, pair.quote.decimals));
    println!("║  {:>12}: {:>28}", pair.base.symbol, human(balances.base, pair.base.decimals));
    println!("║  {:>12}: {:>28}", "ETH", human(balances.native, 18));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}
