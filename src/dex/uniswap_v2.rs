use alloy::{
    primitives::{Address, U256},
    providers::Provider,
    sol,
};
use async_trait::async_trait;

use super::{Reserves, TokenPair, Venue};
use crate::config::VenueContracts;
use crate::error::{ConfigError, QuoteError, VenueError};

// Uniswap V2 Factory ABI (minimal)
sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

// Uniswap V2 Pair ABI (minimal)
sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );

        function token0() external view returns (address);
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
    }
}

// Uniswap V2 Router ABI (quoting only)
sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function getAmountsIn(uint256 amountOut, address[] calldata path) external view returns (uint256[] memory amounts);
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
    }
}

/// A Uniswap V2 style venue (Uniswap, Sushiswap, any fork with the same ABI)
pub struct UniswapV2Venue<P> {
    name: String,
    provider: P,
    pair: Address,
    router: Address,
    /// The configured quote asset sorts first in the pair
    quote_is_token0: bool,
}

impl<P: Provider + Clone> UniswapV2Venue<P> {
    /// Resolve the pair for `tokens` through the venue's factory.
    pub async fn connect(
        name: impl Into<String>,
        provider: P,
        contracts: VenueContracts,
        tokens: &TokenPair,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let factory = IUniswapV2Factory::new(contracts.factory, &provider);
        let pair: Address = factory
            .getPair(tokens.quote.address, tokens.base.address)
            .call()
            .await
            .map_err(|e| ConfigError::Chain(format!("{}: getPair failed: {}", name, e)))?;

        if pair == Address::ZERO {
            return Err(ConfigError::PairNotFound {
                venue: name,
                token_a: tokens.quote.symbol.clone(),
                token_b: tokens.base.symbol.clone(),
            });
        }

        let token0: Address = IUniswapV2Pair::new(pair, &provider)
            .token0()
            .call()
            .await
            .map_err(|e| ConfigError::Chain(format!("{}: token0 failed: {}", name, e)))?;

        tracing::debug!("{} pair {} (token0 {})", name, pair, token0);

        Ok(Self {
            name,
            provider,
            pair,
            router: contracts.router,
            quote_is_token0: token0 == tokens.quote.address,
        })
    }

    pub fn pair_address(&self) -> Address {
        self.pair
    }

    fn router_error(&self, reason: impl std::fmt::Display) -> QuoteError {
        let reason = reason.to_string();
        // Router reverts carry the library's reason string
        if reason.contains("INSUFFICIENT_LIQUIDITY") {
            QuoteError::InsufficientLiquidity {
                venue: self.name.clone(),
            }
        } else {
            QuoteError::Venue {
                venue: self.name.clone(),
                reason,
            }
        }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync> Venue for UniswapV2Venue<P> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn block_number(&self) -> Option<u64> {
        match self.provider.get_block_number().await {
            Ok(block) => Some(block),
            Err(e) => {
                tracing::debug!("{}: block number unavailable: {}", self.name, e);
                None
            }
        }
    }

    async fn get_reserves(&self) -> Result<Reserves, VenueError> {
        let pair = IUniswapV2Pair::new(self.pair, &self.provider);
        let reserves = pair.getReserves().call().await.map_err(|e| VenueError::Rpc {
            venue: self.name.clone(),
            reason: e.to_string(),
        })?;

        let reserve0 = U256::from(reserves.reserve0);
        let reserve1 = U256::from(reserves.reserve1);

        Ok(if self.quote_is_token0 {
            Reserves::new(reserve1, reserve0)
        } else {
            Reserves::new(reserve0, reserve1)
        })
    }

    async fn quote_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, QuoteError> {
        let router = IUniswapV2Router02::new(self.router, &self.provider);
        let amounts: Vec<U256> = router
            .getAmountsIn(amount_out, path.to_vec())
            .call()
            .await
            .map_err(|e| self.router_error(e))?;

        // amounts[0] is the input at the head of the path
        amounts.first().copied().ok_or_else(|| QuoteError::InvalidPath {
            venue: self.name.clone(),
        })
    }

    async fn quote_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError> {
        let router = IUniswapV2Router02::new(self.router, &self.provider);
        let amounts: Vec<U256> = router
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(|e| self.router_error(e))?;

        amounts.last().copied().ok_or_else(|| QuoteError::InvalidPath {
            venue: self.name.clone(),
        })
    }
}
