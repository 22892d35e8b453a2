pub mod amm;
pub mod local;
pub mod uniswap_v2;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::{QuoteError, VenueError};

pub use local::LocalVenue;
pub use uniswap_v2::UniswapV2Venue;

/// One of the two venues being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Pool reserves in smallest on-chain units.
///
/// `quote` is the asset profit is measured in (ARB_FOR), `base` is the asset
/// being traded against it (ARB_AGAINST). Spot price is `quote / base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    pub base: U256,
    pub quote: U256,
}

impl Reserves {
    pub fn new(base: U256, quote: U256) -> Self {
        Self { base, quote }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_zero() || self.quote.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// The two traded assets, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub base: Token,
    pub quote: Token,
}

impl TokenPair {
    /// Spend quote, receive base.
    pub fn buy_path(&self) -> [Address; 2] {
        [self.quote.address, self.base.address]
    }

    /// Spend base, receive quote.
    pub fn sell_path(&self) -> [Address; 2] {
        [self.base.address, self.quote.address]
    }
}

/// Read and quote capabilities of a single constant-product venue.
///
/// Both quote functions are deterministic and fee-aware; they fail with a
/// `QuoteError` when the requested path cannot be filled.
#[async_trait]
pub trait Venue: Send + Sync {
    fn name(&self) -> &str;

    /// Chain head as seen by this venue's connection, when it has one.
    async fn block_number(&self) -> Option<u64> {
        None
    }

    /// Current reserves, oriented as (base, quote).
    async fn get_reserves(&self) -> Result<Reserves, VenueError>;

    /// Input needed at `path[0]` to receive exactly `amount_out` at the end of `path`.
    async fn quote_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, QuoteError>;

    /// Output at the end of `path` for exactly `amount_in` at `path[0]`.
    async fn quote_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError>;
}
