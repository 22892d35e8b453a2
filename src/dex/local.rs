//! In-memory constant-product venue.
//!
//! Quotes with the same integer formulas a Uniswap V2 router uses, against
//! reserves held in process. Used for offline evaluation and as a test venue.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use parking_lot::RwLock;

use super::{amm, Reserves, TokenPair, Venue};
use crate::error::{QuoteError, VenueError};

pub struct LocalVenue {
    name: String,
    base: Address,
    quote: Address,
    fee_bps: u32,
    reserves: RwLock<Reserves>,
}

impl LocalVenue {
    pub fn new(name: impl Into<String>, pair: &TokenPair, reserves: Reserves, fee_bps: u32) -> Self {
        Self {
            name: name.into(),
            base: pair.base.address,
            quote: pair.quote.address,
            fee_bps,
            reserves: RwLock::new(reserves),
        }
    }

    /// Replace the pool state, as an external swap would.
    #[cfg(test)]
    pub fn set_reserves(&self, reserves: Reserves) {
        *self.reserves.write() = reserves;
    }

    /// (reserve_in, reserve_out) for a two-hop path over this pair.
    fn orient(&self, path: &[Address]) -> Result<(U256, U256), QuoteError> {
        let reserves = *self.reserves.read();
        match path {
            [from, to] if *from == self.quote && *to == self.base => {
                Ok((reserves.quote, reserves.base))
            }
            [from, to] if *from == self.base && *to == self.quote => {
                Ok((reserves.base, reserves.quote))
            }
            _ => Err(QuoteError::InvalidPath {
                venue: self.name.clone(),
            }),
        }
    }
}

#[async_trait]
impl Venue for LocalVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_reserves(&self) -> Result<Reserves, VenueError> {
        Ok(*self.reserves.read())
    }

    async fn quote_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, QuoteError> {
        let (reserve_in, reserve_out) = self.orient(path)?;
        amm::get_amount_in(amount_out, reserve_in, reserve_out, self.fee_bps).ok_or_else(|| {
            QuoteError::InsufficientLiquidity {
                venue: self.name.clone(),
            }
        })
    }

    async fn quote_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError> {
        let (reserve_in, reserve_out) = self.orient(path)?;
        amm::get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps).ok_or_else(|| {
            QuoteError::InsufficientLiquidity {
                venue: self.name.clone(),
            }
        })
    }
}
