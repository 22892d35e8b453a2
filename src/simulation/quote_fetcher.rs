//! Quote Fetcher Module
//!
//! Prices a candidate round trip with each venue's own quoting: the cost of
//! acquiring the base asset on the buy venue, and the proceeds of selling the
//! same amount back on the sell venue.

use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::config::bounded;
use crate::dex::{TokenPair, Venue};
use crate::error::QuoteError;
use crate::math::Fixed;

/// Exact quotes for one candidate round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    /// Base asset bought and sold back, smallest units
    pub size: U256,
    /// Quote asset paid on the buy venue
    pub amount_in: U256,
    /// Quote asset received on the sell venue
    pub amount_out: U256,
}

pub struct QuoteSimulator {
    call_timeout: Option<Duration>,
}

impl QuoteSimulator {
    pub fn new(call_timeout: Option<Duration>) -> Self {
        Self { call_timeout }
    }

    async fn quote_in(
        &self,
        venue: &dyn Venue,
        amount_out: U256,
        path: &[Address],
    ) -> Result<U256, QuoteError> {
        bounded(self.call_timeout, venue.quote_in(amount_out, path))
            .await
            .map_err(|_| QuoteError::Timeout {
                venue: venue.name().to_string(),
            })?
    }

    async fn quote_out(
        &self,
        venue: &dyn Venue,
        amount_in: U256,
        path: &[Address],
    ) -> Result<U256, QuoteError> {
        bounded(self.call_timeout, venue.quote_out(amount_in, path))
            .await
            .map_err(|_| QuoteError::Timeout {
                venue: venue.name().to_string(),
            })?
    }

    /// Quote buying `size` base on `buy` and selling it on `sell`.
    ///
    /// `size` is truncated to whole smallest units; anything that truncates
    /// to zero or below is rejected before a venue is asked.
    pub async fn simulate(
        &self,
        buy: &dyn Venue,
        sell: &dyn Venue,
        pair: &TokenPair,
        size: &Fixed,
    ) -> Result<Quote, QuoteError> {
        let size = size
            .floor_u256()
            .filter(|s| !s.is_zero())
            .ok_or(QuoteError::InvalidAmount)?;

        let amount_in = self.quote_in(buy, size, &pair.buy_path()).await?;
        let amount_out = self.quote_out(sell, size, &pair.sell_path()).await?;

        tracing::debug!(
            "quoted {} base: {} in on {}, {} out on {}",
            size,
            amount_in,
            buy.name(),
            amount_out,
            sell.name()
        );

        Ok(Quote {
            size,
            amount_in,
            amount_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::local::tests::{test_pair, venue, ETH};

    #[tokio::test]
    async fn test_quotes_both_legs() {
        let pair = test_pair();
        let a = venue("Uniswap", 1_000 * ETH, 1_000 * ETH);
        let b = venue("Sushiswap", 1_000 * ETH, 1_100 * ETH);
        let size: Fixed = "24099927051466820645.615363759899810407".parse().unwrap();

        let quote = QuoteSimulator::new(None)
            .simulate(&a, &b, &pair, &size)
            .await
            .unwrap();
        assert_eq!(quote.size, U256::from(24_099_927_051_466_820_645u128));
        assert_eq!(quote.amount_in, U256::from(24_769_384_750_210_469_731u128));
        assert_eq!(quote.amount_out, U256::from(25_810_231_378_031_792_195u128));
    }

    #[tokio::test]
    async fn test_rejects_sub_unit_and_negative_sizes() {
        let pair = test_pair();
        let a = venue("Uniswap", 1_000 * ETH, 1_000 * ETH);
        let b = venue("Sushiswap", 1_000 * ETH, 1_100 * ETH);
        let simulator = QuoteSimulator::new(None);

        for size in ["0.75", "0", "-3"] {
            let err = simulator
                .simulate(&a, &b, &pair, &size.parse().unwrap())
                .await
                .unwrap_err();
            assert_eq!(err, QuoteError::InvalidAmount);
        }
    }

    #[tokio::test]
    async fn test_depth_exceeded_propagates() {
        let pair = test_pair();
        let a = venue("Uniswap", 10 * ETH, 10 * ETH);
        let b = venue("Sushiswap", 1_000 * ETH, 1_100 * ETH);
        let err = QuoteSimulator::new(None)
            .simulate(&a, &b, &pair, &Fixed::from_u256(U256::from(20 * ETH)))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::InsufficientLiquidity { .. }));
    }
}
