//! Spot prices and divergence between the two venues

use std::time::Duration;

use crate::config::bounded;
use crate::dex::{Reserves, Side, Venue};
use crate::error::VenueError;
use crate::math::Fixed;

/// Both pools read within one cycle. The two reads are not atomic with
/// respect to each other.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    /// Head block when the reserves were read, if the venue reports one
    pub block: Option<u64>,
    pub reserves: [Reserves; 2],
    pub price_a: Fixed,
    pub price_b: Fixed,
    /// Signed percentage of A's price relative to B's, unrounded
    pub divergence: Fixed,
}

impl PriceSnapshot {
    pub fn reserves(&self, side: Side) -> Reserves {
        self.reserves[side.index()]
    }
}

/// quote per base in smallest units, truncated. `None` for an empty pool.
pub fn spot_price(reserves: &Reserves) -> Option<Fixed> {
    Fixed::from_u256(reserves.quote).checked_div(&Fixed::from_u256(reserves.base))
}

/// `(price(a) - price(b)) / price(b) * 100`, computed on the cross products
/// so no intermediate quotient is truncated.
pub fn divergence(a: &Reserves, b: &Reserves) -> Option<Fixed> {
    let qa_bb = Fixed::from_u256(a.quote) * Fixed::from_u256(b.base);
    let qb_ba = Fixed::from_u256(b.quote) * Fixed::from_u256(a.base);
    ((qa_bb - qb_ba.clone()) * Fixed::from_int(100)).checked_div(&qb_ba)
}

pub struct PriceOracle {
    call_timeout: Option<Duration>,
}

impl PriceOracle {
    pub fn new(call_timeout: Option<Duration>) -> Self {
        Self { call_timeout }
    }

    async fn read(&self, venue: &dyn Venue) -> Result<Reserves, VenueError> {
        let reserves = bounded(self.call_timeout, venue.get_reserves())
            .await
            .map_err(|_| VenueError::Timeout {
                venue: venue.name().to_string(),
            })??;

        if reserves.is_empty() {
            return Err(VenueError::EmptyReserves {
                venue: venue.name().to_string(),
            });
        }
        Ok(reserves)
    }

    /// Read both pools and compute prices and divergence.
    pub async fn observe(&self, a: &dyn Venue, b: &dyn Venue) -> Result<PriceSnapshot, VenueError> {
        let (reserves, block) = tokio::join!(
            async { tokio::try_join!(self.read(a), self.read(b)) },
            a.block_number()
        );
        let (reserves_a, reserves_b) = reserves?;

        let empty = |venue: &dyn Venue| VenueError::EmptyReserves {
            venue: venue.name().to_string(),
        };
        let price_a = spot_price(&reserves_a).ok_or_else(|| empty(a))?;
        let price_b = spot_price(&reserves_b).ok_or_else(|| empty(b))?;
        let divergence = divergence(&reserves_a, &reserves_b).ok_or_else(|| empty(b))?;

        tracing::debug!(
            "reserves A {:?} B {:?} divergence {}%",
            reserves_a,
            reserves_b,
            divergence
        );

        Ok(PriceSnapshot {
            block,
            reserves: [reserves_a, reserves_b],
            price_a,
            price_b,
            divergence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::local::tests::{venue, ETH};
    use crate::dex::LocalVenue;
    use crate::error::QuoteError;
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;

    fn reserves(base: u128, quote: u128) -> Reserves {
        Reserves::new(U256::from(base), U256::from(quote))
    }

    #[test]
    fn test_equal_prices_have_zero_divergence() {
        let a = reserves(2_000 * ETH, 1_000 * ETH);
        let b = reserves(20 * ETH, 10 * ETH);
        assert!(divergence(&a, &b).unwrap().is_zero());
        assert_eq!(spot_price(&a), spot_price(&b));
    }

    #[test]
    fn test_fixture_divergence() {
        // price A = 10 / 2 = 5, price B = 24 / 4 = 6
        let a = reserves(2, 10);
        let b = reserves(4, 24);
        assert_eq!(spot_price(&a).unwrap(), Fixed::from_int(5));
        assert_eq!(spot_price(&b).unwrap(), Fixed::from_int(6));
        assert_eq!(
            divergence(&a, &b).unwrap(),
            "-16.666666666666666666".parse::<Fixed>().unwrap()
        );
    }

    #[test]
    fn test_divergence_is_roughly_antisymmetric() {
        let a = reserves(1_000 * ETH, 1_000 * ETH);
        let b = reserves(1_000 * ETH, 1_001 * ETH);
        let forward = divergence(&a, &b).unwrap();
        let backward = divergence(&b, &a).unwrap();
        assert!(forward.is_negative() && backward.is_positive());
        assert!((forward + backward).abs() < "0.001".parse::<Fixed>().unwrap());
    }

    #[test]
    fn test_empty_pool_has_no_price() {
        assert!(spot_price(&reserves(0, 10)).is_none());
        assert!(divergence(&reserves(1, 1), &reserves(1, 0)).is_none());
    }

    #[tokio::test]
    async fn test_observe_reads_both_pools() {
        let a = venue("Uniswap", 2 * ETH, 10 * ETH);
        let b = venue("Sushiswap", 4 * ETH, 24 * ETH);
        let snapshot = PriceOracle::new(None).observe(&a, &b).await.unwrap();
        assert_eq!(snapshot.reserves(Side::B), reserves(4 * ETH, 24 * ETH));
        assert_eq!(snapshot.divergence, "-16.666666666666666666".parse::<Fixed>().unwrap());
    }

    /// Local pool behind a node at a fixed height
    struct AtBlock(LocalVenue, u64);

    #[async_trait]
    impl Venue for AtBlock {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn block_number(&self) -> Option<u64> {
            Some(self.1)
        }

        async fn get_reserves(&self) -> Result<Reserves, VenueError> {
            self.0.get_reserves().await
        }

        async fn quote_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, QuoteError> {
            self.0.quote_in(amount_out, path).await
        }

        async fn quote_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError> {
            self.0.quote_out(amount_in, path).await
        }
    }

    #[tokio::test]
    async fn test_observe_records_head_block() {
        let a = AtBlock(venue("Uniswap", 2 * ETH, 10 * ETH), 19_000_000);
        let b = venue("Sushiswap", 4 * ETH, 24 * ETH);
        let snapshot = PriceOracle::new(None).observe(&a, &b).await.unwrap();
        assert_eq!(snapshot.block, Some(19_000_000));

        let snapshot = PriceOracle::new(None).observe(&b, &a).await.unwrap();
        assert_eq!(snapshot.block, None);
    }

    #[tokio::test]
    async fn test_observe_rejects_empty_reserves() {
        let a = venue("Uniswap", 0, 10 * ETH);
        let b = venue("Sushiswap", 4 * ETH, 24 * ETH);
        let err = PriceOracle::new(None).observe(&a, &b).await.unwrap_err();
        assert_eq!(
            err,
            VenueError::EmptyReserves {
                venue: "Uniswap".to_string()
            }
        );
    }
}
