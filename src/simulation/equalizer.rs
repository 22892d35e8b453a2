//! Price equalization sizing.
//!
//! Treats each pool as `x * y = k` with `x` the quote reserve and `y` the base
//! reserve, and moves both pools to the price they would have if their
//! liquidity were merged. The base shift that gets pool P there is the trade
//! size; pushing the same shift through the other pool tells whether the
//! round trip returns more quote than it costs. This ignores fees, which the
//! quote simulation accounts for afterwards.

use crate::dex::{Reserves, Side};
use crate::math::Fixed;
use crate::price::PriceSnapshot;

/// Buy the base asset on `buy`, sell it back on `sell`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub buy: Side,
    pub sell: Side,
}

impl Direction {
    pub fn buy_first_on(buy: Side) -> Self {
        Self {
            buy,
            sell: buy.other(),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buy on {} / sell on {}", self.buy, self.sell)
    }
}

/// Merged-liquidity price `quote / base`, held as an exact ratio.
///
/// Raw prices of low-value tokens sit far below one smallest unit, so the
/// quotient is never formed on the sizing path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedPrice {
    pub quote: Fixed,
    pub base: Fixed,
}

impl SyncedPrice {
    /// Lossy, for display.
    pub fn to_f64(&self) -> f64 {
        self.quote.to_f64() / self.base.to_f64()
    }
}

/// Where one pool lands at the synced price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTarget {
    pub k: Fixed,
    /// `y' = sqrt(k / synced)`, the base reserve at the synced price
    pub target_base: Fixed,
    /// `y - y'`, base leaving the pool
    pub delta: Fixed,
    /// `k / y' - x`, quote entering the pool
    pub spent: Fixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equalization {
    pub synced: SyncedPrice,
    pub a: PoolTarget,
    pub b: PoolTarget,
    /// Quote returned by A when B's delta is pushed into it
    pub received_from_a: Option<Fixed>,
    /// Quote returned by B when A's delta is pushed into it
    pub received_from_b: Option<Fixed>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opportunity {
    pub direction: Direction,
    /// Base asset to buy, truncated to whole units before quoting
    pub size: Fixed,
    /// Quote asset, before fees
    pub profit_before_fees: Fixed,
    pub divergence: Fixed,
    pub equalization: Equalization,
}

fn target(reserves: &Reserves, synced: &SyncedPrice) -> Option<PoolTarget> {
    let x = Fixed::from_u256(reserves.quote);
    let y = Fixed::from_u256(reserves.base);
    let k = &x * &y;

    // k / (quote / base) == k * base / quote
    let target_base = (&k * &synced.base).checked_div(&synced.quote)?.sqrt()?;
    if !target_base.is_positive() {
        return None;
    }
    let delta = &y - &target_base;
    let spent = &k.checked_div(&target_base)? - &x;

    Some(PoolTarget {
        k,
        target_base,
        delta,
        spent,
    })
}

/// `x - k / (y + delta)`; undefined when the shifted reserve is not positive.
fn received(reserves: &Reserves, k: &Fixed, delta: &Fixed) -> Option<Fixed> {
    let shifted = &Fixed::from_u256(reserves.base) + delta;
    if !shifted.is_positive() {
        return None;
    }
    Some(&Fixed::from_u256(reserves.quote) - &k.checked_div(&shifted)?)
}

/// Solve both pools for the merged-liquidity price. `None` for empty pools.
pub fn equalize(a: &Reserves, b: &Reserves) -> Option<Equalization> {
    let synced = SyncedPrice {
        quote: Fixed::from_u256(a.quote) + Fixed::from_u256(b.quote),
        base: Fixed::from_u256(a.base) + Fixed::from_u256(b.base),
    };
    if !synced.quote.is_positive() || !synced.base.is_positive() {
        return None;
    }

    let target_a = target(a, &synced)?;
    let target_b = target(b, &synced)?;
    let received_from_b = received(b, &target_b.k, &target_a.delta);
    let received_from_a = received(a, &target_a.k, &target_b.delta);

    Some(Equalization {
        synced,
        a: target_a,
        b: target_b,
        received_from_a,
        received_from_b,
    })
}

pub struct EqualizationSolver {
    /// Minimum absolute divergence, in percent
    threshold: Fixed,
}

impl EqualizationSolver {
    pub fn new(threshold: Fixed) -> Self {
        Self { threshold }
    }

    /// Size and direct a round trip, or `None` when there is nothing to take.
    ///
    /// Pool B's return is checked before pool A's; the first positive one
    /// wins even if the other would be larger.
    pub fn solve(&self, snapshot: &PriceSnapshot) -> Option<Opportunity> {
        let divergence = &snapshot.divergence;
        if divergence.is_zero() || divergence.abs() < self.threshold {
            tracing::debug!(
                "divergence {}% below threshold {}%",
                divergence,
                self.threshold
            );
            return None;
        }

        let Some(eq) = equalize(&snapshot.reserves(Side::A), &snapshot.reserves(Side::B)) else {
            tracing::warn!("equalization undefined for current reserves");
            return None;
        };

        tracing::debug!(
            "synced price {}/{} | A: y'={} delta={} spent={} | B: y'={} delta={} spent={}",
            eq.synced.quote,
            eq.synced.base,
            eq.a.target_base,
            eq.a.delta,
            eq.a.spent,
            eq.b.target_base,
            eq.b.delta,
            eq.b.spent
        );

        let (buy, pool, returned) = match (&eq.received_from_b, &eq.received_from_a) {
            (Some(from_b), _) if from_b.is_positive() => (Side::A, &eq.a, from_b),
            (_, Some(from_a)) if from_a.is_positive() => (Side::B, &eq.b, from_a),
            _ => {
                tracing::warn!(
                    "divergence {}% but no pool yields a positive return (from A: {:?}, from B: {:?})",
                    divergence,
                    eq.received_from_a.as_ref().map(|v| v.to_string()),
                    eq.received_from_b.as_ref().map(|v| v.to_string())
                );
                return None;
            }
        };

        let size = pool.delta.clone();
        let profit_before_fees = returned - &pool.spent;
        Some(Opportunity {
            direction: Direction::buy_first_on(buy),
            size,
            profit_before_fees,
            divergence: divergence.clone(),
            equalization: eq,
        })
    }
}
