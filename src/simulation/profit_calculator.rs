//! Profit Calculator Module
//!
//! Turns a sized opportunity into a go/no-go decision from the venues' own
//! quotes. Gas is estimated and reported alongside, but the decision is made
//! on the quote amounts alone.

use alloy::primitives::{I256, U256};

use super::equalizer::Opportunity;
use super::quote_fetcher::{Quote, QuoteSimulator};
use crate::dex::{TokenPair, Venue};
use crate::error::QuoteError;
use crate::math::signed_delta;
use crate::wallet::BalanceSnapshot;

/// Outcome of pricing one opportunity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeDecision {
    pub go: bool,
    /// Base asset size that was quoted
    pub size: U256,
    /// Quote asset paid on the buy venue, forwarded to execution
    pub amount_in: U256,
    /// Quote asset received on the sell venue
    pub amount_out: U256,
    /// `amount_out - amount_in`
    pub net: I256,
    /// `gas_limit * gas_price`, display only
    pub estimated_gas_cost: U256,
    /// Set when quoting failed and the trade was rejected for liquidity
    pub liquidity_error: Option<QuoteError>,
}

impl TradeDecision {
    fn from_quote(quote: Quote, estimated_gas_cost: U256) -> Self {
        Self {
            go: quote.amount_out >= quote.amount_in,
            size: quote.size,
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            net: signed_delta(quote.amount_out, quote.amount_in),
            estimated_gas_cost,
            liquidity_error: None,
        }
    }

    fn rejected(error: QuoteError, estimated_gas_cost: U256) -> Self {
        Self {
            go: false,
            size: U256::ZERO,
            amount_in: U256::ZERO,
            amount_out: U256::ZERO,
            net: I256::ZERO,
            estimated_gas_cost,
            liquidity_error: Some(error),
        }
    }
}

/// Holdings if the trade filled exactly at its quotes and burned the full
/// gas estimate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub before: BalanceSnapshot,
    pub native_after: U256,
    pub gas: U256,
    pub quote_after: U256,
    pub quote_gained: I256,
    /// `quote_gained - gas`, meaningful when quote is the wrapped native coin
    pub total: I256,
}

impl TradeDecision {
    pub fn project(&self, before: BalanceSnapshot) -> Projection {
        let gas = self.estimated_gas_cost;
        let quote_after = if self.net.is_negative() {
            before.quote.saturating_sub(self.net.unsigned_abs())
        } else {
            before.quote.saturating_add(self.net.unsigned_abs())
        };
        let gas_signed = I256::try_from(gas).unwrap_or(I256::MAX);

        Projection {
            before,
            native_after: before.native.saturating_sub(gas),
            gas,
            quote_after,
            quote_gained: self.net,
            total: self.net.saturating_sub(gas_signed),
        }
    }
}

pub struct ProfitabilityEvaluator {
    simulator: QuoteSimulator,
    gas_limit: u64,
    gas_price: U256,
}

impl ProfitabilityEvaluator {
    pub fn new(simulator: QuoteSimulator, gas_limit: u64, gas_price: U256) -> Self {
        Self {
            simulator,
            gas_limit,
            gas_price,
        }
    }

    pub fn estimated_gas_cost(&self) -> U256 {
        U256::from(self.gas_limit).saturating_mul(self.gas_price)
    }

    /// Quote the opportunity and decide. Quote failures never escape: they
    /// are logged and produce `go = false`.
    pub async fn evaluate(
        &self,
        buy: &dyn Venue,
        sell: &dyn Venue,
        pair: &TokenPair,
        opportunity: &Opportunity,
    ) -> TradeDecision {
        let gas = self.estimated_gas_cost();
        match self
            .simulator
            .simulate(buy, sell, pair, &opportunity.size)
            .await
        {
            Ok(quote) => {
                let decision = TradeDecision::from_quote(quote, gas);
                tracing::info!(
                    "{}: in {} out {} net {} (gas est. {} wei, not deducted) -> {}",
                    opportunity.direction,
                    decision.amount_in,
                    decision.amount_out,
                    decision.net,
                    gas,
                    if decision.go { "GO" } else { "NO GO" }
                );
                decision
            }
            Err(e) => {
                tracing::warn!("liquidity check failed for {}: {}", opportunity.direction, e);
                TradeDecision::rejected(e, gas)
            }
        }
    }
}
