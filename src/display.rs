use alloy::primitives::utils::format_units;
use alloy::primitives::{I256, U256};
use chrono::Local;

use crate::dex::{Reserves, Side, TokenPair};
use crate::math::Fixed;
use crate::price::PriceSnapshot;
use crate::simulation::{Opportunity, Projection, TradeDecision};

/// Raw `quote / base` ratio in human units
fn human_price(raw: f64, pair: &TokenPair) -> f64 {
    let shift = pair.base.decimals as i32 - pair.quote.decimals as i32;
    raw * 10f64.powi(shift)
}

fn reserve_price(reserves: &Reserves, pair: &TokenPair) -> f64 {
    let quote = Fixed::from_u256(reserves.quote).to_f64();
    let base = Fixed::from_u256(reserves.base).to_f64();
    human_price(quote / base, pair)
}

fn amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

fn signed_amount(value: I256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

/// Both venues' prices and their divergence
pub fn print_price_check(
    snapshot: &PriceSnapshot,
    pair: &TokenPair,
    precision: u32,
    source: Option<Side>,
) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let precision = precision as usize;
    let block = snapshot
        .block
        .map_or_else(|| "-".to_string(), |b| b.to_string());

    println!();
    println!("┌──────────────────────────────────────────────────────────────┐");
    match source {
        Some(side) => println!("│ PRICE CHECK | block {} | {} | swap on {}", block, timestamp, side),
        None => println!("│ PRICE CHECK | block {} | {}", block, timestamp),
    }
    println!("├──────────────────────────────────────────────────────────────┤");
    println!(
        "│ A  {:>24.prec$} {}/{}",
        reserve_price(&snapshot.reserves(Side::A), pair),
        pair.quote.symbol,
        pair.base.symbol,
        prec = precision
    );
    println!(
        "│ B  {:>24.prec$} {}/{}",
        reserve_price(&snapshot.reserves(Side::B), pair),
        pair.quote.symbol,
        pair.base.symbol,
        prec = precision
    );

    let color = if snapshot.divergence.is_negative() { "31" } else { "32" };
    println!(
        "│ Divergence  \x1b[1;{}m{:.prec$}%\x1b[0m",
        color,
        snapshot.divergence,
        prec = precision
    );
    println!("└──────────────────────────────────────────────────────────────┘");
}

/// Solver output for an opportunity
pub fn print_opportunity(opportunity: &Opportunity, pair: &TokenPair, precision: u32) {
    let precision = precision as usize;
    let eq = &opportunity.equalization;

    println!();
    println!("  OPPORTUNITY: {}", opportunity.direction);
    println!(
        "  {:<22} {:.prec$} {}/{}",
        "Synced price:",
        human_price(eq.synced.to_f64(), pair),
        pair.quote.symbol,
        pair.base.symbol,
        prec = precision
    );
    println!(
        "  {:<22} {}",
        "Size:",
        opportunity
            .size
            .floor_u256()
            .map(|s| amount(s, pair.base.decimals))
            .unwrap_or_else(|| opportunity.size.to_string())
    );
    println!(
        "  {:<22} {:.prec$} (raw units, before fees)",
        "Expected profit:",
        opportunity.profit_before_fees,
        prec = precision
    );
}

/// Quote amounts and the go/no-go verdict
pub fn print_decision(decision: &TradeDecision, pair: &TokenPair) {
    let quote = &pair.quote;

    println!();
    println!("  ┌─────────────────── PROFITABILITY ───────────────────┐");
    if let Some(err) = &decision.liquidity_error {
        println!("  │ Liquidity check failed: {}", err);
    } else {
        println!("  │ Amount in:   {} {}", amount(decision.amount_in, quote.decimals), quote.symbol);
        println!("  │ Amount out:  {} {}", amount(decision.amount_out, quote.decimals), quote.symbol);
        let color = if decision.net.is_negative() { "31" } else { "32" };
        println!(
            "  │ Net:         \x1b[1;{}m{} {}\x1b[0m",
            color,
            signed_amount(decision.net, quote.decimals),
            quote.symbol
        );
    }
    println!(
        "  │ Est. gas:    {} ETH (not deducted)",
        amount(decision.estimated_gas_cost, 18)
    );
    println!(
        "  │ Decision:    {}",
        if decision.go { "\x1b[1;32mGO\x1b[0m" } else { "\x1b[1;31mNO GO\x1b[0m" }
    );
    println!("  └─────────────────────────────────────────────────────┘");
}

/// Balances before and after the trade as quoted, gas at the full estimate
pub fn print_projection(projection: &Projection, pair: &TokenPair) {
    let quote = &pair.quote;
    let before = &projection.before;
    let label = |what: &str| format!("{} {}:", quote.symbol, what);

    println!();
    println!("  ┌──────────────────── PROJECTION ─────────────────────┐");
    println!("  │ {:<18} {}", "ETH before:", amount(before.native, 18));
    println!("  │ {:<18} {}", "ETH after:", amount(projection.native_after, 18));
    println!("  │ {:<18} {}", "ETH spent (gas):", amount(projection.gas, 18));
    println!("  │");
    println!("  │ {:<18} {}", label("before"), amount(before.quote, quote.decimals));
    println!("  │ {:<18} {}", label("after"), amount(projection.quote_after, quote.decimals));
    println!(
        "  │ {:<18} {}",
        label("gained"),
        signed_amount(projection.quote_gained, quote.decimals)
    );
    println!("  │");
    println!(
        "  │ {:<18} {}",
        "Total after gas:",
        signed_amount(projection.total, quote.decimals)
    );
    println!("  └─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::Token;
    use alloy::primitives::Address;

    #[test]
    fn test_human_price_adjusts_decimals() {
        let pair = TokenPair {
            base: Token {
                address: Address::repeat_byte(1),
                symbol: "WETH".to_string(),
                decimals: 18,
            },
            quote: Token {
                address: Address::repeat_byte(2),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
        };
        // 2_000_000_000 USDC units per 1e18 wei
        let reserves = Reserves::new(
            U256::from(1_000_000_000_000_000_000u128),
            U256::from(2_000_000_000u64),
        );
        assert!((reserve_price(&reserves, &pair) - 2000.0).abs() < 1e-6);
    }
}
