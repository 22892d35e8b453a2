use alloy::primitives::utils::format_units;
use alloy::primitives::I256;
use chrono::Local;

use crate::dex::TokenPair;
use crate::execution::ExecutionReceipt;

fn signed(amount: I256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Print the before/after accounting of one execution step
pub fn print_execution_receipt(receipt: &ExecutionReceipt, pair: &TokenPair) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  EXECUTION RECEIPT | {}", timestamp);
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!(
        "  Mode: {}",
        if receipt.live { "LIVE" } else { "SIMULATION ONLY (nothing submitted)" }
    );
    println!(
        "  Route: {} --({})-> {} --({})-> {}",
        pair.quote.symbol,
        if receipt.request.buy_first { "A" } else { "B" },
        pair.base.symbol,
        if receipt.request.buy_first { "B" } else { "A" },
        pair.quote.symbol
    );
    if let Some(tx) = &receipt.tx {
        println!("  TX: {}", tx.tx_hash);
        println!("  Gas Used: {}", tx.gas_used);
    }
    println!();

    let quote_color = if receipt.quote_delta.is_negative() { "31" } else { "32" };
    println!(
        "  {:>8} change: \x1b[1;{}m{}\x1b[0m",
        pair.quote.symbol,
        quote_color,
        signed(receipt.quote_delta, pair.quote.decimals)
    );
    println!(
        "  {:>8} change: {}",
        pair.base.symbol,
        signed(receipt.base_delta, pair.base.decimals)
    );
    println!("  {:>8} spent:  {}", "gas", signed(receipt.gas_spent, 18));
    println!();

    let net_color = if receipt.net.is_negative() { "31" } else { "32" };
    println!(
        "  Net:  \x1b[1;{}m{} {}\x1b[0m (after gas)",
        net_color,
        signed(receipt.net, pair.quote.decimals),
        pair.quote.symbol
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
