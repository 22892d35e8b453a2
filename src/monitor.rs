//! Swap notifications from both pairs over one WebSocket subscription

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;
use eyre::{eyre, Result};
use futures::StreamExt;

use crate::dex::uniswap_v2::IUniswapV2Pair;
use crate::dex::Side;
use crate::trader::EventGate;

/// Which side a log came from, by emitting pair address
pub fn side_for(emitter: Address, pairs: [Address; 2]) -> Option<Side> {
    if emitter == pairs[Side::A.index()] {
        Some(Side::A)
    } else if emitter == pairs[Side::B.index()] {
        Some(Side::B)
    } else {
        None
    }
}

pub fn swap_filter(pairs: [Address; 2]) -> Filter {
    Filter::new()
        .address(pairs.to_vec())
        .event_signature(IUniswapV2Pair::Swap::SIGNATURE_HASH)
}

/// Forward every swap on either pair to the gate. Each notification runs on
/// its own task so one arriving mid-cycle reaches the gate and is dropped
/// there. Returns only when the subscription ends.
pub async fn watch_swaps<P: Provider>(provider: &P, pairs: [Address; 2], gate: Arc<EventGate>) -> Result<()> {
    let subscription = provider.subscribe_logs(&swap_filter(pairs)).await?;
    let mut stream = subscription.into_stream();

    tracing::info!("watching swaps on A {} and B {}", pairs[0], pairs[1]);

    while let Some(log) = stream.next().await {
        let Some(side) = side_for(log.address(), pairs) else {
            tracing::debug!("ignoring log from {}", log.address());
            continue;
        };

        tracing::debug!(
            "swap on {} in block {:?} tx {:?} (gate {:?})",
            side,
            log.block_number,
            log.transaction_hash,
            gate.state()
        );

        let gate = gate.clone();
        tokio::spawn(async move {
            // outcome and failures are logged by the gate
            let _ = gate.notify(side).await;
        });
    }

    Err(eyre!("swap subscription closed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_for_maps_emitters() {
        let pairs = [Address::repeat_byte(0xa1), Address::repeat_byte(0xb2)];
        assert_eq!(side_for(pairs[0], pairs), Some(Side::A));
        assert_eq!(side_for(pairs[1], pairs), Some(Side::B));
        assert_eq!(side_for(Address::ZERO, pairs), None);
    }

    #[test]
    fn test_filter_targets_both_pairs() {
        let pairs = [Address::repeat_byte(0xa1), Address::repeat_byte(0xb2)];
        let filter = swap_filter(pairs);
        assert!(filter.address.matches(&pairs[0]));
        assert!(filter.address.matches(&pairs[1]));
        assert!(!filter.address.matches(&Address::ZERO));
    }
}
