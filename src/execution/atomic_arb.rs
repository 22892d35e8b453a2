//! Atomic DEX-to-DEX Arbitrage Module
//!
//! Hands the round trip to the on-chain arbitrage contract in a single
//! transaction and measures what it actually did from balances read before
//! and after.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, I256, U256};
use alloy::providers::Provider;
use alloy::sol;
use async_trait::async_trait;

use crate::config::bounded;
use crate::dex::{Side, TokenPair};
use crate::error::ExecutionError;
use crate::math::signed_delta;
use crate::simulation::{Direction, TradeDecision};
use crate::wallet::{self, BalanceSnapshot};

// Contract interface
sol! {
    #[sol(rpc)]
    interface IArbitrage {
        function executeTrade(
            bool startOnUniswap,
            address token0,
            address token1,
            uint256 flashAmount
        ) external;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Submit to the arbitrage contract
    Live,
    /// Read balances, never submit
    SimulationOnly,
}

/// Arguments of one `executeTrade` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeRequest {
    /// Buy on venue A first
    pub buy_first: bool,
    /// Quote asset
    pub token_a: Address,
    /// Base asset
    pub token_b: Address,
    pub amount: U256,
    pub gas_limit: u64,
}

impl TradeRequest {
    pub fn new(direction: Direction, pair: &TokenPair, amount: U256, gas_limit: u64) -> Self {
        Self {
            buy_first: direction.buy == Side::A,
            token_a: pair.quote.address,
            token_b: pair.base.address,
            amount,
            gas_limit,
        }
    }
}

/// Included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    pub tx_hash: String,
    pub gas_used: u64,
}

/// Account-side capabilities the executor needs
#[async_trait]
pub trait ArbitrageBackend: Send + Sync {
    fn account(&self) -> Address;

    async fn token_balance(&self, token: Address) -> Result<U256, ExecutionError>;

    async fn native_balance(&self) -> Result<U256, ExecutionError>;

    /// Submit and wait for inclusion. A reverted transaction is an error.
    async fn execute_trade(&self, request: &TradeRequest) -> Result<TxSummary, ExecutionError>;
}

/// Talks to the deployed arbitrage contract through a (signing) provider
pub struct ContractBackend<P> {
    provider: P,
    account: Address,
    contract: Option<Address>,
}

impl<P: Provider + Clone> ContractBackend<P> {
    pub fn new(provider: P, account: Address, contract: Option<Address>) -> Self {
        Self {
            provider,
            account,
            contract,
        }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync> ArbitrageBackend for ContractBackend<P> {
    fn account(&self) -> Address {
        self.account
    }

    async fn token_balance(&self, token: Address) -> Result<U256, ExecutionError> {
        wallet::token_balance(&self.provider, token, self.account).await
    }

    async fn native_balance(&self) -> Result<U256, ExecutionError> {
        wallet::native_balance(&self.provider, self.account).await
    }

    async fn execute_trade(&self, request: &TradeRequest) -> Result<TxSummary, ExecutionError> {
        let contract = self.contract.ok_or_else(|| ExecutionError::Submission {
            reason: "no arbitrage contract configured".to_string(),
        })?;

        let arb = IArbitrage::new(contract, &self.provider);
        let pending = arb
            .executeTrade(request.buy_first, request.token_a, request.token_b, request.amount)
            .from(self.account)
            .gas(request.gas_limit)
            .send()
            .await
            .map_err(|e| ExecutionError::Submission {
                reason: e.to_string(),
            })?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        tracing::info!("submitted {}", tx_hash);

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ExecutionError::Finality {
                reason: e.to_string(),
            })?;

        if !receipt.status() {
            return Err(ExecutionError::Reverted { tx_hash });
        }

        Ok(TxSummary {
            tx_hash,
            gas_used: receipt.gas_used,
        })
    }
}

/// Before/after accounting for one execution step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub live: bool,
    pub request: TradeRequest,
    pub before: BalanceSnapshot,
    pub after: BalanceSnapshot,
    pub quote_delta: I256,
    pub base_delta: I256,
    pub native_delta: I256,
    /// Native coin burned between the two reads
    pub gas_spent: I256,
    /// `quote_delta - gas_spent`
    pub net: I256,
    pub tx: Option<TxSummary>,
}

impl ExecutionReceipt {
    fn new(
        live: bool,
        request: TradeRequest,
        before: BalanceSnapshot,
        after: BalanceSnapshot,
        tx: Option<TxSummary>,
    ) -> Self {
        let quote_delta = signed_delta(after.quote, before.quote);
        let gas_spent = signed_delta(before.native, after.native);
        Self {
            live,
            request,
            before,
            after,
            quote_delta,
            base_delta: signed_delta(after.base, before.base),
            native_delta: signed_delta(after.native, before.native),
            gas_spent,
            net: quote_delta.saturating_sub(gas_spent),
            tx,
        }
    }
}

pub struct TradeExecutor {
    backend: Arc<dyn ArbitrageBackend>,
    mode: ExecutionMode,
    call_timeout: Option<Duration>,
}

impl TradeExecutor {
    pub fn new(
        backend: Arc<dyn ArbitrageBackend>,
        mode: ExecutionMode,
        call_timeout: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            mode,
            call_timeout,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub async fn balances(&self, pair: &TokenPair) -> Result<BalanceSnapshot, ExecutionError> {
        let read = async {
            Ok::<_, ExecutionError>(BalanceSnapshot {
                quote: self.backend.token_balance(pair.quote.address).await?,
                base: self.backend.token_balance(pair.base.address).await?,
                native: self.backend.native_balance().await?,
            })
        };
        bounded(self.call_timeout, read)
            .await
            .map_err(|_| ExecutionError::Timeout)?
    }

    /// Run the approved trade (or skip it in simulation) and account for it.
    /// Failures are final for the cycle; nothing is retried.
    pub async fn execute(
        &self,
        direction: Direction,
        decision: &TradeDecision,
        pair: &TokenPair,
        gas_limit: u64,
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let request = TradeRequest::new(direction, pair, decision.amount_in, gas_limit);
        let before = self.balances(pair).await?;

        let tx = match self.mode {
            ExecutionMode::Live => {
                tracing::info!(
                    "executing {} with {} {} from {}",
                    direction,
                    request.amount,
                    pair.quote.symbol,
                    self.backend.account()
                );
                let summary = bounded(self.call_timeout, self.backend.execute_trade(&request))
                    .await
                    .map_err(|_| ExecutionError::Timeout)??;
                Some(summary)
            }
            ExecutionMode::SimulationOnly => {
                tracing::info!("simulation only, not submitting {}", direction);
                None
            }
        };

        let after = self.balances(pair).await?;
        Ok(ExecutionReceipt::new(
            self.mode == ExecutionMode::Live,
            request,
            before,
            after,
            tx,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dex::local::tests::test_pair;
    use parking_lot::Mutex;

    /// In-memory account; a submitted trade moves balances by fixed amounts
    pub struct RecordingBackend {
        pub balances: Mutex<BalanceSnapshot>,
        pub submitted: Mutex<Vec<TradeRequest>>,
        pub profit: U256,
        pub gas_cost: U256,
        pub revert: bool,
    }

    impl RecordingBackend {
        pub fn new(profit: u128, gas_cost: u128) -> Self {
            Self {
                balances: Mutex::new(BalanceSnapshot {
                    quote: U256::from(5_000_000_000_000_000_000u128),
                    base: U256::from(123u64),
                    native: U256::from(2_000_000_000_000_000_000u128),
                }),
                submitted: Mutex::new(Vec::new()),
                profit: U256::from(profit),
                gas_cost: U256::from(gas_cost),
                revert: false,
            }
        }

        pub fn reverting() -> Self {
            Self {
                revert: true,
                ..Self::new(0, 0)
            }
        }
    }

    #[async_trait]
    impl ArbitrageBackend for RecordingBackend {
        fn account(&self) -> Address {
            Address::repeat_byte(0x11)
        }

        async fn token_balance(&self, token: Address) -> Result<U256, ExecutionError> {
            let pair = test_pair();
            let balances = self.balances.lock();
            if token == pair.quote.address {
                Ok(balances.quote)
            } else {
                Ok(balances.base)
            }
        }

        async fn native_balance(&self) -> Result<U256, ExecutionError> {
            Ok(self.balances.lock().native)
        }

        async fn execute_trade(&self, request: &TradeRequest) -> Result<TxSummary, ExecutionError> {
            self.submitted.lock().push(*request);
            let mut balances = self.balances.lock();
            balances.native -= self.gas_cost;
            if self.revert {
                return Err(ExecutionError::Reverted {
                    tx_hash: "0xdead".to_string(),
                });
            }
            balances.quote += self.profit;
            Ok(TxSummary {
                tx_hash: "0xbeef".to_string(),
                gas_used: 180_000,
            })
        }
    }

    fn decision(amount_in: u128) -> TradeDecision {
        TradeDecision {
            go: true,
            size: U256::from(amount_in),
            amount_in: U256::from(amount_in),
            amount_out: U256::from(amount_in + 1),
            net: I256::ONE,
            estimated_gas_cost: U256::ZERO,
            liquidity_error: None,
        }
    }

    const A_TO_B: Direction = Direction {
        buy: Side::A,
        sell: Side::B,
    };

    #[tokio::test]
    async fn test_receipt_deltas_are_exact() {
        let backend = Arc::new(RecordingBackend::new(
            1_035_746_435_306_912_501,
            3_600_000_000_000_001,
        ));
        let executor = TradeExecutor::new(backend.clone(), ExecutionMode::Live, None);

        let receipt = executor
            .execute(A_TO_B, &decision(25_396_554_611_617_849_591), &test_pair(), 400_000)
            .await
            .unwrap();

        assert!(receipt.live);
        assert_eq!(
            receipt.quote_delta,
            I256::try_from(1_035_746_435_306_912_501i128).unwrap()
        );
        assert_eq!(receipt.base_delta, I256::ZERO);
        assert_eq!(
            receipt.native_delta,
            I256::try_from(-3_600_000_000_000_001i128).unwrap()
        );
        assert_eq!(
            receipt.gas_spent,
            I256::try_from(3_600_000_000_000_001i128).unwrap()
        );
        assert_eq!(
            receipt.net,
            I256::try_from(1_032_146_435_306_912_500i128).unwrap()
        );
        assert_eq!(receipt.tx.as_ref().unwrap().tx_hash, "0xbeef");

        let submitted = backend.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].buy_first);
        assert_eq!(submitted[0].token_a, test_pair().quote.address);
        assert_eq!(submitted[0].token_b, test_pair().base.address);
        assert_eq!(submitted[0].amount, U256::from(25_396_554_611_617_849_591u128));
        assert_eq!(submitted[0].gas_limit, 400_000);
    }

    #[tokio::test]
    async fn test_simulation_only_never_submits() {
        let backend = Arc::new(RecordingBackend::new(1, 1));
        let executor = TradeExecutor::new(backend.clone(), ExecutionMode::SimulationOnly, None);

        let direction = Direction {
            buy: Side::B,
            sell: Side::A,
        };
        let receipt = executor
            .execute(direction, &decision(1_000), &test_pair(), 400_000)
            .await
            .unwrap();

        assert!(!receipt.live);
        assert!(!receipt.request.buy_first);
        assert_eq!(receipt.before, receipt.after);
        assert_eq!(receipt.quote_delta, I256::ZERO);
        assert_eq!(receipt.net, I256::ZERO);
        assert!(receipt.tx.is_none());
        assert!(backend.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_revert_is_fatal() {
        let backend = Arc::new(RecordingBackend::reverting());
        let executor = TradeExecutor::new(backend.clone(), ExecutionMode::Live, None);

        let err = executor
            .execute(A_TO_B, &decision(1_000), &test_pair(), 400_000)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::Reverted {
                tx_hash: "0xdead".to_string()
            }
        );
        assert_eq!(backend.submitted.lock().len(), 1);
    }
}
