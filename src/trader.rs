//! Trade orchestration - combines detection with execution
//!
//! Every swap notification funnels into `EventGate::notify`. At most one
//! evaluation cycle runs at a time; notifications arriving meanwhile are
//! dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dex::{Side, TokenPair, Venue};
use crate::display;
use crate::error::{CycleError, VenueError};
use crate::execution::{print_execution_receipt, ExecutionReceipt, TradeExecutor};
use crate::math::Fixed;
use crate::price::{PriceOracle, PriceSnapshot};
use crate::simulation::{EqualizationSolver, Opportunity, ProfitabilityEvaluator, TradeDecision};
use crate::stats::{CycleJournal, CycleRecord};

/// Detection half of a cycle: prices, sizing and the go/no-go decision
#[derive(Debug, Clone)]
pub struct Assessment {
    pub snapshot: PriceSnapshot,
    pub opportunity: Option<Opportunity>,
    /// Present whenever `opportunity` is
    pub decision: Option<TradeDecision>,
}

pub struct Assessor {
    venues: [Arc<dyn Venue>; 2],
    pair: TokenPair,
    oracle: PriceOracle,
    solver: EqualizationSolver,
    evaluator: ProfitabilityEvaluator,
    precision: u32,
}

impl Assessor {
    pub fn new(
        venue_a: Arc<dyn Venue>,
        venue_b: Arc<dyn Venue>,
        pair: TokenPair,
        oracle: PriceOracle,
        solver: EqualizationSolver,
        evaluator: ProfitabilityEvaluator,
        precision: u32,
    ) -> Self {
        Self {
            venues: [venue_a, venue_b],
            pair,
            oracle,
            solver,
            evaluator,
            precision,
        }
    }

    pub fn venue(&self, side: Side) -> &dyn Venue {
        self.venues[side.index()].as_ref()
    }

    pub fn pair(&self) -> &TokenPair {
        &self.pair
    }

    pub async fn assess(&self, source: Option<Side>) -> Result<Assessment, VenueError> {
        let snapshot = self
            .oracle
            .observe(self.venue(Side::A), self.venue(Side::B))
            .await?;
        tracing::debug!("raw prices A {} B {}", snapshot.price_a, snapshot.price_b);
        display::print_price_check(&snapshot, &self.pair, self.precision, source);

        let Some(opportunity) = self.solver.solve(&snapshot) else {
            return Ok(Assessment {
                snapshot,
                opportunity: None,
                decision: None,
            });
        };
        display::print_opportunity(&opportunity, &self.pair, self.precision);

        let direction = opportunity.direction;
        let decision = self
            .evaluator
            .evaluate(
                self.venue(direction.buy),
                self.venue(direction.sell),
                &self.pair,
                &opportunity,
            )
            .await;
        display::print_decision(&decision, &self.pair);

        Ok(Assessment {
            snapshot,
            opportunity: Some(opportunity),
            decision: Some(decision),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Evaluating,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Another cycle was in flight
    Dropped,
    NoOpportunity {
        divergence: Fixed,
    },
    NotProfitable {
        opportunity: Opportunity,
        decision: TradeDecision,
    },
    Executed {
        opportunity: Opportunity,
        decision: TradeDecision,
        receipt: ExecutionReceipt,
    },
}

/// Holds the gate closed; reopens it when dropped, on every exit path
struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct EventGate {
    busy: AtomicBool,
    assessor: Assessor,
    executor: TradeExecutor,
    gas_limit: u64,
    journal: Option<CycleJournal>,
}

impl EventGate {
    pub fn new(assessor: Assessor, executor: TradeExecutor, gas_limit: u64) -> Self {
        Self {
            busy: AtomicBool::new(false),
            assessor,
            executor,
            gas_limit,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: CycleJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn state(&self) -> GateState {
        if self.busy.load(Ordering::Acquire) {
            GateState::Evaluating
        } else {
            GateState::Idle
        }
    }

    fn try_enter(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { busy: &self.busy })
    }

    /// A swap happened on `source`. Runs one full cycle unless one is
    /// already running, in which case the notification is dropped.
    pub async fn notify(&self, source: Side) -> Result<CycleOutcome, CycleError> {
        self.guarded_cycle(Some(source)).await
    }

    /// Run one cycle on demand, under the same single-flight rule.
    pub async fn check(&self) -> Result<CycleOutcome, CycleError> {
        self.guarded_cycle(None).await
    }

    async fn guarded_cycle(&self, source: Option<Side>) -> Result<CycleOutcome, CycleError> {
        let Some(_guard) = self.try_enter() else {
            match source {
                Some(side) => tracing::warn!("swap on {} ignored: evaluation already in flight", side),
                None => tracing::warn!("check ignored: evaluation already in flight"),
            }
            return Ok(CycleOutcome::Dropped);
        };

        match source {
            Some(side) => tracing::info!(
                "swap on {} ({}), evaluating",
                side,
                self.assessor.venue(side).name()
            ),
            None => tracing::info!("manual check, evaluating"),
        }
        let result = self.run_cycle(source).await;

        match &result {
            Ok(CycleOutcome::Executed { receipt, .. }) => {
                tracing::info!("cycle complete: executed, net {}", receipt.net)
            }
            Ok(CycleOutcome::NotProfitable { .. }) => tracing::info!("cycle complete: not profitable"),
            Ok(CycleOutcome::NoOpportunity { divergence }) => {
                tracing::info!("cycle complete: no opportunity at {}%", divergence)
            }
            Ok(CycleOutcome::Dropped) => {}
            Err(e) => tracing::error!("cycle failed: {}", e),
        }

        if let Some(journal) = &self.journal {
            let record = CycleRecord::new(source, &result);
            if let Err(e) = journal.append(&record) {
                tracing::warn!("failed to write cycle journal: {}", e);
            }
        }

        result
    }

    async fn run_cycle(&self, source: Option<Side>) -> Result<CycleOutcome, CycleError> {
        let assessment = self.assessor.assess(source).await?;

        let (Some(opportunity), Some(decision)) = (assessment.opportunity, assessment.decision) else {
            return Ok(CycleOutcome::NoOpportunity {
                divergence: assessment.snapshot.divergence,
            });
        };

        if decision.liquidity_error.is_none() {
            let pair = self.assessor.pair();
            match self.executor.balances(pair).await {
                Ok(before) => display::print_projection(&decision.project(before), pair),
                Err(e) => tracing::warn!("balances unavailable for projection: {}", e),
            }
        }

        if !decision.go {
            return Ok(CycleOutcome::NotProfitable {
                opportunity,
                decision,
            });
        }

        tracing::info!(
            "executing {} with {} quote in ({:?})",
            opportunity.direction,
            decision.amount_in,
            self.executor.mode()
        );
        let receipt = self
            .executor
            .execute(
                opportunity.direction,
                &decision,
                self.assessor.pair(),
                self.gas_limit,
            )
            .await?;
        print_execution_receipt(&receipt, self.assessor.pair());

        Ok(CycleOutcome::Executed {
            opportunity,
            decision,
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::local::tests::{test_pair, venue, ETH};
    use crate::dex::{LocalVenue, Reserves};
    use crate::error::QuoteError;
    use crate::execution::atomic_arb::tests::RecordingBackend;
    use crate::execution::ExecutionMode;
    use crate::simulation::QuoteSimulator;
    use alloy::primitives::{Address, I256, U256};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Blocks its first reserve read until released
    struct GatedVenue {
        inner: LocalVenue,
        reads: AtomicUsize,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Venue for GatedVenue {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn get_reserves(&self) -> Result<Reserves, VenueError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.get_reserves().await
        }

        async fn quote_in(&self, amount_out: U256, path: &[Address]) -> Result<U256, QuoteError> {
            self.inner.quote_in(amount_out, path).await
        }

        async fn quote_out(&self, amount_in: U256, path: &[Address]) -> Result<U256, QuoteError> {
            self.inner.quote_out(amount_in, path).await
        }
    }

    struct BrokenVenue;

    #[async_trait]
    impl Venue for BrokenVenue {
        fn name(&self) -> &str {
            "Broken"
        }

        async fn get_reserves(&self) -> Result<Reserves, VenueError> {
            Err(VenueError::Rpc {
                venue: "Broken".to_string(),
                reason: "connection reset".to_string(),
            })
        }

        async fn quote_in(&self, _: U256, _: &[Address]) -> Result<U256, QuoteError> {
            unreachable!()
        }

        async fn quote_out(&self, _: U256, _: &[Address]) -> Result<U256, QuoteError> {
            unreachable!()
        }
    }

    fn gate(
        a: Arc<dyn Venue>,
        b: Arc<dyn Venue>,
        threshold: &str,
        backend: Arc<RecordingBackend>,
    ) -> EventGate {
        let assessor = Assessor::new(
            a,
            b,
            test_pair(),
            PriceOracle::new(None),
            EqualizationSolver::new(threshold.parse().unwrap()),
            ProfitabilityEvaluator::new(QuoteSimulator::new(None), 400_000, U256::from(50_000_000_000u64)),
            4,
        );
        EventGate::new(
            assessor,
            TradeExecutor::new(backend, ExecutionMode::Live, None),
            400_000,
        )
    }

    #[tokio::test]
    async fn test_second_notification_is_dropped_while_evaluating() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let gated = Arc::new(GatedVenue {
            inner: venue("Uniswap", 1_000 * ETH, 1_000 * ETH),
            reads: AtomicUsize::new(0),
            entered: entered.clone(),
            release: release.clone(),
        });
        let gate = Arc::new(gate(
            gated.clone(),
            Arc::new(venue("Sushiswap", 1_000 * ETH, 1_000 * ETH)),
            "0.5",
            Arc::new(RecordingBackend::new(0, 0)),
        ));

        let first = tokio::spawn({
            let gate = gate.clone();
            async move { gate.notify(Side::A).await }
        });
        entered.notified().await;
        assert_eq!(gate.state(), GateState::Evaluating);

        let second = gate.notify(Side::B).await.unwrap();
        assert!(matches!(second, CycleOutcome::Dropped));

        release.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, CycleOutcome::NoOpportunity { .. }));
        assert_eq!(gated.reads.load(Ordering::SeqCst), 1);
        assert_eq!(gate.state(), GateState::Idle);

        gate.notify(Side::B).await.unwrap();
        assert_eq!(gated.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gate_reopens_after_failed_cycle() {
        let gate = gate(
            Arc::new(BrokenVenue),
            Arc::new(venue("Sushiswap", 1_000 * ETH, 1_000 * ETH)),
            "0.5",
            Arc::new(RecordingBackend::new(0, 0)),
        );

        let err = gate.notify(Side::A).await.unwrap_err();
        assert!(matches!(err, CycleError::Venue(VenueError::Rpc { .. })));
        assert_eq!(gate.state(), GateState::Idle);

        // not dropped: the next notification runs a fresh cycle
        assert!(gate.notify(Side::B).await.is_err());
    }

    #[tokio::test]
    async fn test_full_cycle_executes_profitable_trade() {
        let backend = Arc::new(RecordingBackend::new(1_040_846_627_821_322_464, 0));
        let gate = gate(
            Arc::new(venue("Uniswap", 1_000 * ETH, 1_000 * ETH)),
            Arc::new(venue("Sushiswap", 1_000 * ETH, 1_100 * ETH)),
            "0.5",
            backend.clone(),
        );

        let outcome = gate.notify(Side::B).await.unwrap();
        let CycleOutcome::Executed { opportunity, receipt, .. } = outcome else {
            panic!("expected execution, got {:?}", outcome);
        };
        assert_eq!(opportunity.direction.buy, Side::A);
        assert_eq!(
            receipt.quote_delta,
            I256::try_from(1_040_846_627_821_322_464i128).unwrap()
        );

        let submitted = backend.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].amount, U256::from(24_769_384_750_210_469_731u128));
    }

    #[tokio::test]
    async fn test_below_threshold_never_trades() {
        let backend = Arc::new(RecordingBackend::new(0, 0));
        let gate = gate(
            Arc::new(venue("Uniswap", 1_000 * ETH, 1_000 * ETH)),
            Arc::new(venue("Sushiswap", 1_000 * ETH, 1_001 * ETH)),
            "0.5",
            backend.clone(),
        );

        let outcome = gate.notify(Side::A).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NoOpportunity { .. }));
        let outcome = gate.check().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NoOpportunity { .. }));
        assert!(backend.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fees_eat_a_small_divergence() {
        let backend = Arc::new(RecordingBackend::new(0, 0));
        let gate = gate(
            Arc::new(venue("Uniswap", 1_000 * ETH, 1_000 * ETH)),
            Arc::new(venue("Sushiswap", 1_000 * ETH, 1_001 * ETH)),
            "0.05",
            backend.clone(),
        );

        let outcome = gate.notify(Side::A).await.unwrap();
        let CycleOutcome::NotProfitable { decision, .. } = outcome else {
            panic!("expected a rejected trade, got {:?}", outcome);
        };
        assert!(!decision.go);
        assert!(decision.net.is_negative());
        assert!(backend.submitted.lock().is_empty());
    }
}
