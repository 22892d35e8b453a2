//! Opportunity sizing, quote simulation and the go/no-go decision

pub mod equalizer;
pub mod profit_calculator;
pub mod quote_fetcher;

pub use equalizer::{Direction, EqualizationSolver, Opportunity};
pub use profit_calculator::{ProfitabilityEvaluator, Projection, TradeDecision};
pub use quote_fetcher::QuoteSimulator;
