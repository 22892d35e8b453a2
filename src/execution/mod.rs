pub mod atomic_arb;
pub mod report;

pub use atomic_arb::{ContractBackend, ExecutionMode, ExecutionReceipt, TradeExecutor};
pub use report::print_execution_receipt;
