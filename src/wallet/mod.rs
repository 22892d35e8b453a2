pub mod balance;

pub use balance::{fetch_pair, native_balance, print_balances, token_balance, BalanceSnapshot};
