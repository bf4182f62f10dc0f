pub mod amount;
pub mod balance_enumerator;
pub mod constants;
pub mod cursor_pager;
pub mod detail_fetcher;
pub mod error;
pub mod explorer;
pub mod instruction_classifier;
pub mod session;
pub mod transaction_adapter;
