pub mod handlers;
pub mod types;

pub use handlers::search_transactions;
pub use types::{TransactionSearchRequest, TransactionSearchResponse};
