mod filter;
mod money;
mod transaction;

// Money
pub use money::Money;

// Transactions
pub use transaction::ParseTransactionTypeError;
pub use transaction::TransactionEvent;
pub use transaction::TransactionEventMessage;
pub use transaction::TransactionType;
pub use transaction::WireError;

// Filters
pub use filter::TransactionEventFilter;
pub use filter::DEFAULT_SEARCH_LIMIT;
