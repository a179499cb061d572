pub mod api;
pub mod app;
pub mod batcher;
pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics_consts;
pub mod source;
pub mod store;

pub use app::{create_router, AppState};
pub use config::Config;
pub use consumer::{ConsumerState, TransactionConsumer};
