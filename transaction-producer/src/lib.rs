pub mod config;
pub mod error;
pub mod generator;
pub mod metrics_consts;
pub mod producer;
pub mod sink;
pub mod worker;

pub use config::Config;
pub use producer::{DriverSettings, TransactionProducer};
