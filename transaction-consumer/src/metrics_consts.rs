pub const EVENTS_RECEIVED: &str = "transactions_consumer_events_received";
pub const EVENT_PARSE_ERROR: &str = "transactions_consumer_event_parse_error";
pub const EVENTS_STORED: &str = "transactions_consumer_events_stored";
pub const BATCHES_FLUSHED: &str = "transactions_consumer_batches_flushed";
pub const BATCH_STORE_FAILED: &str = "transactions_consumer_batch_store_failed";
pub const BATCH_STORE_TIME: &str = "transactions_consumer_batch_store_time_ms";
pub const BATCH_SIZE: &str = "transactions_consumer_batch_size";
pub const COMMIT_FAILED: &str = "transactions_consumer_commit_failed";
pub const CONSUMER_STATE: &str = "transactions_consumer_state";
pub const SEARCH_RESULTS: &str = "transactions_consumer_search_results";
