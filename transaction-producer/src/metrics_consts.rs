pub const JOBS_SCHEDULED: &str = "transactions_producer_jobs_scheduled";
pub const EVENTS_PUBLISHED: &str = "transactions_producer_events_published";
pub const PUBLISH_FAILED: &str = "transactions_producer_publish_failed";
pub const PUBLISH_TIME: &str = "transactions_producer_publish_time_ms";
pub const ACTIVE_WORKERS: &str = "transactions_producer_active_workers";
