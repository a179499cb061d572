use common_kafka::config::KafkaConfig;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8081")]
    pub port: u16,

    #[envconfig(default = "transactions")]
    pub kafka_topic: String,

    // Jobs scheduled once at startup, before the first tick
    #[envconfig(default = "100")]
    pub initial_batch_size: usize,

    #[envconfig(default = "10")]
    pub creation_rps: usize,

    #[envconfig(default = "100")]
    pub distinct_users: usize,

    // Amount range in major units
    #[envconfig(default = "10")]
    pub amount_from: i64,

    #[envconfig(default = "1000")]
    pub amount_to: i64,

    #[envconfig(default = "10")]
    pub min_workers: usize,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
