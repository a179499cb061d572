use envconfig::Envconfig;
use rdkafka::ClientConfig;

#[derive(Envconfig, Clone, Debug)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "100000")]
    pub kafka_producer_queue_messages: u32, // Maximum number of messages in the in-memory producer queue

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    // SASL PLAIN is enabled only when both are set
    pub kafka_sasl_user: Option<String>,
    pub kafka_sasl_password: Option<String>,

    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,
}

impl KafkaConfig {
    /// Apply the TLS and SASL settings shared by consumers and producers.
    pub fn apply_security(&self, client_config: &mut ClientConfig) {
        let sasl = match (&self.kafka_sasl_user, &self.kafka_sasl_password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        };

        let protocol = match (self.kafka_tls, sasl.is_some()) {
            (true, true) => "sasl_ssl",
            (true, false) => "ssl",
            (false, true) => "sasl_plaintext",
            (false, false) => return,
        };
        client_config.set("security.protocol", protocol);

        if self.kafka_tls {
            client_config.set("enable.ssl.certificate.verification", "false");
        }
        if let Some((user, password)) = sasl {
            client_config
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", user)
                .set("sasl.password", password);
        }
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct ConsumerConfig {
    #[envconfig(default = "transaction-consumer")]
    pub kafka_consumer_group: String,

    #[envconfig(default = "transactions")]
    pub kafka_consumer_topic: String,

    // earliest, latest
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String,
}
