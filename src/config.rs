//! Environment-sourced configuration.
//!
//! Every option is a CLI flag that also reads from the environment; the
//! required ones (store connection string, broker, credentials, topic) have
//! no default, so a missing value fails startup before anything connects.

use clap::Parser;

/// Destination store connection options.
#[derive(Debug, Clone, Parser)]
pub struct StoreOpts {
    /// PostgreSQL connection string
    #[arg(long, env = "POSTGRES_CONN_STR")]
    pub postgres_conn_str: String,
}

/// Bus consumer connection options.
#[derive(Debug, Clone, Parser)]
pub struct KafkaOpts {
    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKER")]
    pub broker: String,

    /// SASL/SCRAM username
    #[arg(long, env = "KAFKA_USER_NAME")]
    pub username: String,

    /// SASL/SCRAM password
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Topic to consume from
    #[arg(long, env = "TOPIC")]
    pub topic: String,

    /// Consumer group ID; durable identity for offset resumption
    #[arg(
        long,
        env = "KAFKA_GROUP_ID",
        default_value = "productivity-tracker-consumer"
    )]
    pub group_id: String,

    /// Session timeout in milliseconds
    #[arg(long, default_value = "30000")]
    pub session_timeout_ms: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kafka_opts_defaults() {
        let opts = KafkaOpts::parse_from([
            "test",
            "--broker",
            "localhost:9092",
            "--username",
            "scram-user",
            "--password",
            "secret",
            "--topic",
            "user-activity",
        ]);
        assert_eq!(opts.group_id, "productivity-tracker-consumer");
        assert_eq!(opts.session_timeout_ms, "30000");
    }

    #[test]
    fn test_missing_required_option_fails() {
        // No topic anywhere: parsing must fail rather than default.
        let result = KafkaOpts::try_parse_from([
            "test",
            "--broker",
            "localhost:9092",
            "--username",
            "scram-user",
            "--password",
            "secret",
        ]);
        assert!(result.is_err());
    }
}
