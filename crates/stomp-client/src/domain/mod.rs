//! Domain layer for the client: configuration describing which broker to
//! talk to.  Protocol-level domain types ([`stomp_core::EndPoint`]) live in
//! `stomp-core`.

pub mod config;

pub use config::{AgentConfig, BrokerConfig, ConfigError, BROKER_URL_ENV, DEFAULT_BROKER_URL};
