//! stomp-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does stomp-client do? (for beginners)
//!
//! STOMP is a text protocol spoken by message brokers such as ActiveMQ and
//! RabbitMQ.  A client opens one TCP connection, negotiates the protocol
//! version, and then:
//!
//! 1. *publishes* messages to named destinations (`SEND`),
//! 2. *subscribes* to destinations (`SUBSCRIBE`) and receives every message
//!    the broker routes there (`MESSAGE`),
//! 3. says goodbye (`DISCONNECT`).
//!
//! This crate layers that on blocking sockets and OS threads:
//!
//! - [`infrastructure::network`] – the socket, the receive buffer, and the
//!   verbs.
//! - [`application::session`] – subscriptions and the dispatch thread.
//! - [`application::agent`] – a facade built from configuration.
//! - [`domain::config`] – broker URL and TOML configuration.

/// Application layer: sessions and the agent facade.
pub mod application;

/// Domain layer: configuration.
pub mod domain;

/// Infrastructure layer: network I/O.
pub mod infrastructure;

pub use application::agent::StompAgent;
pub use application::session::{Callback, Session, Subscription};
pub use domain::config::{AgentConfig, BrokerConfig, ConfigError};
pub use infrastructure::network::{Connection, ErrorPolicy, Message, StompError};
