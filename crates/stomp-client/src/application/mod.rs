//! Application layer of the STOMP client.
//!
//! # What lives here?
//!
//! - **`session`** – the subscription registry, the dispatch thread, and the
//!   publish/subscribe operations built on one
//!   [`Connection`](crate::infrastructure::network::Connection).
//!
//! - **`agent`** – [`StompAgent`](agent::StompAgent), which connects from a
//!   [`BrokerConfig`](crate::domain::config::BrokerConfig) and owns a
//!   session.  This is what the `stomp-agent` binary uses.

pub mod agent;
pub mod session;
