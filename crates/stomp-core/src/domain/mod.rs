//! Domain types shared by every layer.

pub mod endpoint;

pub use endpoint::{EndPoint, QUEUE_PREFIX, TOPIC_PREFIX};
