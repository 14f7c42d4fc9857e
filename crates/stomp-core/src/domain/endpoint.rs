//! Addressable message destinations.
//!
//! # Queues and topics (for beginners)
//!
//! A *queue* delivers each message to exactly one consumer (point-to-point).
//! A *topic* delivers each message to every current subscriber
//! (publish/subscribe).  On the wire the difference is only a prefix on the
//! `destination` header: `/queue/orders` versus `/topic/orders`.
//!
//! # Identity
//!
//! Two [`EndPoint`]s compare equal when their destination names are equal,
//! whatever their queue/topic flag.  Ordering and hashing follow the same
//! rule, so a registry keyed by `EndPoint` holds at most one entry per name:
//! subscribing to `/topic/x` and then `/queue/x` replaces the first entry.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Wire prefix for point-to-point destinations.
pub const QUEUE_PREFIX: &str = "/queue/";
/// Wire prefix for publish/subscribe destinations.
pub const TOPIC_PREFIX: &str = "/topic/";

/// A named destination, either a queue or a topic (the default).
#[derive(Debug, Clone, Default)]
pub struct EndPoint {
    /// Destination name without the `/queue/` or `/topic/` prefix.
    pub destination: String,
    /// `true` for a queue, `false` for a topic.
    pub is_queue: bool,
}

impl EndPoint {
    /// Creates an endpoint.
    pub fn new(destination: impl Into<String>, is_queue: bool) -> Self {
        Self {
            destination: destination.into(),
            is_queue,
        }
    }

    /// Creates a topic endpoint.
    pub fn topic(destination: impl Into<String>) -> Self {
        Self::new(destination, false)
    }

    /// Creates a queue endpoint.
    pub fn queue(destination: impl Into<String>) -> Self {
        Self::new(destination, true)
    }

    /// The wire prefix selected by the queue/topic flag.
    pub fn prefix(&self) -> &'static str {
        if self.is_queue {
            QUEUE_PREFIX
        } else {
            TOPIC_PREFIX
        }
    }

    /// The full `destination` header value, e.g. `/topic/news`.
    pub fn path(&self) -> String {
        format!("{}{}", self.prefix(), self.destination)
    }

    /// Parses a `destination` header value.
    ///
    /// Returns `None` if the value carries neither the queue nor the topic
    /// prefix.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stomp_core::EndPoint;
    ///
    /// let ep = EndPoint::from_path("/queue/orders").unwrap();
    /// assert!(ep.is_queue);
    /// assert_eq!(ep.destination, "orders");
    /// ```
    pub fn from_path(path: &str) -> Option<Self> {
        if let Some(name) = path.strip_prefix(QUEUE_PREFIX) {
            Some(Self::queue(name))
        } else {
            path.strip_prefix(TOPIC_PREFIX).map(Self::topic)
        }
    }
}

impl PartialEq for EndPoint {
    fn eq(&self, other: &Self) -> bool {
        self.destination == other.destination
    }
}

impl Eq for EndPoint {}

impl PartialOrd for EndPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EndPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.destination.cmp(&other.destination)
    }
}

impl Hash for EndPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.destination.hash(state);
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.destination)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
