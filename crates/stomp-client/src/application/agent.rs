//! Convenience facade: connect from configuration and drive one session.

use stomp_core::EndPoint;
use tracing::debug;

use crate::application::session::Session;
use crate::domain::config::BrokerConfig;
use crate::infrastructure::network::{Connection, ErrorPolicy, StompError};

/// A connected [`Session`] built from a [`BrokerConfig`].
///
/// Dropping the agent disconnects from the broker.
///
/// # Examples
///
/// ```rust,no_run
/// use stomp_client::{BrokerConfig, StompAgent};
/// use stomp_core::EndPoint;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let agent = StompAgent::connect(&BrokerConfig::from_env()?, false)?;
/// agent.publish(&EndPoint::queue("jobs"), "run nightly")?;
/// # Ok(())
/// # }
/// ```
pub struct StompAgent {
    session: Session,
}

impl StompAgent {
    /// Connects to the broker; starts the background dispatcher immediately
    /// when `start_now` is set.
    ///
    /// # Errors
    ///
    /// Resolution or connect errors, and socket errors from the handshake.
    pub fn connect(config: &BrokerConfig, start_now: bool) -> Result<Self, StompError> {
        Self::connect_with(config, ErrorPolicy::default(), start_now)
    }

    /// Like [`StompAgent::connect`], with a custom socket error policy.
    pub fn connect_with(
        config: &BrokerConfig,
        policy: ErrorPolicy,
        start_now: bool,
    ) -> Result<Self, StompError> {
        let conn = Connection::connect(config)?.with_error_policy(policy);
        Self::from_connection(conn, start_now)
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection, start_now: bool) -> Result<Self, StompError> {
        let agent = Self {
            session: Session::new(conn),
        };
        if start_now && !agent.start()? {
            debug!("start on construction did not complete the handshake");
        }
        Ok(agent)
    }

    /// Starts the background dispatcher.
    pub fn start(&self) -> Result<bool, StompError> {
        self.session.start()
    }

    /// Subscribes `callback` to `endpoint` and dispatches on this thread.
    pub fn start_blocking<F>(&self, endpoint: EndPoint, callback: F) -> Result<bool, StompError>
    where
        F: Fn(&[u8], &EndPoint) + Send + Sync + 'static,
    {
        self.session.start_blocking(endpoint, callback)
    }

    pub fn subscribe<F>(&self, source: EndPoint, callback: F) -> Result<bool, StompError>
    where
        F: Fn(&[u8], &EndPoint) + Send + Sync + 'static,
    {
        self.session.subscribe(source, callback)
    }

    pub fn unsubscribe(&self, source: &EndPoint) -> Result<bool, StompError> {
        self.session.unsubscribe(source)
    }

    /// Publishes `message` to `target`, starting the session if needed.
    pub fn publish(&self, target: &EndPoint, message: impl AsRef<[u8]>) -> Result<bool, StompError> {
        self.session.publish(message.as_ref(), target)
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }
}
