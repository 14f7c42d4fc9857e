//! Publish/subscribe session over one [`Connection`].
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//!   new() ──► not started ──start()──────────► started, background dispatcher
//!                 │
//!                 └──────start_blocking()────► started, caller-driven dispatch
//!                                                     │
//!                              stop() / drop ◄────────┘
//! ```
//!
//! - [`Session::start`] performs the protocol handshake and spawns a thread
//!   named `stomp-dispatch` that receives messages and calls the matching
//!   subscriber callbacks.
//! - [`Session::start_blocking`] does the same work on the calling thread for
//!   one subscription, returning once that subscription is cancelled or the
//!   broker closes the socket.
//! - [`Session::publish`] starts the session on first use.
//!
//! # Callbacks and locking
//!
//! Subscriptions live in a registry keyed by [`EndPoint`].  The dispatcher
//! clones the callback (`Arc`) out of the registry and drops the registry lock
//! before calling it, so a callback may itself subscribe or unsubscribe.
//! The registry lock is separate from the connection's writer lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use stomp_core::EndPoint;
use tracing::{debug, error, info, warn};

use crate::infrastructure::network::{Connection, StompError};

/// A subscriber callback: message body and the endpoint it arrived on.
pub type Callback = Arc<dyn Fn(&[u8], &EndPoint) + Send + Sync>;

/// One registry entry.
#[derive(Clone)]
pub struct Subscription {
    /// Broker-side subscription id.
    pub id: u32,
    pub callback: Callback,
    pub endpoint: EndPoint,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// State shared with the dispatch thread.
struct Shared {
    conn: Connection,
    registry: Mutex<BTreeMap<EndPoint, Subscription>>,
    next_id: AtomicU32,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, BTreeMap<EndPoint, Subscription>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn locate(&self, endpoint: &EndPoint) -> Option<Callback> {
        self.registry()
            .get(endpoint)
            .map(|sub| Arc::clone(&sub.callback))
    }

    /// Receives and dispatches messages until stopped, until the socket
    /// closes, or (when `watch` is set) until that endpoint is unsubscribed.
    fn dispatch(&self, watch: Option<&EndPoint>) -> Result<(), StompError> {
        while !self.stopped.load(Ordering::SeqCst) {
            if let Some(endpoint) = watch {
                if !self.registry().contains_key(endpoint) {
                    debug!(%endpoint, "dispatch ending: endpoint unsubscribed");
                    break;
                }
            }

            let Some(message) = self.conn.receive()? else {
                info!("dispatch ending: broker closed the connection");
                break;
            };

            match self.locate(&message.endpoint) {
                Some(callback) => callback(&message.body, &message.endpoint),
                None => debug!(endpoint = %message.endpoint, "no subscriber for message"),
            }
        }
        Ok(())
    }
}

/// A STOMP publish/subscribe session.
///
/// All methods take `&self`; share a session between threads with `Arc`.
pub struct Session {
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Creates a session over `conn`.  Nothing is sent until the session is
    /// started or used.
    pub fn new(conn: Connection) -> Self {
        Self {
            shared: Arc::new(Shared {
                conn,
                registry: Mutex::new(BTreeMap::new()),
                next_id: AtomicU32::new(1),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
            dispatcher: Mutex::new(None),
        }
    }

    /// Returns `true` once the handshake has succeeded.
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    /// Returns `true` if `endpoint` has a registered subscription.
    pub fn is_subscribed(&self, endpoint: &EndPoint) -> bool {
        self.shared.registry().contains_key(endpoint)
    }

    /// The currently registered subscriptions, ordered by destination.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.shared.registry().values().cloned().collect()
    }

    /// Subscribes `callback` to `endpoint`.
    ///
    /// On success the subscription is added to the registry, replacing any
    /// existing entry for the same destination name.
    ///
    /// # Errors
    ///
    /// Socket errors under the connection's propagate policy.
    pub fn subscribe<F>(&self, endpoint: EndPoint, callback: F) -> Result<bool, StompError>
    where
        F: Fn(&[u8], &EndPoint) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        if !self.shared.conn.subscribe(&endpoint, id)? {
            return Ok(false);
        }

        info!(%endpoint, id, "subscribed");
        let subscription = Subscription {
            id,
            callback: Arc::new(callback),
            endpoint: endpoint.clone(),
        };
        if let Some(old) = self.shared.registry().insert(endpoint, subscription) {
            debug!(old_id = old.id, new_id = id, "replaced existing subscription");
        }
        Ok(true)
    }

    /// Cancels the subscription for `endpoint`.
    ///
    /// Returns `Ok(false)` if there is none.
    ///
    /// # Errors
    ///
    /// Socket errors under the connection's propagate policy.
    pub fn unsubscribe(&self, endpoint: &EndPoint) -> Result<bool, StompError> {
        let Some(id) = self.shared.registry().get(endpoint).map(|sub| sub.id) else {
            return Ok(false);
        };
        if !self.shared.conn.unsubscribe(id)? {
            return Ok(false);
        }

        let mut registry = self.shared.registry();
        // Leave a subscription that replaced ours in the meantime alone.
        if registry.get(endpoint).map(|sub| sub.id) == Some(id) {
            registry.remove(endpoint);
        }
        info!(%endpoint, id, "unsubscribed");
        Ok(true)
    }

    /// Sends `data` to `endpoint`, starting the session first if needed.
    ///
    /// # Errors
    ///
    /// Socket errors under the connection's propagate policy.
    pub fn publish(&self, data: &[u8], endpoint: &EndPoint) -> Result<bool, StompError> {
        if !self.is_started() && !self.start()? {
            return Ok(false);
        }
        self.shared.conn.send(data, endpoint)
    }

    /// Performs the handshake and spawns the dispatch thread.
    ///
    /// Returns `Ok(false)` if the session was already started or the broker
    /// refused the handshake.
    ///
    /// # Errors
    ///
    /// Socket errors under the connection's propagate policy, and
    /// [`StompError::Spawn`].  After a spawn failure the session is not
    /// started and cannot be started again, since the connection has already
    /// used its one handshake.
    pub fn start(&self) -> Result<bool, StompError> {
        self.start_with(thread::Builder::new().name("stomp-dispatch".to_string()))
    }

    fn start_with(&self, builder: thread::Builder) -> Result<bool, StompError> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        if !self.handshake()? {
            return Ok(false);
        }

        let shared = Arc::clone(&self.shared);
        let handle = builder
            .spawn(move || {
                if let Err(e) = shared.dispatch(None) {
                    error!("dispatch thread stopped: {e}");
                }
            })
            .map_err(|e| {
                error!("failed to spawn dispatch thread: {e}");
                self.shared.started.store(false, Ordering::SeqCst);
                StompError::Spawn(e)
            })?;

        *self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("session started");
        Ok(true)
    }

    /// Performs the handshake, subscribes `callback` to `endpoint`, and
    /// dispatches on the calling thread.
    ///
    /// Returns after the endpoint is unsubscribed (typically from inside the
    /// callback), the session is stopped, or the broker closes the socket.
    /// The subscription is then cancelled and the connection disconnected;
    /// the return value is the outcome of the disconnect.
    ///
    /// # Errors
    ///
    /// Socket errors under the connection's propagate policy, and
    /// [`StompError::FrameTooLarge`].
    pub fn start_blocking<F>(&self, endpoint: EndPoint, callback: F) -> Result<bool, StompError>
    where
        F: Fn(&[u8], &EndPoint) + Send + Sync + 'static,
    {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            warn!("start_blocking on a session that is already started");
            return Ok(false);
        }
        if !self.handshake()? {
            return Ok(false);
        }

        if self.subscribe(endpoint.clone(), callback)? {
            self.shared.dispatch(Some(&endpoint))?;
            self.unsubscribe(&endpoint)?;
        }
        self.shared.conn.disconnect()
    }

    /// Sends DISCONNECT.
    ///
    /// The dispatch thread keeps running until the broker closes the socket.
    pub fn stop(&self) -> Result<bool, StompError> {
        self.shared.conn.disconnect()
    }

    /// Handshakes, clearing the started flag again on failure.
    fn handshake(&self) -> Result<bool, StompError> {
        let outcome = self.shared.conn.handshake();
        if !matches!(outcome, Ok(true)) {
            self.shared.started.store(false, Ordering::SeqCst);
        }
        outcome
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!("disconnect on drop failed: {e}");
        }
        self.shared.stopped.store(true, Ordering::SeqCst);

        let handle = self
            .dispatcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // Dropped from inside a callback: the thread cannot join itself.
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("dispatch thread panicked");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
