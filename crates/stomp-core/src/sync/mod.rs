//! Synchronisation primitives that do not depend on the protocol.

pub mod fair_lock;

pub use fair_lock::{FairGuard, FairLock, FairLockError};
