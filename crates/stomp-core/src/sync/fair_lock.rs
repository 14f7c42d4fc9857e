//! A strictly FIFO, reentrant mutual-exclusion lock.
//!
//! # Why not `std::sync::Mutex`? (for beginners)
//!
//! A standard mutex makes no promise about *which* blocked thread gets the
//! lock next, and locking it twice from the same thread deadlocks.  The
//! connection layer needs both properties the other way round:
//!
//! - **FIFO hand-off** – publishers write whole frames to one socket.  When
//!   several are waiting, the one that arrived first writes first.
//! - **Reentrancy** – a thread that already holds the lock may take it again
//!   without blocking; the lock is released only after a matching number of
//!   releases.
//!
//! # How it works
//!
//! Every acquirer appends a waiter to a queue.  The waiter at the front of the
//! queue is the holder; it stays there as a placeholder until its final
//! release, at which point it is removed and the next waiter's one-shot
//! channel is signalled.
//!
//! ```text
//! queue: [T0 (holder, count=1)] [T1 (blocked)] [T2 (blocked)]
//! release(T0)  →  [T1 (holder, count=1)] [T2 (blocked)]
//! ```

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use thiserror::Error;
use tracing::error;

/// Errors raised by [`FairLock`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FairLockError {
    /// `release` was called by an owner that does not hold the lock.
    #[error("fair lock released by {caller:?}, but it is held by {holder:?}")]
    NotOwner {
        holder: Option<ThreadId>,
        caller: ThreadId,
    },
}

/// One queued acquirer.
struct Waiter {
    owner: ThreadId,
    /// Taken and signalled when this waiter becomes the holder.
    ready: Option<SyncSender<()>>,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Waiter>,
    holder: Option<ThreadId>,
    count: u32,
}

impl State {
    /// Makes the front waiter the holder and wakes it.
    fn fulfill_front(&mut self) {
        if let Some(front) = self.queue.front_mut() {
            self.holder = Some(front.owner);
            self.count = 1;
            if let Some(ready) = front.ready.take() {
                // The receiver only disappears if its thread is gone.
                let _ = ready.send(());
            }
        }
    }
}

/// A FIFO ticket lock with same-owner reentrancy.
///
/// Owners are identified by [`ThreadId`].  Use [`FairLock::lock`] for the
/// common RAII form, or the explicit [`acquire`](FairLock::acquire) /
/// [`release`](FairLock::release) pair.
///
/// # Examples
///
/// ```rust
/// use stomp_core::FairLock;
///
/// let lock = FairLock::new();
/// {
///     let _outer = lock.lock();
///     let _inner = lock.lock(); // same thread: does not block
/// }
/// assert!(!lock.is_locked());
/// ```
#[derive(Default)]
pub struct FairLock {
    state: Mutex<State>,
}

impl FairLock {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the lock for `owner`, blocking behind earlier waiters.
    ///
    /// If `owner` already holds the lock the reentrancy count is incremented
    /// and the call returns immediately.
    pub fn acquire(&self, owner: ThreadId) {
        let ready: Receiver<()> = {
            let mut state = self.state();

            if state.holder == Some(owner) {
                state.count += 1;
                return;
            }

            let (tx, rx) = sync_channel(1);
            state.queue.push_back(Waiter {
                owner,
                ready: Some(tx),
            });
            if state.queue.len() == 1 {
                state.fulfill_front();
                return;
            }
            rx
        };

        // Fulfilment always sends before the waiter's entry can be removed,
        // so this only returns once we are the holder.
        let _ = ready.recv();
    }

    /// Releases one level of `owner`'s hold on the lock.
    ///
    /// When the reentrancy count reaches zero the next queued waiter becomes
    /// the holder.
    ///
    /// # Errors
    ///
    /// Returns [`FairLockError::NotOwner`] if `owner` is not the holder.
    pub fn release(&self, owner: ThreadId) -> Result<(), FairLockError> {
        let mut state = self.state();

        if state.holder != Some(owner) {
            return Err(FairLockError::NotOwner {
                holder: state.holder,
                caller: owner,
            });
        }

        state.count -= 1;
        if state.count == 0 {
            state.queue.pop_front();
            state.holder = None;
            state.fulfill_front();
        }
        Ok(())
    }

    /// Acquires the lock for the current thread and returns a guard that
    /// releases it on drop.
    pub fn lock(&self) -> FairGuard<'_> {
        let owner = thread::current().id();
        self.acquire(owner);
        FairGuard {
            lock: self,
            owner,
            _not_send: PhantomData,
        }
    }

    /// Returns `true` if any owner holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state().holder.is_some()
    }

    /// The current holder, if any.
    pub fn holder(&self) -> Option<ThreadId> {
        self.state().holder
    }

    /// Number of owners blocked behind the holder.
    pub fn waiting(&self) -> usize {
        self.state().queue.len().saturating_sub(1)
    }
}

/// RAII guard returned by [`FairLock::lock`].
///
/// The guard is tied to the thread that created it (it is not `Send`), so its
/// release always comes from the holder.
pub struct FairGuard<'a> {
    lock: &'a FairLock,
    owner: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FairGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release(self.owner) {
            error!("fair lock guard release failed: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// Spins until `lock` reports `n` blocked waiters.
    fn wait_for_waiters(lock: &FairLock, n: usize) {
        while lock.waiting() < n {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_new_lock_is_unlocked() {
        let lock = FairLock::new();
        assert!(!lock.is_locked());
        assert_eq!(lock.waiting(), 0);
    }

    #[test]
    fn test_acquire_makes_caller_holder() {
        // Arrange
        let lock = FairLock::new();
        let me = thread::current().id();

        // Act
        lock.acquire(me);

        // Assert
        assert_eq!(lock.holder(), Some(me));
        lock.release(me).unwrap();
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_release_by_non_holder_is_an_error() {
        // Arrange
        let lock = Arc::new(FairLock::new());
        let me = thread::current().id();
        lock.acquire(me);

        // Act – another thread tries to release our hold
        let other = Arc::clone(&lock);
        let result = thread::spawn(move || other.release(thread::current().id()))
            .join()
            .expect("thread panicked");

        // Assert
        assert!(matches!(result, Err(FairLockError::NotOwner { holder: Some(h), .. }) if h == me));
        assert_eq!(lock.holder(), Some(me), "failed release must not change the holder");
        lock.release(me).unwrap();
    }

    #[test]
    fn test_release_of_unlocked_lock_is_an_error() {
        let lock = FairLock::new();
        let result = lock.release(thread::current().id());
        assert!(matches!(result, Err(FairLockError::NotOwner { holder: None, .. })));
    }

    #[test]
    fn test_reentrant_acquire_needs_matching_releases() {
        // Arrange
        let lock = Arc::new(FairLock::new());
        let me = thread::current().id();
        lock.acquire(me);
        lock.acquire(me); // must not deadlock

        let contender = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let _guard = lock.lock();
                thread::current().id()
            })
        };
        wait_for_waiters(&lock, 1);

        // Act / Assert – one release keeps us the holder
        lock.release(me).unwrap();
        assert_eq!(lock.holder(), Some(me));
        assert_eq!(lock.waiting(), 1);

        // The second release hands the lock over
        lock.release(me).unwrap();
        let contender_id = contender.join().expect("contender panicked");
        assert_ne!(contender_id, me);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_waiters_are_granted_in_arrival_order() {
        // Arrange – T0 (this thread) holds the lock
        let lock = Arc::new(FairLock::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let holder = lock.lock();

        // T1..T5 queue up one at a time so arrival order is known
        let mut handles = Vec::new();
        for i in 1..=5 {
            let waiter_lock = Arc::clone(&lock);
            let waiter_order = Arc::clone(&order);
            handles.push(thread::spawn(move || {
                let _guard = waiter_lock.lock();
                waiter_order.lock().unwrap().push(i);
            }));
            wait_for_waiters(&lock, i);
        }

        // Act
        drop(holder);
        for h in handles {
            h.join().expect("waiter panicked");
        }

        // Assert
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = FairLock::new();
        {
            let _guard = lock.lock();
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_lock_is_mutually_exclusive_under_contention() {
        // Arrange
        let lock = Arc::new(FairLock::new());
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let threads = 8;

        // Act
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let _guard = lock.lock();
                        let before = inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        assert_eq!(before, 0, "two holders inside the critical section");
                        inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                    }
                })
            })
            .collect();

        // Assert
        for h in handles {
            h.join().expect("thread panicked");
        }
        assert!(!lock.is_locked());
    }
}
