//! Object pools for the request hot path.
//!
//! A [`Pool`] is a free-list of pre-built objects. [`Pool::acquire`] hands
//! out a [`Pooled`] guard that resets the object and returns it to the
//! free-list when dropped, on every exit path.

pub mod buffer;
pub mod hasher;

use std::fmt;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

pub use buffer::{BufferError, ByteReader, ScratchBuffer};
pub use hasher::{KeyedHasher, PlainHasher, DIGEST_LEN};

/// Default upper bound of idle objects kept by a pool.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Objects that can be returned to a pool.
///
/// After `reset` the object must be indistinguishable from a freshly
/// constructed one, except for retained capacity.
pub trait Reset {
    /// Clears all accumulated state.
    fn reset(&mut self);
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Thread-safe free-list of reusable objects.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    factory: Factory<T>,
    max_idle: usize,
}

impl<T: Reset> Pool<T> {
    /// Creates an empty pool building new objects with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_max_idle(factory, DEFAULT_MAX_IDLE)
    }

    /// Creates an empty pool that keeps at most `max_idle` released objects.
    pub fn with_max_idle<F>(factory: F, max_idle: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            free: Mutex::new(Vec::new()),
            factory: Box::new(factory),
            max_idle,
        }
    }

    /// Checks an object out of the pool, building one if none is idle.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let item = self.free.lock().pop().unwrap_or_else(|| (self.factory)());
        Pooled {
            item: Some(item),
            pool: self,
        }
    }

    /// Number of idle objects.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut item: T) {
        item.reset();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(item);
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.free.lock().len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Checked-out pool object. Returns to its pool when dropped.
pub struct Pooled<'a, T: Reset> {
    item: Option<T>,
    pool: &'a Pool<T>,
}

impl<T: Reset> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the item out.
        match self.item.as_ref() {
            Some(item) => item,
            None => unreachable!("pooled item taken before drop"),
        }
    }
}

impl<T: Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.item.as_mut() {
            Some(item) => item,
            None => unreachable!("pooled item taken before drop"),
        }
    }
}

impl<T: Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

impl<T: Reset + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&**self).finish()
    }
}
