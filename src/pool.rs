//! Concurrent free lists of reusable codec engines and scratch buffers.
//!
//! A [`Pool`] hands out [`Lease`]s. A lease owns its item exclusively and puts
//! it back when dropped, so an item is returned exactly once per borrow and can
//! never be handed to two borrowers at the same time. Items are reset on the way
//! back in; everything sitting in a pool is detached from any stream.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tako_compress::pool::{Buffer, Pool};
//!
//! let pool = Arc::new(Pool::new("scratch", 8, || Ok(Buffer::new(1024))));
//! {
//!     let mut buf = Pool::get(&pool).unwrap();
//!     buf.extend_from_slice(b"hello");
//! }
//! assert_eq!(pool.idle(), 1);
//! ```

use std::{
    fmt, io,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use parking_lot::Mutex;

/// Items that can be returned to a [`Pool`].
pub trait Recycle: Send + 'static {
    /// Detaches the item from whatever it was last used for.
    ///
    /// An item whose reset fails is dropped instead of pooled.
    fn recycle(&mut self) -> io::Result<()>;
}

/// Pooled scratch buffer with a nominal size.
///
/// A buffer may grow past its size while in use. Recycling empties it and
/// gives back whatever capacity it gained beyond that size, so an idle buffer
/// never holds more than one size's worth of memory.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    size: usize,
}

impl Buffer {
    pub fn new(size: usize) -> Self {
        Self {
            data: Vec::with_capacity(size),
            size,
        }
    }

    /// Nominal size the buffer is trimmed back to between uses.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Deref for Buffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.data
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl Recycle for Buffer {
    fn recycle(&mut self) -> io::Result<()> {
        self.data.clear();
        if self.data.capacity() > self.size {
            self.data.shrink_to(self.size);
        }
        Ok(())
    }
}

type Factory<T> = Box<dyn Fn() -> io::Result<T> + Send + Sync>;

/// Unbounded-on-borrow, capped-on-return pool of `T`.
pub struct Pool<T> {
    label: &'static str,
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    factory: Factory<T>,
}

impl<T: Recycle> Pool<T> {
    /// Creates an empty pool.
    ///
    /// `factory` builds a fresh item when the pool is empty. At most `max_idle`
    /// idle items are retained; extra returns are dropped.
    pub fn new<F>(label: &'static str, max_idle: usize, factory: F) -> Self
    where
        F: Fn() -> io::Result<T> + Send + Sync + 'static,
    {
        Self {
            label,
            idle: Mutex::new(Vec::new()),
            max_idle,
            factory: Box::new(factory),
        }
    }

    /// Borrows an item, creating one if none is idle. Never blocks on
    /// exhaustion.
    pub fn get(pool: &Arc<Self>) -> io::Result<Lease<T>> {
        let pooled = pool.idle.lock().pop();
        let item = match pooled {
            Some(item) => item,
            None => {
                tracing::debug!(pool = pool.label, "pool empty, creating a new item");
                (pool.factory)()?
            }
        };

        Ok(Lease {
            item: Some(item),
            pool: Arc::clone(pool),
        })
    }

    /// Resets `item` and makes it available to the next borrower.
    pub fn put(&self, mut item: T) {
        if let Err(err) = item.recycle() {
            tracing::warn!(pool = self.label, error = %err, "reset failed, discarding item");
            return;
        }

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Number of idle items currently held.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("label", &self.label)
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Exclusive borrow of a pooled item.
pub struct Lease<T: Recycle> {
    // Only `None` once `drop` has handed the item back.
    item: Option<T>,
    pool: Arc<Pool<T>>,
}

impl<T: Recycle> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("lease holds its item until dropped")
    }
}

impl<T: Recycle> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("lease holds its item until dropped")
    }
}

impl<T: Recycle> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            tracing::trace!(pool = self.pool.label, "returning item to pool");
            self.pool.put(item);
        }
    }
}
