//! Lazily computed values.
//!
//! A [`Binding<T>`] derives its value from other state through a computation
//! closure. The result is cached until [`Binding::invalidate`] is called, so
//! observers of the source state only need to mark the binding dirty.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

/// A computed value that caches its result until invalidated.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI64, Ordering};
/// use horizon_quantity_core::Binding;
///
/// let source = Arc::new(AtomicI64::new(2));
/// let reader = source.clone();
/// let doubled = Binding::new(move || reader.load(Ordering::SeqCst) * 2);
///
/// assert_eq!(doubled.get(), 4);
///
/// source.store(5, Ordering::SeqCst);
/// assert_eq!(doubled.get(), 4); // still cached
///
/// doubled.invalidate();
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Binding<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cached: RwLock<Option<T>>,
    dirty: AtomicBool,
    computations: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Binding<T> {
    /// `compute` runs on the first [`get`](Self::get) and on the first `get`
    /// after each [`invalidate`](Self::invalidate).
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            compute: Box::new(compute),
            cached: RwLock::new(None),
            dirty: AtomicBool::new(true),
            computations: AtomicU64::new(0),
        }
    }

    /// The cached value, recomputed first if the binding is dirty.
    pub fn get(&self) -> T {
        if !self.dirty.load(Ordering::Acquire) {
            if let Some(value) = self.cached.read().as_ref() {
                return value.clone();
            }
        }

        // Clear the flag before computing so an invalidation that races with
        // the computation is not lost.
        self.dirty.store(false, Ordering::Release);
        let value = (self.compute)();
        self.computations.fetch_add(1, Ordering::Relaxed);
        *self.cached.write() = Some(value.clone());
        value
    }

    /// The cached value, if one is present and still valid.
    pub fn peek(&self) -> Option<T> {
        if self.is_dirty() {
            None
        } else {
            self.cached.read().clone()
        }
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
        self.cached.write().take();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Number of times the computation has run.
    pub fn computation_count(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("dirty", &self.dirty.load(Ordering::Acquire))
            .field("cached", &*self.cached.read())
            .finish()
    }
}
