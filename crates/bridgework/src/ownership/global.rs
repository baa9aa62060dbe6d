//! Lock-guarded global exclusive value

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::GlobalBorrow;

/// A single exclusively owned value reachable from many callers.
///
/// The cell always holds a value. Readers get a [`GlobalBorrow`], which
/// has no destroy path; writers copy into the value or swap it out under
/// the lock.
///
/// A [`GlobalBorrow`] holds the lock. On the thread that holds a view, any
/// other call on the same cell waits for that view to drop, except
/// [`GlobalExclusive::assign_from`] given the viewed value itself, which is
/// a no-op. Copy what you need out of a view before writing to the cell.
pub struct GlobalExclusive<T> {
    inner: Mutex<Box<T>>,
    // Heap address of the value; writers swap contents, never the box
    addr: usize,
}

impl<T> GlobalExclusive<T> {
    /// Create a cell owning `value`.
    pub fn new(value: T) -> Self {
        let boxed = Box::new(value);
        let addr = &*boxed as *const T as usize;
        Self {
            inner: Mutex::new(boxed),
            addr,
        }
    }

    /// Check whether `value` is the value this cell owns.
    pub fn holds(&self, value: &T) -> bool {
        value as *const T as usize == self.addr
    }

    fn lock(&self) -> MutexGuard<'_, Box<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrow the global value for reading.
    ///
    /// The lock is held until the view is dropped.
    pub fn view(&self) -> GlobalBorrow<'_, T> {
        GlobalBorrow::new(self.lock())
    }

    /// Run `f` with mutable access to the value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Swap in a new value and hand the previous one back to the caller.
    pub fn replace(&self, value: T) -> T {
        let mut guard = self.lock();
        std::mem::replace(&mut **guard, value)
    }

    /// Install `value`, destroying the previous one.
    ///
    /// The previous value is dropped after the lock is released.
    pub fn replace_with(&self, value: T) {
        let previous = self.replace(value);
        drop(previous);
    }
}

impl<T: Default> GlobalExclusive<T> {
    /// Move the value out, leaving the default in its place.
    pub fn take(&self) -> T {
        self.replace(T::default())
    }
}

impl<T: Clone> GlobalExclusive<T> {
    /// Copy `source` into the global value without taking ownership of it.
    ///
    /// Assigning the cell's own value, as seen through a live view, leaves
    /// it unchanged and does not wait for the lock.
    pub fn assign_from(&self, source: &T) {
        if self.holds(source) {
            log::trace!("assign_from given the global value itself; nothing to copy");
            return;
        }
        let mut guard = self.lock();
        (**guard).clone_from(source);
    }
}

impl<T: fmt::Debug> fmt::Debug for GlobalExclusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalExclusive").field(&**self.lock()).finish()
    }
}
