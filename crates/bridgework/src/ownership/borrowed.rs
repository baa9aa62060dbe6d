//! Non-owning views

use std::fmt;
use std::ops::Deref;
use std::sync::MutexGuard;

/// A non-owning view of a value owned elsewhere.
///
/// The lifetime ties the view to its owner. There is no way to destroy,
/// take or reset through a view: it only dereferences.
pub struct Borrowed<'a, T> {
    value: &'a T,
}

impl<'a, T> Borrowed<'a, T> {
    /// Borrow a value.
    pub fn new(value: &'a T) -> Self {
        Self { value }
    }

    /// Access the viewed value for the full borrow lifetime.
    pub fn get(&self) -> &'a T {
        self.value
    }
}

impl<T> Clone for Borrowed<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Borrowed<'_, T> {}

impl<T> Deref for Borrowed<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Borrowed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Borrowed").field(self.value).finish()
    }
}

/// A read-only view of a lock-protected global value.
///
/// Holds the lock for as long as the view lives, so the global cannot be
/// replaced underneath the reader. Do not keep a view across other calls on
/// the same cell from the same thread; see [`GlobalExclusive`].
///
/// [`GlobalExclusive`]: super::GlobalExclusive
pub struct GlobalBorrow<'a, T> {
    guard: MutexGuard<'a, Box<T>>,
}

impl<'a, T> GlobalBorrow<'a, T> {
    pub(crate) fn new(guard: MutexGuard<'a, Box<T>>) -> Self {
        Self { guard }
    }
}

impl<T> Deref for GlobalBorrow<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T: fmt::Debug> fmt::Debug for GlobalBorrow<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalBorrow").field(&**self.guard).finish()
    }
}
