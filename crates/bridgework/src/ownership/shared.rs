//! Shared (reference-counted) ownership handle

use std::fmt;
use std::sync::Arc;

use super::Borrowed;
use crate::error::{BridgeError, Result};

/// A reference-counted handle.
///
/// Cloning adds an owner; dropping or [`Shared::release`] removes one. The
/// value is destroyed exactly once, when the last owner goes away.
pub struct Shared<T> {
    value: Option<Arc<T>>,
}

impl<T> Shared<T> {
    /// Allocate a new value with a reference count of one.
    pub fn new(value: T) -> Self {
        Self {
            value: Some(Arc::new(value)),
        }
    }

    /// Create a handle that refers to nothing.
    pub fn empty() -> Self {
        Self { value: None }
    }

    /// Wrap an existing reference.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self { value: Some(value) }
    }

    /// Check whether the handle currently refers to nothing.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Access the shared value.
    pub fn get(&self) -> Result<&T> {
        self.value
            .as_deref()
            .ok_or_else(|| BridgeError::invalid_state("dereference of an empty shared handle"))
    }

    /// Number of live handles to the value, or zero when empty.
    pub fn strong_count(&self) -> usize {
        self.value.as_ref().map(Arc::strong_count).unwrap_or(0)
    }

    /// Drop this handle's reference, leaving it empty.
    pub fn release(&mut self) {
        drop(self.value.take());
    }

    /// Move this handle's reference out, leaving it empty.
    ///
    /// The count does not change; the reference only changes hands.
    pub fn take(&mut self) -> Shared<T> {
        Shared {
            value: self.value.take(),
        }
    }

    pub(crate) fn take_arc(&mut self) -> Option<Arc<T>> {
        self.value.take()
    }

    /// Check whether two handles alias the same value.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        match (&self.value, &other.value) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Produce a non-owning view of the value.
    pub fn borrow(&self) -> Result<Borrowed<'_, T>> {
        self.get().map(Borrowed::new)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => f
                .debug_struct("Shared")
                .field("value", v)
                .field("count", &Arc::strong_count(v))
                .finish(),
            None => write!(f, "Shared(<empty>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_clone_increments_count() {
        let a = Shared::new(1);
        let b = a.clone();
        assert_eq!(a.strong_count(), 2);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_destroyed_on_last_release() {
        let drops = Arc::new(AtomicUsize::new(0));
        let mut a = Shared::new(Counted(Arc::clone(&drops)));
        let mut b = a.clone();

        a.release();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        assert!(a.is_empty());
        assert_eq!(b.strong_count(), 1);

        b.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_take_keeps_count() {
        let mut a = Shared::new(5);
        let keep = a.clone();
        let b = a.take();
        assert!(a.is_empty());
        assert_eq!(a.strong_count(), 0);
        assert_eq!(keep.strong_count(), 2);
        assert_eq!(*b.get().unwrap(), 5);
    }

    #[test]
    fn test_empty_access_is_invalid_state() {
        let handle: Shared<i32> = Shared::empty();
        assert!(matches!(handle.get(), Err(BridgeError::InvalidState(_))));
        assert!(handle.borrow().is_err());
    }
}
