//! Exclusive ownership handle

use std::fmt;

use super::Borrowed;
use crate::error::{BridgeError, Result};

/// A handle with at most one live owner.
///
/// Moving the value out through [`Exclusive::take`] leaves this handle
/// empty; any further access reports [`BridgeError::InvalidState`] instead
/// of dangling.
///
/// # Example
///
/// ```
/// use bridgework::Exclusive;
///
/// let mut source = Exclusive::new(5);
/// let dest = source.take();
///
/// assert!(source.is_empty());
/// assert_eq!(*dest.get().unwrap(), 5);
/// ```
pub struct Exclusive<T> {
    value: Option<Box<T>>,
}

impl<T> Exclusive<T> {
    /// Take sole ownership of a new value.
    pub fn new(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
        }
    }

    /// Create a handle that owns nothing.
    pub fn empty() -> Self {
        Self { value: None }
    }

    /// Wrap an already boxed value.
    pub fn from_box(value: Box<T>) -> Self {
        Self { value: Some(value) }
    }

    /// Check whether the handle currently owns nothing.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Access the owned value.
    pub fn get(&self) -> Result<&T> {
        self.value
            .as_deref()
            .ok_or_else(|| BridgeError::invalid_state("dereference of an empty exclusive handle"))
    }

    /// Access the owned value mutably.
    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.value
            .as_deref_mut()
            .ok_or_else(|| BridgeError::invalid_state("dereference of an empty exclusive handle"))
    }

    /// Transfer ownership out, leaving this handle empty.
    ///
    /// Taking from an empty handle yields another empty handle.
    pub fn take(&mut self) -> Exclusive<T> {
        Exclusive {
            value: self.value.take(),
        }
    }

    /// Move the boxed value out, if any.
    pub(crate) fn take_box(&mut self) -> Option<Box<T>> {
        self.value.take()
    }

    /// Consume the handle and return the value, if any.
    pub fn into_inner(self) -> Option<T> {
        self.value.map(|b| *b)
    }

    /// Destroy the current occupant and install `value` in its place.
    ///
    /// The previous value is dropped before the new one is stored.
    pub fn replace_with(&mut self, value: T) {
        self.reset();
        self.value = Some(Box::new(value));
    }

    /// Destroy the current occupant, then construct a new one in place.
    ///
    /// Unlike [`Exclusive::replace_with`], the new value is not even
    /// constructed until the old one is gone.
    pub fn reset_with<F>(&mut self, make: F)
    where
        F: FnOnce() -> T,
    {
        self.reset();
        self.value = Some(Box::new(make()));
    }

    /// Destroy the current occupant, leaving the handle empty.
    pub fn reset(&mut self) {
        drop(self.value.take());
    }

    /// Produce a non-owning view of the value.
    pub fn borrow(&self) -> Result<Borrowed<'_, T>> {
        self.get().map(Borrowed::new)
    }
}

impl<T> Default for Exclusive<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Exclusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => f.debug_tuple("Exclusive").field(v).finish(),
            None => write!(f, "Exclusive(<empty>)"),
        }
    }
}
