//! Registry of named ownership slots
//!
//! A slot is a process-wide place that holds at most one value, used for
//! the "store now, fetch later" boundary idiom. Each slot has its own lock,
//! so concurrent store/fetch pairs on one slot serialize and can neither
//! double-free nor resurrect a value.

use std::any::{type_name, Any, TypeId};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use dashmap::DashMap;

use super::{Exclusive, Mode, Shared};
use crate::error::{BridgeError, Result};

/// Typed key for a slot holding [`Shared`] values of `T`.
#[derive(Debug)]
pub struct SharedSlot<T> {
    name: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

/// Typed key for a slot holding [`Exclusive`] values of `T`.
#[derive(Debug)]
pub struct ExclusiveSlot<T> {
    name: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SharedSlot<T> {
    /// The slot's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> ExclusiveSlot<T> {
    /// The slot's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for SharedSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for ExclusiveSlot<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _marker: PhantomData,
        }
    }
}

enum Stored {
    Exclusive(Box<dyn Any + Send>),
    Shared(Arc<dyn Any + Send + Sync>),
}

struct SlotEntry {
    mode: Mode,
    type_id: TypeId,
    type_name: &'static str,
    value: Mutex<Option<Stored>>,
}

impl SlotEntry {
    fn lock(&self) -> MutexGuard<'_, Option<Stored>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Explicit registry of named slots.
///
/// # Example
///
/// ```
/// use bridgework::{Shared, SlotRegistry};
///
/// let registry = SlotRegistry::new();
/// let slot = registry.declare_shared::<i32>("last").unwrap();
///
/// let mut handle = Shared::new(42);
/// registry.store_shared(&slot, &mut handle, |_| {}).unwrap();
/// assert!(handle.is_empty());
///
/// let fetched = registry.fetch_shared(&slot).unwrap();
/// assert_eq!(*fetched.get().unwrap(), 42);
/// assert!(registry.fetch_shared(&slot).unwrap().is_empty());
/// ```
#[derive(Default)]
pub struct SlotRegistry {
    slots: DashMap<String, Arc<SlotEntry>>,
}

impl SlotRegistry {
    /// Create a registry with no slots.
    pub fn new() -> Self {
        Self::default()
    }

    fn declare<T: 'static>(&self, name: &str, mode: Mode) -> Result<Arc<str>> {
        let entry = Arc::clone(
            self.slots
                .entry(name.to_string())
                .or_insert_with(|| {
                    log::debug!("declared {:?} slot '{}' for {}", mode, name, type_name::<T>());
                    Arc::new(SlotEntry {
                        mode,
                        type_id: TypeId::of::<T>(),
                        type_name: type_name::<T>(),
                        value: Mutex::new(None),
                    })
                })
                .value(),
        );

        if entry.mode != mode || entry.type_id != TypeId::of::<T>() {
            return Err(BridgeError::SlotMismatch {
                name: name.to_string(),
                declared: entry.mode,
                declared_type: entry.type_name,
                requested: mode,
                requested_type: type_name::<T>(),
            });
        }
        Ok(Arc::from(name))
    }

    /// Declare (or look up) a slot holding shared values of `T`.
    pub fn declare_shared<T: Send + Sync + 'static>(&self, name: &str) -> Result<SharedSlot<T>> {
        Ok(SharedSlot {
            name: self.declare::<T>(name, Mode::Shared)?,
            _marker: PhantomData,
        })
    }

    /// Declare (or look up) a slot holding exclusive values of `T`.
    pub fn declare_exclusive<T: Send + 'static>(&self, name: &str) -> Result<ExclusiveSlot<T>> {
        Ok(ExclusiveSlot {
            name: self.declare::<T>(name, Mode::Exclusive)?,
            _marker: PhantomData,
        })
    }

    fn entry(&self, name: &str) -> Result<Arc<SlotEntry>> {
        // Clone out so the shard lock is released before the slot lock is taken
        self.slots
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::invalid_state(format!("unknown slot '{}'", name)))
    }

    /// Move a shared handle into the slot, clearing the caller's handle.
    ///
    /// `on_store` runs on the stored value while the slot is still locked,
    /// so a fetch can only ever observe the value after it. A previous
    /// occupant is released once the lock is dropped.
    pub fn store_shared<T, F>(
        &self,
        slot: &SharedSlot<T>,
        handle: &mut Shared<T>,
        on_store: F,
    ) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&T),
    {
        let entry = self.entry(slot.name())?;
        let value = handle
            .take_arc()
            .ok_or_else(|| BridgeError::invalid_state("store of an empty shared handle"))?;

        let previous = {
            let mut guard = entry.lock();
            let previous = guard.replace(Stored::Shared(value.clone()));
            on_store(&*value);
            previous
        };
        drop(value);
        log::debug!("stored shared value in slot '{}'", slot.name());
        drop(previous);
        Ok(())
    }

    /// Move the shared value out of the slot, leaving it empty.
    ///
    /// An empty slot yields an empty handle.
    pub fn fetch_shared<T>(&self, slot: &SharedSlot<T>) -> Result<Shared<T>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self.entry(slot.name())?;
        let stored = entry.lock().take();
        match stored {
            None => Ok(Shared::empty()),
            Some(Stored::Shared(any)) => {
                log::debug!("fetched shared value from slot '{}'", slot.name());
                any.downcast::<T>()
                    .map(Shared::from_arc)
                    .map_err(|_| type_confusion(slot.name()))
            }
            Some(Stored::Exclusive(_)) => Err(type_confusion(slot.name())),
        }
    }

    /// Move an exclusive handle into the slot, clearing the caller's handle.
    ///
    /// `on_store` may mutate the stored value before any fetch can see it.
    /// A previous occupant is destroyed once the lock is dropped.
    pub fn store_exclusive<T, F>(
        &self,
        slot: &ExclusiveSlot<T>,
        handle: &mut Exclusive<T>,
        on_store: F,
    ) -> Result<()>
    where
        T: Send + 'static,
        F: FnOnce(&mut T),
    {
        let entry = self.entry(slot.name())?;
        let mut value = handle
            .take_box()
            .ok_or_else(|| BridgeError::invalid_state("store of an empty exclusive handle"))?;

        let previous = {
            let mut guard = entry.lock();
            on_store(&mut *value);
            guard.replace(Stored::Exclusive(value))
        };
        log::debug!("stored exclusive value in slot '{}'", slot.name());
        drop(previous);
        Ok(())
    }

    /// Move the exclusive value out of the slot, leaving it empty.
    ///
    /// An empty slot yields an empty handle.
    pub fn fetch_exclusive<T>(&self, slot: &ExclusiveSlot<T>) -> Result<Exclusive<T>>
    where
        T: Send + 'static,
    {
        let entry = self.entry(slot.name())?;
        let stored = entry.lock().take();
        match stored {
            None => Ok(Exclusive::empty()),
            Some(Stored::Exclusive(any)) => {
                log::debug!("fetched exclusive value from slot '{}'", slot.name());
                any.downcast::<T>()
                    .map(Exclusive::from_box)
                    .map_err(|_| type_confusion(slot.name()))
            }
            Some(Stored::Shared(_)) => Err(type_confusion(slot.name())),
        }
    }

    /// Check whether the named slot currently holds a value.
    pub fn is_populated(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .map(|e| e.lock().is_some())
            .unwrap_or(false)
    }

    /// Empty one slot, destroying or releasing its occupant.
    pub fn clear(&self, name: &str) {
        if let Ok(entry) = self.entry(name) {
            let previous = entry.lock().take();
            drop(previous);
        }
    }

    /// Empty every slot. Declarations are kept.
    pub fn clear_all(&self) {
        let entries: Vec<Arc<SlotEntry>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        for entry in entries {
            let previous = entry.lock().take();
            drop(previous);
        }
    }

    /// Number of declared slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no slot has been declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn type_confusion(name: &str) -> BridgeError {
    BridgeError::invalid_state(format!("slot '{}' holds a value of another type", name))
}

/// The process-wide slot registry.
pub fn global_registry() -> &'static SlotRegistry {
    static REGISTRY: OnceLock<SlotRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SlotRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn test_declare_is_idempotent() {
        let registry = SlotRegistry::new();
        registry.declare_shared::<i32>("a").unwrap();
        registry.declare_shared::<i32>("a").unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_declare_mode_mismatch() {
        let registry = SlotRegistry::new();
        registry.declare_shared::<i32>("a").unwrap();
        let err = registry.declare_exclusive::<i32>("a").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::SlotMismatch {
                declared: Mode::Shared,
                requested: Mode::Exclusive,
                ..
            }
        ));
    }

    #[test]
    fn test_declare_type_mismatch() {
        let registry = SlotRegistry::new();
        registry.declare_exclusive::<i32>("a").unwrap();
        assert!(registry.declare_exclusive::<String>("a").is_err());
    }

    #[test]
    fn test_store_empty_handle_is_invalid_state() {
        let registry = SlotRegistry::new();
        let slot = registry.declare_exclusive::<i32>("a").unwrap();
        let mut handle = Exclusive::empty();
        let err = registry.store_exclusive(&slot, &mut handle, |_| {});
        assert!(matches!(err, Err(BridgeError::InvalidState(_))));
        assert!(!registry.is_populated("a"));
    }

    #[test]
    fn test_store_then_fetch_exclusive_with_mutation() {
        let registry = SlotRegistry::new();
        let slot = registry.declare_exclusive::<i32>("a").unwrap();
        let mut handle = Exclusive::new(1);
        registry
            .store_exclusive(&slot, &mut handle, |v| *v = 99)
            .unwrap();
        assert!(handle.is_empty());
        assert!(registry.is_populated("a"));

        let fetched = registry.fetch_exclusive(&slot).unwrap();
        assert_eq!(*fetched.get().unwrap(), 99);
        assert!(!registry.is_populated("a"));
    }

    #[test]
    fn test_store_shared_mutation_visible_through_aliases() {
        let registry = SlotRegistry::new();
        let slot = registry.declare_shared::<AtomicI32>("a").unwrap();
        let mut handle = Shared::new(AtomicI32::new(42));
        let alias = handle.clone();
        registry
            .store_shared(&slot, &mut handle, |v| v.store(13, Ordering::SeqCst))
            .unwrap();
        assert_eq!(alias.get().unwrap().load(Ordering::SeqCst), 13);
        assert_eq!(alias.strong_count(), 2);
    }

    #[test]
    fn test_fetch_empty_twice() {
        let registry = SlotRegistry::new();
        let slot = registry.declare_shared::<i32>("a").unwrap();
        assert!(registry.fetch_shared(&slot).unwrap().is_empty());
        assert!(registry.fetch_shared(&slot).unwrap().is_empty());
    }

    #[test]
    fn test_slot_from_other_registry_is_unknown() {
        let a = SlotRegistry::new();
        let b = SlotRegistry::new();
        let slot = a.declare_shared::<i32>("x").unwrap();
        assert!(matches!(
            b.fetch_shared(&slot),
            Err(BridgeError::InvalidState(_))
        ));
    }

    #[test]
    fn test_clear_all_keeps_declarations() {
        let registry = SlotRegistry::new();
        let slot = registry.declare_shared::<i32>("a").unwrap();
        registry
            .store_shared(&slot, &mut Shared::new(1), |_| {})
            .unwrap();
        registry.clear_all();
        assert!(!registry.is_populated("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_global_registry_is_singleton() {
        assert!(std::ptr::eq(global_registry(), global_registry()));
    }
}
