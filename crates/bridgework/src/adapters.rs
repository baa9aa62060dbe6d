//! Boundary adapter fixtures
//!
//! Small native-side objects and the store/fetch entry points that move
//! them across the boundary in each ownership mode. They exercise the
//! transfer protocol end to end and count constructions and destructions
//! so leaks and double frees show up as numbers.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::ownership::{
    Borrowed, Exclusive, ExclusiveSlot, GlobalBorrow, GlobalExclusive, Shared, SharedSlot,
    SlotRegistry,
};

const SHARED_DATA_SLOT: &str = "shared_data";
const UNIQUE_DATA_SLOT: &str = "unique_data";

/// Construction and destruction counters.
#[derive(Debug, Default)]
pub struct Lifecycle {
    constructed: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Lifecycle {
    /// Number of objects constructed so far.
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// Number of objects destroyed so far.
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Objects constructed but not yet destroyed.
    pub fn live(&self) -> usize {
        self.constructed().saturating_sub(self.destroyed())
    }
}

/// Reference-counted fixture object.
#[derive(Debug)]
pub struct SharedData {
    /// Payload, writable through a shared reference
    pub data: AtomicI32,
    lifecycle: Arc<Lifecycle>,
}

impl SharedData {
    fn new(data: i32, lifecycle: &Arc<Lifecycle>) -> Self {
        lifecycle.constructed.fetch_add(1, Ordering::SeqCst);
        Self {
            data: AtomicI32::new(data),
            lifecycle: Arc::clone(lifecycle),
        }
    }

    /// Current payload.
    pub fn data(&self) -> i32 {
        self.data.load(Ordering::SeqCst)
    }
}

impl Drop for SharedData {
    fn drop(&mut self) {
        self.lifecycle.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Exclusively owned fixture object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueData {
    /// Payload
    pub data: i32,
}

/// Value held by the global unique cell before anything is stored.
pub const INITIAL_UNIQUE_DATA: i32 = 13;

/// Fixture object that crosses the boundary by value move.
///
/// `Default` is the moved-from state: still allocated, payload 0.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MovedData {
    /// Payload
    pub data: i32,
}

/// Value held by the global moved cell before anything is put.
pub const INITIAL_MOVED_DATA: i32 = 13;

/// The adapter entry points with their process-wide state.
///
/// Each instance has its own storage, so independent instances behave like
/// independent processes.
pub struct AdapterFixtures {
    lifecycle: Arc<Lifecycle>,
    registry: SlotRegistry,
    unique: GlobalExclusive<UniqueData>,
    moved: GlobalExclusive<MovedData>,
}

impl Default for AdapterFixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFixtures {
    /// Create fixtures with empty storage.
    pub fn new() -> Self {
        Self {
            lifecycle: Arc::new(Lifecycle::default()),
            registry: SlotRegistry::new(),
            unique: GlobalExclusive::new(UniqueData {
                data: INITIAL_UNIQUE_DATA,
            }),
            moved: GlobalExclusive::new(MovedData {
                data: INITIAL_MOVED_DATA,
            }),
        }
    }

    fn shared_slot(&self) -> Result<SharedSlot<SharedData>> {
        self.registry.declare_shared(SHARED_DATA_SLOT)
    }

    fn unique_slot(&self) -> Result<ExclusiveSlot<UniqueData>> {
        self.registry.declare_exclusive(UNIQUE_DATA_SLOT)
    }

    /// Counters for [`SharedData`] objects made by these fixtures.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Create a shared object holding 42.
    pub fn create_shared_data(&self) -> Shared<SharedData> {
        Shared::new(SharedData::new(42, &self.lifecycle))
    }

    /// Store a shared object, then set its payload to 13.
    ///
    /// The caller's handle is cleared; ownership now sits with the slot.
    pub fn store_shared_data(&self, handle: &mut Shared<SharedData>) -> Result<()> {
        self.registry
            .store_shared(&self.shared_slot()?, handle, |stored| {
                stored.data.store(13, Ordering::SeqCst)
            })
    }

    /// Take the stored shared object out, leaving the slot empty.
    pub fn fetch_shared_data(&self) -> Result<Shared<SharedData>> {
        self.registry.fetch_shared(&self.shared_slot()?)
    }

    /// Create an exclusive object holding 5.
    pub fn create_unique_data(&self) -> Exclusive<UniqueData> {
        Exclusive::new(UniqueData { data: 5 })
    }

    /// Reset the caller's handle in place to a new object holding 42.
    pub fn create_unique_data_into(&self, handle: &mut Exclusive<UniqueData>) {
        handle.reset_with(|| UniqueData { data: 42 });
    }

    /// Copy a borrowed object's payload into the global unique value.
    ///
    /// Passing a view of the global value itself leaves it unchanged.
    pub fn store_unique_data(&self, value: Borrowed<'_, UniqueData>) {
        self.unique.assign_from(value.get());
    }

    /// A view of the global unique value.
    pub fn fetch_unique_data(&self) -> GlobalBorrow<'_, UniqueData> {
        self.unique.view()
    }

    /// Move an exclusive object into the unique slot.
    pub fn store_unique_slot(&self, handle: &mut Exclusive<UniqueData>) -> Result<()> {
        self.registry.store_exclusive(&self.unique_slot()?, handle, |_| {})
    }

    /// Move the global moved value out into a new allocation.
    ///
    /// The global is left in the moved-from state.
    pub fn get_moved_data(&self) -> Exclusive<MovedData> {
        Exclusive::new(self.moved.take())
    }

    /// Move the handle's value into the global moved value.
    ///
    /// The handle keeps its allocation, now in the moved-from state. Fails
    /// with [`BridgeError::InvalidState`](crate::BridgeError::InvalidState)
    /// on an empty handle.
    pub fn put_moved_data(&self, handle: &mut Exclusive<MovedData>) -> Result<()> {
        let value = std::mem::take(handle.get_mut()?);
        self.moved.replace_with(value);
        Ok(())
    }

    /// Move the exclusive object out of the unique slot.
    pub fn fetch_unique_slot(&self) -> Result<Exclusive<UniqueData>> {
        self.registry.fetch_exclusive(&self.unique_slot()?)
    }
}
