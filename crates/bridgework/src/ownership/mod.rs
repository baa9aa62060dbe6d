//! Ownership-tagged handles and the transfer protocol
//!
//! Values crossing the boundary carry one of three ownership modes:
//!
//! - [`Exclusive`]: one live owner; transferring out leaves the source empty
//! - [`Shared`]: reference counted; destroyed when the last handle goes
//! - [`Borrowed`]: a view into a value owned elsewhere; never destroys
//!
//! Transfers consume or clear the source handle, so there is never an
//! ambiguous alias left behind. Process-wide storage goes through a
//! [`SlotRegistry`] or a [`GlobalExclusive`] cell, both lock-guarded.
//! A [`Scope`] releases everything attached to it when it closes.

mod borrowed;
mod exclusive;
mod global;
mod registry;
mod scope;
mod shared;

pub use borrowed::{Borrowed, GlobalBorrow};
pub use exclusive::Exclusive;
pub use global::GlobalExclusive;
pub use registry::{global_registry, ExclusiveSlot, SharedSlot, SlotRegistry};
pub use scope::{Scope, ScopeKey};
pub use shared::Shared;

/// Ownership mode of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Sole owner; transfer invalidates the source
    Exclusive,

    /// Reference counted; destruction on last release
    Shared,

    /// Non-owning view
    Borrowed,
}

impl Mode {
    /// Whether a handle in this mode may destroy the value it refers to.
    pub fn owns(&self) -> bool {
        !matches!(self, Mode::Borrowed)
    }
}
