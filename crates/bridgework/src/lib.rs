//! # Bridgework
//!
//! The runtime boundary layer of a native/managed interop bridge.
//!
//! Bridgework moves values and failures between a native runtime with
//! explicit ownership and a managed, garbage-collected runtime. It covers
//! the parts of that boundary where getting it wrong means a double free,
//! a lost exception, or a thread that cannot find its classes.
//!
//! ## Architecture
//!
//! - **Ownership**: exclusive, shared and borrowed handles plus a registry
//!   of lock-guarded slots for store-now, fetch-later transfers
//! - **Exception bridge**: classifies native failures and rebuilds their
//!   cause chains as managed exceptions
//! - **Class resolution**: a swappable, process-wide class-loading context
//!   that native worker threads install before calling back
//! - **Dispatch**: runs managed callbacks on a native worker thread and
//!   joins it before returning
//! - **Boundary**: composes the above around a single native call
//!
//! ```
//! use bridgework::{Exclusive, Shared, SlotRegistry};
//!
//! let registry = SlotRegistry::new();
//! let slot = registry.declare_exclusive::<String>("last").unwrap();
//!
//! let mut owned = Exclusive::new(String::from("payload"));
//! registry.store_exclusive(&slot, &mut owned, |_| {}).unwrap();
//! assert!(owned.is_empty());
//!
//! let back = registry.fetch_exclusive(&slot).unwrap();
//! assert_eq!(back.get().unwrap(), "payload");
//!
//! let shared = Shared::new(1);
//! let alias = shared.clone();
//! assert_eq!(alias.strong_count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod boundary;
pub mod config;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod exception;
pub mod ownership;
pub mod resolution;

// Re-export main types
pub use boundary::Boundary;
pub use config::{BridgeConfig, CancelToken};
pub use dispatch::{infallible, Callback, DispatchReport, Dispatcher};
pub use enums::{EnumValue, EnumWidth, NativeEnum};
pub use error::{BridgeError, Result};
pub use exception::{
    classify, ExceptionBridge, ExceptionKind, ManagedException, NativeError, NativeErrorKind,
    ThrowableFactory,
};
pub use ownership::{
    global_registry, Borrowed, Exclusive, GlobalBorrow, GlobalExclusive, Mode, Scope, Shared,
    SlotRegistry,
};
pub use resolution::{global_context, ClassHandle, ClassLoader, MapClassLoader, ResolutionContext};

/// Bridgework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
