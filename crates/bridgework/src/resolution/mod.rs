//! Class resolution for threads the managed runtime did not create
//!
//! A [`ResolutionContext`] holds one swappable reference to a
//! [`ClassLoader`]. Native threads have no class-loading context of their
//! own, so before calling into managed code they install the global one
//! with [`ResolutionContext::ensure_thread_context`].

mod context;
mod loader;

pub use context::{
    clear_thread_context, ensure_thread_context, global_context, resolve, set_context,
    thread_context, ResolutionContext,
};
pub use loader::{ClassHandle, ClassLoader, MapClassLoader, CLASS_NOT_FOUND};
