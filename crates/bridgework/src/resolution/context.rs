//! The swappable class-resolution context

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ClassHandle, ClassLoader};
use crate::error::{BridgeError, Result};
use crate::exception::report_pending;

thread_local! {
    /// The calling thread's own class-loading context.
    static THREAD_CONTEXT: RefCell<Option<Arc<dyn ClassLoader>>> = const { RefCell::new(None) };
}

/// A lock-guarded reference to a class-loading authority.
///
/// Starts unset. [`ResolutionContext::set_context`] installs a loader and
/// may be called again to replace it; nothing ever moves it back to unset
/// except dropping the context.
#[derive(Debug)]
pub struct ResolutionContext {
    loader: Mutex<Option<Arc<dyn ClassLoader>>>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionContext {
    /// Create an unset context.
    pub const fn new() -> Self {
        Self {
            loader: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn ClassLoader>>> {
        self.loader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `loader`, releasing the previously held reference.
    pub fn set_context(&self, loader: Arc<dyn ClassLoader>) {
        let name = loader.name().to_string();
        let previous = self.lock().replace(loader);
        match &previous {
            Some(old) => log::debug!("class-resolution context '{}' replaced by '{}'", old.name(), name),
            None => log::debug!("class-resolution context set to '{}'", name),
        }
        drop(previous);
    }

    /// The currently installed loader.
    pub fn current(&self) -> Option<Arc<dyn ClassLoader>> {
        self.lock().clone()
    }

    /// Whether a loader has been installed.
    pub fn is_configured(&self) -> bool {
        self.lock().is_some()
    }

    /// Resolve a class name through the installed loader.
    ///
    /// Returns `None` when no loader is installed or the loader fails; a
    /// loader failure is reported and cleared, never propagated.
    pub fn resolve(&self, class_name: &str) -> Option<ClassHandle> {
        // The reference is cloned under the lock; the load itself runs
        // unlocked so a loader may call back into this context.
        let loader = self.current()?;
        match loader.load_class(class_name) {
            Ok(handle) => Some(handle),
            Err(pending) => {
                report_pending(&pending);
                None
            }
        }
    }

    /// Install this context's loader as the calling thread's context,
    /// unless the thread already has one.
    ///
    /// Returns `true` if a context was installed.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Unconfigured`] if no loader has been set.
    pub fn ensure_thread_context(&self) -> Result<bool> {
        let loader = self.current().ok_or(BridgeError::Unconfigured)?;
        THREAD_CONTEXT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Ok(false);
            }
            log::trace!(
                "installing class-resolution context '{}' on {:?}",
                loader.name(),
                std::thread::current().id()
            );
            *slot = Some(loader);
            Ok(true)
        })
    }
}

/// The calling thread's own class-loading context.
pub fn thread_context() -> Option<Arc<dyn ClassLoader>> {
    THREAD_CONTEXT.with(|slot| slot.borrow().clone())
}

/// Remove and return the calling thread's class-loading context.
pub fn clear_thread_context() -> Option<Arc<dyn ClassLoader>> {
    THREAD_CONTEXT.with(|slot| slot.borrow_mut().take())
}

static GLOBAL_CONTEXT: ResolutionContext = ResolutionContext::new();

/// The process-wide class-resolution context.
pub fn global_context() -> &'static ResolutionContext {
    &GLOBAL_CONTEXT
}

/// Install `loader` in the process-wide context.
pub fn set_context(loader: Arc<dyn ClassLoader>) {
    GLOBAL_CONTEXT.set_context(loader);
}

/// Resolve a class name through the process-wide context.
pub fn resolve(class_name: &str) -> Option<ClassHandle> {
    GLOBAL_CONTEXT.resolve(class_name)
}

/// Install the process-wide context on the calling thread if it has none.
pub fn ensure_thread_context() -> Result<bool> {
    GLOBAL_CONTEXT.ensure_thread_context()
}
