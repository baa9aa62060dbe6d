//! Boundary entry points
//!
//! A [`Boundary`] wraps one native computation the way every generated
//! entry point does: optionally resolve classes first, run the computation,
//! and on failure classify and build the managed exception chain exactly
//! once before control goes back to the managed caller.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::config::BridgeConfig;
use crate::dispatch::{Callback, DispatchReport, Dispatcher};
use crate::error::panic_message;
use crate::exception::{
    DirectFactory, ExceptionBridge, ManagedException, NativeError, NativeErrorKind,
    ThrowableFactory,
};
use crate::resolution::{global_context, ClassHandle, ResolutionContext};

/// Composes the exception bridge and the class-resolution context around
/// native computations.
///
/// # Example
///
/// ```
/// use bridgework::{Boundary, ExceptionKind, NativeError};
///
/// let boundary = Boundary::with_global_context();
///
/// let ok = boundary.call(|| Ok::<_, NativeError>(7));
/// assert_eq!(ok.unwrap(), 7);
///
/// let err = boundary
///     .call(|| Err::<i32, _>(NativeError::out_of_range("index 9")))
///     .unwrap_err();
/// assert_eq!(err.kind(), ExceptionKind::OutOfRange);
/// assert_eq!(err.message(), "index 9");
/// ```
pub struct Boundary<'c, F = DirectFactory> {
    bridge: ExceptionBridge<F>,
    context: &'c ResolutionContext,
}

impl Boundary<'static, DirectFactory> {
    /// Create a boundary over the process-wide context with default settings.
    pub fn with_global_context() -> Self {
        Self::new(BridgeConfig::default(), global_context())
    }
}

impl<'c> Boundary<'c, DirectFactory> {
    /// Create a boundary over `context` with the in-process factory.
    pub fn new(config: BridgeConfig, context: &'c ResolutionContext) -> Self {
        Self::with_bridge(ExceptionBridge::with_config(config), context)
    }
}

impl<'c, F: ThrowableFactory> Boundary<'c, F> {
    /// Create a boundary around an existing exception bridge.
    pub fn with_bridge(bridge: ExceptionBridge<F>, context: &'c ResolutionContext) -> Self {
        Self { bridge, context }
    }

    /// The boundary's configuration.
    pub fn config(&self) -> &BridgeConfig {
        self.bridge.config()
    }

    /// The exception bridge used on the failure path.
    pub fn bridge(&self) -> &ExceptionBridge<F> {
        &self.bridge
    }

    /// The class-resolution context consulted before a computation.
    pub fn context(&self) -> &'c ResolutionContext {
        self.context
    }

    /// Run a native computation.
    ///
    /// A returned [`NativeError`] becomes a managed exception chain. A panic
    /// is caught and becomes a `Generic` exception carrying the panic
    /// message, or the unknown message if the payload is not a string.
    pub fn call<T, G>(&self, native: G) -> Result<T, ManagedException>
    where
        G: FnOnce() -> Result<T, NativeError>,
    {
        let outcome = catch_unwind(AssertUnwindSafe(native)).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref())
                .unwrap_or_else(|| self.config().unknown_message.clone());
            log::debug!("native computation panicked: {}", message);
            Err(NativeError::new(NativeErrorKind::Unknown, message))
        });
        outcome.map_err(|err| self.bridge.build_exception_chain(&err))
    }

    /// Resolve `class_names`, then run a native computation with the
    /// results.
    ///
    /// Names that cannot be resolved show up as `None`; the failure is
    /// reported, not raised.
    pub fn call_with_classes<T, G>(
        &self,
        class_names: &[&str],
        native: G,
    ) -> Result<T, ManagedException>
    where
        G: FnOnce(&[Option<ClassHandle>]) -> Result<T, NativeError>,
    {
        let classes: Vec<Option<ClassHandle>> = class_names
            .iter()
            .map(|name| self.context.resolve(name))
            .collect();
        self.call(|| native(&classes))
    }

    /// Run a computation that fails with a bridge error.
    pub fn call_bridge<T, G>(&self, native: G) -> Result<T, ManagedException>
    where
        G: FnOnce() -> crate::error::Result<T>,
    {
        self.call(|| native().map_err(NativeError::from))
    }

    /// Run `callback(1..=count)` on a worker thread through this boundary.
    ///
    /// A callback failure or a worker panic comes back as a managed
    /// exception, after the worker has been joined.
    pub fn run_on_worker<C>(
        &self,
        callback: &mut C,
        count: i32,
    ) -> Result<DispatchReport, ManagedException>
    where
        C: Callback + Send + ?Sized,
    {
        let dispatcher = Dispatcher::new(self.config().clone(), self.context);
        self.call_bridge(|| dispatcher.run_on_worker(callback, count))
    }
}
