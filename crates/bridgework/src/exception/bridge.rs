//! Building managed exception chains from native failures

use super::{ExceptionKind, ManagedException, NativeError, NativeErrorKind};
use crate::config::BridgeConfig;

/// The managed runtime's exception construction calls.
///
/// Both calls re-enter the managed runtime and may leave a pending managed
/// failure, which is returned as the `Err` value.
pub trait ThrowableFactory {
    /// Construct an exception of `kind` carrying `message`.
    fn construct(
        &self,
        kind: ExceptionKind,
        message: &str,
    ) -> Result<ManagedException, ManagedException>;

    /// Attach `cause` to `exception`.
    fn attach_cause(
        &self,
        exception: &mut ManagedException,
        cause: ManagedException,
    ) -> Result<(), ManagedException>;
}

/// Factory that builds [`ManagedException`] records in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectFactory;

impl ThrowableFactory for DirectFactory {
    fn construct(
        &self,
        kind: ExceptionKind,
        message: &str,
    ) -> Result<ManagedException, ManagedException> {
        Ok(ManagedException::new(kind, message))
    }

    fn attach_cause(
        &self,
        exception: &mut ManagedException,
        cause: ManagedException,
    ) -> Result<(), ManagedException> {
        exception.init_cause(cause)
    }
}

/// Translates native failures into managed exceptions.
///
/// # Example
///
/// ```
/// use bridgework::{ExceptionBridge, ExceptionKind, NativeError};
///
/// let bridge = ExceptionBridge::new();
/// let err = NativeError::runtime("B").caused_by(NativeError::invalid_argument("A"));
///
/// let managed = bridge.build_exception_chain(&err);
/// assert_eq!(managed.message(), "B");
/// assert_eq!(managed.kind(), ExceptionKind::Runtime);
///
/// let cause = managed.cause().unwrap();
/// assert_eq!(cause.message(), "A");
/// assert_eq!(cause.kind(), ExceptionKind::InvalidArgument);
/// assert!(cause.cause().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ExceptionBridge<F = DirectFactory> {
    config: BridgeConfig,
    factory: F,
}

impl Default for ExceptionBridge<DirectFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionBridge<DirectFactory> {
    /// Create a bridge with default settings and the in-process factory.
    pub fn new() -> Self {
        Self::with_factory(BridgeConfig::default(), DirectFactory)
    }

    /// Create a bridge with custom settings and the in-process factory.
    pub fn with_config(config: BridgeConfig) -> Self {
        Self::with_factory(config, DirectFactory)
    }
}

impl<F: ThrowableFactory> ExceptionBridge<F> {
    /// Create a bridge that constructs exceptions through `factory`.
    pub fn with_factory(config: BridgeConfig, factory: F) -> Self {
        Self { config, factory }
    }

    /// The bridge's configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The factory exceptions are constructed through.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Classify a native failure's outermost level.
    pub fn classify(&self, err: &NativeError) -> ExceptionKind {
        err.classify()
    }

    /// Build the managed exception chain for a native failure.
    ///
    /// The result corresponds to the outermost native level; its causes
    /// follow the native nesting level by level. Levels are constructed
    /// innermost first so each one can be attached to the next.
    ///
    /// A failure to construct an exception yields a `Generic` exception
    /// with the unknown message. A pending failure raised while attaching
    /// a cause is reported and returned in place of the chain.
    pub fn build_exception_chain(&self, err: &NativeError) -> ManagedException {
        let limit = self.config.max_cause_depth.max(1);
        let mut levels: Vec<&NativeError> = err.chain().collect();
        if levels.len() > limit {
            log::warn!(
                "cause chain of '{}' is deeper than {}; middle causes dropped",
                err.message(),
                limit
            );
            // The innermost level is the originating failure and always survives
            let innermost = levels.split_off(limit - 1).pop();
            levels.extend(innermost);
        }

        let mut built: Option<ManagedException> = None;
        for level in levels.into_iter().rev() {
            let kind = level.classify();
            let message = self.config.normalize_message(Some(level.message()));

            let mut exception = match self.factory.construct(kind, &message) {
                Ok(exception) => exception,
                Err(pending) => {
                    report_pending(&pending);
                    return self.fallback();
                }
            };

            if let Some(cause) = built.take() {
                if let Err(pending) = self.factory.attach_cause(&mut exception, cause) {
                    report_pending(&pending);
                    return pending;
                }
            }
            built = Some(exception);
        }

        built.unwrap_or_else(|| self.fallback())
    }

    /// The exception used when nothing better can be built.
    pub fn fallback(&self) -> ManagedException {
        ManagedException::new(ExceptionKind::Generic, self.config.unknown_message.clone())
    }

    /// Turn a failure raised by managed code into a native failure.
    ///
    /// The message is the managed exception's rendering, cut to the message
    /// buffer; a missing exception yields the unknown message.
    pub fn native_from_managed(&self, exception: Option<&ManagedException>) -> NativeError {
        let rendered = exception.map(|e| e.to_string());
        NativeError::new(
            NativeErrorKind::Runtime,
            self.config.normalize_message(rendered.as_deref()),
        )
    }
}

/// Describe and clear a pending managed failure.
pub(crate) fn report_pending(pending: &ManagedException) {
    log::warn!("pending managed exception: {}", pending.render_chain());
}
