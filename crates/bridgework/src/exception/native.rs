//! Native-side failures

use std::fmt;

use super::{classify, ExceptionKind};
use crate::error::BridgeError;

/// Where a native failure sits in the native error hierarchy.
///
/// The tag is chosen where the failure originates, so classification never
/// has to inspect runtime types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeErrorKind {
    /// Argument outside the accepted domain of a function
    InvalidArgument,
    /// Mathematical domain error
    Domain,
    /// Attempt to exceed a maximum size
    Length,
    /// Index or position outside a valid range
    OutOfRange,
    /// Violated logical precondition
    Logic,
    /// Result outside the representable range
    Range,
    /// Arithmetic overflow
    Overflow,
    /// Arithmetic underflow
    Underflow,
    /// Operating system failure
    System,
    /// Operational failure
    Runtime,
    /// Allocation failure
    Allocation,
    /// A failure of unknown type
    Unknown,
    /// A user-defined failure deriving from one or more of the above
    Custom {
        /// Type name, for diagnostics
        name: String,
        /// Kinds this failure derives from
        bases: Vec<NativeErrorKind>,
    },
}

impl NativeErrorKind {
    /// Build a user-defined kind.
    pub fn custom(name: impl Into<String>, bases: Vec<NativeErrorKind>) -> Self {
        NativeErrorKind::Custom {
            name: name.into(),
            bases,
        }
    }

    /// Whether this kind structurally satisfies a managed classification.
    ///
    /// Every kind satisfies `Generic`. A custom kind satisfies whatever any
    /// of its bases satisfies.
    pub fn is_a(&self, kind: ExceptionKind) -> bool {
        use NativeErrorKind::*;
        match (self, kind) {
            (_, ExceptionKind::Generic) => true,
            (Custom { bases, .. }, kind) => bases.iter().any(|b| b.is_a(kind)),
            (InvalidArgument, ExceptionKind::InvalidArgument) => true,
            (OutOfRange, ExceptionKind::OutOfRange) => true,
            (Runtime | Range | Overflow | Underflow | System, ExceptionKind::Runtime) => true,
            _ => false,
        }
    }

    /// Display name of the kind.
    pub fn name(&self) -> &str {
        use NativeErrorKind::*;
        match self {
            InvalidArgument => "invalid_argument",
            Domain => "domain_error",
            Length => "length_error",
            OutOfRange => "out_of_range",
            Logic => "logic_error",
            Range => "range_error",
            Overflow => "overflow_error",
            Underflow => "underflow_error",
            System => "system_error",
            Runtime => "runtime_error",
            Allocation => "bad_alloc",
            Unknown => "unknown",
            Custom { name, .. } => name,
        }
    }
}

/// A native failure with an optional nested cause.
///
/// The outer error wraps the inner one; walking [`NativeError::chain`]
/// goes from the outermost level to the innermost.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeError {
    kind: NativeErrorKind,
    message: String,
    nested: Option<Box<NativeError>>,
}

impl NativeError {
    /// Create a failure with no nested cause.
    pub fn new(kind: NativeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            nested: None,
        }
    }

    /// Shorthand for an `InvalidArgument` failure.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::InvalidArgument, message)
    }

    /// Shorthand for an `OutOfRange` failure.
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::OutOfRange, message)
    }

    /// Shorthand for a `Runtime` failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::Runtime, message)
    }

    /// Wrap `cause` as the nested failure of this one.
    pub fn caused_by(mut self, cause: NativeError) -> Self {
        self.nested = Some(Box::new(cause));
        self
    }

    /// The failure's kind tag.
    pub fn kind(&self) -> &NativeErrorKind {
        &self.kind
    }

    /// The failure's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The directly nested failure, if any.
    pub fn nested(&self) -> Option<&NativeError> {
        self.nested.as_deref()
    }

    /// Managed classification of this level.
    pub fn classify(&self) -> ExceptionKind {
        classify(&self.kind)
    }

    /// Iterate from this failure down to the innermost one.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of levels in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Convert an `anyhow` cause chain into nested native failures.
    ///
    /// Levels that are a [`NativeError`] or [`BridgeError`] keep their
    /// kind; any other level becomes `Runtime`. Only the level's own
    /// message is taken, since its source is the next level of the chain.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let levels: Vec<(NativeErrorKind, String)> = err
            .chain()
            .map(|level| {
                if let Some(native) = level.downcast_ref::<NativeError>() {
                    (native.kind.clone(), native.message.clone())
                } else if let Some(bridge) = level.downcast_ref::<BridgeError>() {
                    (bridge.native_kind(), bridge.to_string())
                } else {
                    (NativeErrorKind::Runtime, level.to_string())
                }
            })
            .collect();

        let mut result: Option<NativeError> = None;
        for (kind, message) in levels.into_iter().rev() {
            let mut level = NativeError::new(kind, message);
            level.nested = result.take().map(Box::new);
            result = Some(level);
        }
        result.unwrap_or_else(|| NativeError::new(NativeErrorKind::Unknown, err.to_string()))
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NativeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.nested
            .as_deref()
            .map(|n| n as &(dyn std::error::Error + 'static))
    }
}

/// Iterator over a native failure chain, outermost first.
pub struct Chain<'a> {
    next: Option<&'a NativeError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a NativeError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.nested();
        Some(current)
    }
}
