//! Native failure to managed exception translation
//!
//! Native failures are tagged with a [`NativeErrorKind`] where they
//! originate and may nest a cause. At the boundary, [`classify`] maps each
//! level to one of four managed [`ExceptionKind`]s and the
//! [`ExceptionBridge`] rebuilds the nesting as a chain of
//! [`ManagedException`]s, outermost first.

mod bridge;
mod managed;
mod native;

pub(crate) use bridge::report_pending;
pub use bridge::{DirectFactory, ExceptionBridge, ThrowableFactory};
pub use managed::{Causes, ManagedException};
pub use native::{Chain, NativeError, NativeErrorKind};

use std::fmt;

/// Managed exception kinds a native failure can surface as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Bad input value or precondition
    InvalidArgument,

    /// Index or bounds violation
    OutOfRange,

    /// Operational failure with no more specific kind
    Runtime,

    /// Fallback for everything else
    Generic,
}

impl ExceptionKind {
    /// Classification order; the first kind a failure satisfies wins.
    pub const PRIORITY: [ExceptionKind; 3] = [
        ExceptionKind::InvalidArgument,
        ExceptionKind::OutOfRange,
        ExceptionKind::Runtime,
    ];

    /// Fully qualified managed class for this kind.
    pub fn class_name(&self) -> &'static str {
        match self {
            ExceptionKind::InvalidArgument => "java.lang.IllegalArgumentException",
            ExceptionKind::OutOfRange => "java.lang.IndexOutOfBoundsException",
            ExceptionKind::Runtime => "java.lang.RuntimeException",
            ExceptionKind::Generic => "java.lang.Exception",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Map a native failure kind to a managed exception kind.
///
/// Checks `InvalidArgument`, then `OutOfRange`, then `Runtime`; anything
/// satisfying none of them is `Generic`.
pub fn classify(kind: &NativeErrorKind) -> ExceptionKind {
    ExceptionKind::PRIORITY
        .into_iter()
        .find(|candidate| kind.is_a(*candidate))
        .unwrap_or(ExceptionKind::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_direct_kinds() {
        assert_eq!(
            classify(&NativeErrorKind::InvalidArgument),
            ExceptionKind::InvalidArgument
        );
        assert_eq!(classify(&NativeErrorKind::OutOfRange), ExceptionKind::OutOfRange);
        assert_eq!(classify(&NativeErrorKind::Runtime), ExceptionKind::Runtime);
        assert_eq!(classify(&NativeErrorKind::Unknown), ExceptionKind::Generic);
    }

    #[test]
    fn test_classify_runtime_family() {
        for kind in [
            NativeErrorKind::Range,
            NativeErrorKind::Overflow,
            NativeErrorKind::Underflow,
            NativeErrorKind::System,
        ] {
            assert_eq!(classify(&kind), ExceptionKind::Runtime);
        }
    }

    #[test]
    fn test_classify_logic_family_is_generic() {
        for kind in [
            NativeErrorKind::Logic,
            NativeErrorKind::Domain,
            NativeErrorKind::Length,
            NativeErrorKind::Allocation,
        ] {
            assert_eq!(classify(&kind), ExceptionKind::Generic);
        }
    }

    #[test]
    fn test_classify_priority_for_multiple_bases() {
        let both = NativeErrorKind::custom(
            "bad_index",
            vec![NativeErrorKind::OutOfRange, NativeErrorKind::InvalidArgument],
        );
        assert_eq!(classify(&both), ExceptionKind::InvalidArgument);

        let range_and_runtime = NativeErrorKind::custom(
            "checked_range",
            vec![NativeErrorKind::Overflow, NativeErrorKind::OutOfRange],
        );
        assert_eq!(classify(&range_and_runtime), ExceptionKind::OutOfRange);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(
            ExceptionKind::OutOfRange.to_string(),
            "java.lang.IndexOutOfBoundsException"
        );
        assert_eq!(ExceptionKind::Generic.class_name(), "java.lang.Exception");
    }
}
