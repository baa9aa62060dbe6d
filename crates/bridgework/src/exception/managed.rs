//! Managed-side exception records

use std::fmt;

use super::ExceptionKind;

/// A managed exception with an optional cause.
///
/// The cause may be set once, mirroring the managed runtime's
/// `initCause` contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedException {
    kind: ExceptionKind,
    class_name: String,
    message: String,
    cause: Option<Box<ManagedException>>,
}

impl ManagedException {
    /// Create an exception of the kind's standard class.
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self::with_class(kind, kind.class_name(), message)
    }

    /// Create an exception of a specific managed class.
    pub fn with_class(
        kind: ExceptionKind,
        class_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// The managed kind.
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    /// Fully qualified managed class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The exception's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The direct cause, if any.
    pub fn cause(&self) -> Option<&ManagedException> {
        self.cause.as_deref()
    }

    /// Attach a cause.
    ///
    /// Fails with an `IllegalStateException` if a cause is already set.
    pub fn init_cause(&mut self, cause: ManagedException) -> Result<(), ManagedException> {
        if self.cause.is_some() {
            return Err(ManagedException::with_class(
                ExceptionKind::Runtime,
                "java.lang.IllegalStateException",
                format!("Can't overwrite cause with {}", cause),
            ));
        }
        self.cause = Some(Box::new(cause));
        Ok(())
    }

    /// Iterate from this exception through its causes.
    pub fn causes(&self) -> Causes<'_> {
        Causes { next: Some(self) }
    }

    /// Number of exceptions in the chain, this one included.
    pub fn depth(&self) -> usize {
        self.causes().count()
    }

    /// Render the whole chain, one `Caused by:` line per cause.
    pub fn render_chain(&self) -> String {
        self.causes()
            .enumerate()
            .map(|(i, e)| {
                if i == 0 {
                    e.to_string()
                } else {
                    format!("Caused by: {}", e)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ManagedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.class_name)
        } else {
            write!(f, "{}: {}", self.class_name, self.message)
        }
    }
}

impl std::error::Error for ManagedException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Iterator over a managed exception and its causes, outermost first.
pub struct Causes<'a> {
    next: Option<&'a ManagedException>,
}

impl<'a> Iterator for Causes<'a> {
    type Item = &'a ManagedException;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_class() {
        let ex = ManagedException::new(ExceptionKind::Runtime, "boom");
        assert_eq!(ex.to_string(), "java.lang.RuntimeException: boom");
    }

    #[test]
    fn test_display_without_message() {
        let ex = ManagedException::new(ExceptionKind::Generic, "");
        assert_eq!(ex.to_string(), "java.lang.Exception");
    }

    #[test]
    fn test_init_cause_once() {
        let mut ex = ManagedException::new(ExceptionKind::Runtime, "outer");
        ex.init_cause(ManagedException::new(ExceptionKind::Runtime, "a"))
            .unwrap();
        let err = ex
            .init_cause(ManagedException::new(ExceptionKind::Runtime, "b"))
            .unwrap_err();
        assert_eq!(err.class_name(), "java.lang.IllegalStateException");
        assert_eq!(ex.cause().map(|c| c.message()), Some("a"));
    }

    #[test]
    fn test_render_chain() {
        let mut ex = ManagedException::new(ExceptionKind::Runtime, "B");
        ex.init_cause(ManagedException::new(ExceptionKind::InvalidArgument, "A"))
            .unwrap();
        assert_eq!(
            ex.render_chain(),
            "java.lang.RuntimeException: B\nCaused by: java.lang.IllegalArgumentException: A"
        );
        assert_eq!(ex.depth(), 2);
    }
}
