//! Class loaders and class handles

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::exception::{ExceptionKind, ManagedException};

/// Managed class raised for names a loader cannot resolve.
pub const CLASS_NOT_FOUND: &str = "java.lang.ClassNotFoundException";

/// A resolved managed class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHandle {
    name: Arc<str>,
    loader: Arc<str>,
}

impl ClassHandle {
    /// Create a handle for `name` defined by `loader`.
    pub fn new(name: &str, loader: &str) -> Self {
        Self {
            name: Arc::from(name),
            loader: Arc::from(loader),
        }
    }

    /// Fully qualified class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the loader that defined the class.
    pub fn loader(&self) -> &str {
        &self.loader
    }
}

impl fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)
    }
}

/// An authority that turns class names into class handles.
///
/// Loading re-enters the managed runtime, so a failure comes back as a
/// managed exception rather than a native one.
pub trait ClassLoader: Send + Sync {
    /// Loader name, for diagnostics.
    fn name(&self) -> &str;

    /// Resolve `class_name` to a class handle.
    fn load_class(&self, class_name: &str) -> Result<ClassHandle, ManagedException>;
}

impl fmt::Debug for dyn ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassLoader({})", self.name())
    }
}

/// A class loader backed by a table of known class names.
///
/// Delegates to its parent first, as managed loaders do, and keeps classes
/// in definition order.
///
/// # Example
///
/// ```
/// use bridgework::{ClassLoader, MapClassLoader};
///
/// let loader = MapClassLoader::new("app").with_class("com.example.Widget");
/// assert_eq!(loader.load_class("com.example.Widget").unwrap().loader(), "app");
/// assert!(loader.load_class("com.example.Missing").is_err());
/// ```
pub struct MapClassLoader {
    name: String,
    classes: IndexMap<String, ClassHandle>,
    parent: Option<Arc<dyn ClassLoader>>,
}

impl MapClassLoader {
    /// Create an empty loader.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: IndexMap::new(),
            parent: None,
        }
    }

    /// Set the loader consulted before this one.
    pub fn with_parent(mut self, parent: Arc<dyn ClassLoader>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Define a class.
    pub fn with_class(mut self, class_name: &str) -> Self {
        self.define(class_name);
        self
    }

    /// Define a class, returning its handle.
    pub fn define(&mut self, class_name: &str) -> ClassHandle {
        let handle = ClassHandle::new(class_name, &self.name);
        self.classes
            .entry(class_name.to_string())
            .or_insert(handle)
            .clone()
    }

    /// Names defined by this loader, in definition order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl ClassLoader for MapClassLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_class(&self, class_name: &str) -> Result<ClassHandle, ManagedException> {
        if let Some(parent) = &self.parent {
            if let Ok(handle) = parent.load_class(class_name) {
                return Ok(handle);
            }
        }
        self.classes.get(class_name).cloned().ok_or_else(|| {
            ManagedException::with_class(ExceptionKind::Generic, CLASS_NOT_FOUND, class_name)
        })
    }
}

impl fmt::Debug for MapClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapClassLoader")
            .field("name", &self.name)
            .field("classes", &self.classes.len())
            .field("parent", &self.parent.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}
