//! Scoped release of attached handles
//!
//! A [`Scope`] owns every handle attached to it and releases them, last
//! attached first, when it is dropped. Scopes nest per thread: opening one
//! pushes it on the thread's scope stack and dropping it removes it, so
//! [`Scope::attach_exclusive_to_innermost`] and its shared twin always
//! reach the most recently opened scope that is still alive.

use std::any::{type_name, Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Exclusive, Shared};
use crate::error::{BridgeError, Result};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Rc<ScopeState>>> = const { RefCell::new(Vec::new()) };
}

struct Entry {
    id: u64,
    type_name: &'static str,
    handle: Box<dyn Any>,
}

struct ScopeState {
    id: u64,
    entries: RefCell<Vec<Entry>>,
    next_entry: Cell<u64>,
    extend: Cell<bool>,
    allowed: RefCell<Vec<(TypeId, &'static str)>>,
}

impl ScopeState {
    fn check_allowed<T: 'static>(&self) -> Result<()> {
        let allowed = self.allowed.borrow();
        if allowed.is_empty() || allowed.iter().any(|(id, _)| *id == TypeId::of::<T>()) {
            Ok(())
        } else {
            Err(BridgeError::ScopeRejected {
                type_name: type_name::<T>(),
                allowed: allowed.iter().map(|(_, name)| *name).collect(),
            })
        }
    }

    fn attach_exclusive<T: 'static>(
        &self,
        handle: &mut Exclusive<T>,
    ) -> Result<ScopeKey<Exclusive<T>>> {
        if handle.is_empty() {
            return Err(BridgeError::invalid_state("attach of an empty exclusive handle"));
        }
        self.check_allowed::<T>()?;
        Ok(self.push(handle.take()))
    }

    fn attach_shared<T: 'static>(&self, handle: &Shared<T>) -> Result<ScopeKey<Shared<T>>> {
        if handle.is_empty() {
            return Err(BridgeError::invalid_state("attach of an empty shared handle"));
        }
        self.check_allowed::<T>()?;
        Ok(self.push(handle.clone()))
    }

    fn push<H: 'static>(&self, handle: H) -> ScopeKey<H> {
        let id = self.next_entry.get();
        self.next_entry.set(id + 1);
        let type_name = type_name::<H>();
        log::debug!("attaching {} to scope {}", type_name, self.id);
        self.entries.borrow_mut().push(Entry {
            id,
            type_name,
            handle: Box::new(handle),
        });
        ScopeKey {
            scope: self.id,
            entry: id,
            _handle: PhantomData,
        }
    }

    /// Drop every entry, newest first.
    ///
    /// Each entry is popped before it is dropped so a destructor may touch
    /// this scope again.
    fn release_all(&self) {
        loop {
            let next = self.entries.borrow_mut().pop();
            match next {
                Some(entry) => {
                    log::trace!("releasing {} from scope {}", entry.type_name, self.id);
                    drop(entry);
                }
                None => break,
            }
        }
    }
}

/// Identifies a handle attached to a [`Scope`], for [`Scope::detach`].
pub struct ScopeKey<H> {
    scope: u64,
    entry: u64,
    _handle: PhantomData<fn() -> H>,
}

impl<H> fmt::Debug for ScopeKey<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeKey")
            .field("scope", &self.scope)
            .field("entry", &self.entry)
            .finish()
    }
}

/// A per-thread owner of attached handles.
///
/// Attaching an [`Exclusive`] moves its value into the scope and clears the
/// caller's handle. Attaching a [`Shared`] retains one more reference, which
/// the scope gives up when it closes. Dropping the scope releases whatever
/// is still attached, last attached first, unless it was [extended].
///
/// # Example
///
/// ```
/// use bridgework::ownership::{Exclusive, Scope, Shared};
///
/// let shared = Shared::new(String::from("kept"));
/// {
///     let scope = Scope::new();
///     let mut owned = Exclusive::new(5);
///     scope.attach_exclusive(&mut owned).unwrap();
///     scope.attach_shared(&shared).unwrap();
///     assert!(owned.is_empty());
///     assert_eq!(shared.strong_count(), 2);
/// }
/// assert_eq!(shared.strong_count(), 1);
/// ```
///
/// [extended]: Scope::extend
pub struct Scope {
    state: Rc<ScopeState>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Open a scope and make it this thread's innermost one.
    pub fn new() -> Self {
        let state = Rc::new(ScopeState {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            entries: RefCell::new(Vec::new()),
            next_entry: Cell::new(0),
            extend: Cell::new(false),
            allowed: RefCell::new(Vec::new()),
        });
        log::debug!("opening scope {}", state.id);
        SCOPE_STACK.with(|stack| stack.borrow_mut().push(Rc::clone(&state)));
        Self { state }
    }

    /// Restrict the scope to values of type `T` and any other allowed type.
    ///
    /// A scope with no allowed types accepts everything.
    pub fn allow<T: 'static>(self) -> Self {
        self.state
            .allowed
            .borrow_mut()
            .push((TypeId::of::<T>(), type_name::<T>()));
        self
    }

    /// Number of scopes open on the calling thread.
    pub fn open_scopes() -> usize {
        SCOPE_STACK.with(|stack| stack.borrow().len())
    }

    /// Number of handles currently attached.
    pub fn len(&self) -> usize {
        self.state.entries.borrow().len()
    }

    /// Check whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move an exclusive value into the scope, clearing `handle`.
    ///
    /// Fails with [`BridgeError::InvalidState`] on an empty handle and with
    /// [`BridgeError::ScopeRejected`] when the value type is not allowed.
    pub fn attach_exclusive<T: 'static>(
        &self,
        handle: &mut Exclusive<T>,
    ) -> Result<ScopeKey<Exclusive<T>>> {
        self.state.attach_exclusive(handle)
    }

    /// Retain a reference to a shared value until the scope closes.
    ///
    /// The caller keeps its own handle.
    pub fn attach_shared<T: 'static>(&self, handle: &Shared<T>) -> Result<ScopeKey<Shared<T>>> {
        self.state.attach_shared(handle)
    }

    /// Hand an attached handle back to the caller.
    ///
    /// The scope no longer releases it. A key from another scope, or one
    /// whose handle was already released, is an [`BridgeError::InvalidState`].
    pub fn detach<H: 'static>(&self, key: ScopeKey<H>) -> Result<H> {
        if key.scope != self.state.id {
            return Err(BridgeError::invalid_state(format!(
                "key of scope {} used with scope {}",
                key.scope, self.state.id
            )));
        }
        let entry = {
            let mut entries = self.state.entries.borrow_mut();
            let position = entries
                .iter()
                .position(|e| e.id == key.entry)
                .ok_or_else(|| BridgeError::invalid_state("handle is no longer attached"))?;
            entries.remove(position)
        };
        log::debug!("detaching {} from scope {}", entry.type_name, self.state.id);
        entry
            .handle
            .downcast::<H>()
            .map(|handle| *handle)
            .map_err(|_| BridgeError::invalid_state("scope key does not match the attached handle"))
    }

    /// Keep the attached handles alive past this scope.
    ///
    /// When an extended scope closes its handles move to the enclosing scope
    /// on this thread. With no enclosing scope they are released as usual.
    pub fn extend(&self) -> &Self {
        log::debug!("extending scope {}", self.state.id);
        self.state.extend.set(true);
        self
    }

    /// Release every attached handle now, newest first.
    ///
    /// The scope stays open and can take new attachments.
    pub fn release_all(&self) {
        self.state.release_all();
    }

    /// Attach to this thread's innermost scope, if one is open.
    ///
    /// Returns `Ok(None)` and leaves `handle` untouched when no scope is
    /// open.
    pub fn attach_exclusive_to_innermost<T: 'static>(
        handle: &mut Exclusive<T>,
    ) -> Result<Option<ScopeKey<Exclusive<T>>>> {
        innermost()
            .map(|state| state.attach_exclusive(handle))
            .transpose()
    }

    /// Retain a shared reference in this thread's innermost scope, if one
    /// is open.
    pub fn attach_shared_to_innermost<T: 'static>(
        handle: &Shared<T>,
    ) -> Result<Option<ScopeKey<Shared<T>>>> {
        innermost().map(|state| state.attach_shared(handle)).transpose()
    }
}

fn innermost() -> Option<Rc<ScopeState>> {
    SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
}

impl Drop for Scope {
    fn drop(&mut self) {
        log::debug!("closing scope {}", self.state.id);
        let enclosing = SCOPE_STACK
            .try_with(|stack| {
                let mut stack = stack.borrow_mut();
                let position = stack.iter().rposition(|s| Rc::ptr_eq(s, &self.state))?;
                stack.remove(position);
                position.checked_sub(1).and_then(|below| stack.get(below).cloned())
            })
            .ok()
            .flatten();

        if self.state.extend.get() {
            if let Some(outer) = enclosing {
                let moved: Vec<Entry> = self.state.entries.borrow_mut().drain(..).collect();
                let mut outer_entries = outer.entries.borrow_mut();
                for mut entry in moved {
                    entry.id = outer.next_entry.get();
                    outer.next_entry.set(entry.id + 1);
                    outer_entries.push(entry);
                }
                return;
            }
        }
        self.state.release_all();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.state.id)
            .field("attached", &self.len())
            .field("extend", &self.state.extend.get())
            .finish()
    }
}
