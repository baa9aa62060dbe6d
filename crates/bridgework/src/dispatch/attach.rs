//! RAII attachment of native threads to the managed runtime

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

thread_local! {
    /// `Some(daemon)` while the thread is attached.
    static ATTACHMENT: Cell<Option<bool>> = const { Cell::new(None) };
}

/// Guard that keeps the current thread attached until dropped.
///
/// A thread that was already attached when the guard was created stays
/// attached afterwards; only the guard that attached it detaches it.
pub struct ThreadAttachment {
    owner: bool,
    attached: Arc<AtomicUsize>,
}

impl ThreadAttachment {
    /// Attach the calling thread, counting it in `attached`.
    pub fn attach(daemon: bool, attached: &Arc<AtomicUsize>) -> Self {
        let owner = ATTACHMENT.with(|a| {
            if a.get().is_some() {
                false
            } else {
                a.set(Some(daemon));
                true
            }
        });
        if owner {
            attached.fetch_add(1, Ordering::SeqCst);
            log::trace!(
                "attached {:?} (daemon: {})",
                std::thread::current().id(),
                daemon
            );
        }
        Self {
            owner,
            attached: Arc::clone(attached),
        }
    }

    /// Whether this guard performed the attach.
    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for ThreadAttachment {
    fn drop(&mut self) {
        if self.owner {
            ATTACHMENT.with(|a| a.set(None));
            self.attached.fetch_sub(1, Ordering::SeqCst);
            log::trace!("detached {:?}", std::thread::current().id());
        }
    }
}

/// Whether the calling thread is attached to the managed runtime.
pub fn is_attached() -> bool {
    ATTACHMENT.with(|a| a.get().is_some())
}

/// Whether the calling thread is attached as a daemon thread.
pub fn is_daemon() -> bool {
    ATTACHMENT.with(|a| a.get().unwrap_or(false))
}
