//! Bridge configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Message used when a failure carries no usable text.
pub const UNKNOWN_EXCEPTION: &str = "Unknown exception.";

/// Size of the native message buffer, terminator included.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1024;

/// Cooperative cancellation flag shared between a caller and a worker.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Reset the flag so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

/// Configuration shared by the boundary components.
///
/// Passed to the exception bridge, the dispatcher and the boundary
/// composer; each reads only the fields it needs.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Size of the message buffer, terminator included
    pub max_message_len: usize,

    /// Text used for empty messages and non-string panics
    pub unknown_message: String,

    /// Deepest cause chain that is translated; unbounded by default
    pub max_cause_depth: usize,

    /// Name given to dispatcher worker threads
    pub worker_name: String,

    /// Whether worker threads attach to the managed runtime as daemons
    pub worker_daemon: bool,

    /// Cancellation flag checked between callback iterations
    pub cancel: CancelToken,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            unknown_message: UNKNOWN_EXCEPTION.to_string(),
            max_cause_depth: usize::MAX,
            worker_name: "bridgework-worker".to_string(),
            worker_daemon: true,
            cancel: CancelToken::new(),
        }
    }
}

impl BridgeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom message buffer size.
    pub fn with_max_message_len(mut self, len: usize) -> Self {
        self.max_message_len = len;
        self
    }

    /// Cap the translated cause chain.
    ///
    /// Longer chains keep their outer levels and the innermost one.
    pub fn with_max_cause_depth(mut self, depth: usize) -> Self {
        self.max_cause_depth = depth;
        self
    }

    /// Use a custom worker thread name.
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Share an existing cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Normalize a native message the way the message buffer would.
    ///
    /// Empty or absent messages become [`BridgeConfig::unknown_message`];
    /// longer ones are cut to `max_message_len - 1` bytes on a char boundary.
    /// A cut that leaves nothing also yields the unknown message.
    pub fn normalize_message(&self, msg: Option<&str>) -> String {
        let msg = match msg {
            Some(m) if !m.is_empty() => m,
            _ => return self.unknown_message.clone(),
        };
        let limit = self.max_message_len.saturating_sub(1);
        if msg.len() <= limit {
            return msg.to_string();
        }
        let mut end = limit;
        while !msg.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            return self.unknown_message.clone();
        }
        msg[..end].to_string()
    }
}
