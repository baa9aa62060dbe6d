//! Running managed callbacks from a native worker thread
//!
//! [`Dispatcher::run_on_worker`] hands a callback to one freshly spawned
//! worker, which attaches itself, installs the class-resolution context
//! and then invokes the callback with `1..=count` in order. The caller
//! blocks until the worker is joined; the join is also where any worker
//! failure is surfaced.

mod attach;

pub use attach::{is_attached, is_daemon, ThreadAttachment};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::config::{BridgeConfig, CancelToken};
use crate::error::{panic_message, BridgeError, Result};
use crate::exception::NativeError;
use crate::resolution::{global_context, ResolutionContext};

/// Something that receives an integer and performs a side effect.
///
/// Returning an error stops the dispatch after the current iteration.
pub trait Callback {
    /// Handle one value.
    fn callback(&mut self, value: i32) -> std::result::Result<(), NativeError>;
}

impl<F> Callback for F
where
    F: FnMut(i32) -> std::result::Result<(), NativeError>,
{
    fn callback(&mut self, value: i32) -> std::result::Result<(), NativeError> {
        self(value)
    }
}

/// A callback that cannot fail.
pub struct Infallible<F>(F);

impl<F: FnMut(i32)> Callback for Infallible<F> {
    fn callback(&mut self, value: i32) -> std::result::Result<(), NativeError> {
        (self.0)(value);
        Ok(())
    }
}

/// Adapt a plain closure into a [`Callback`].
pub fn infallible<F: FnMut(i32)>(f: F) -> Infallible<F> {
    Infallible(f)
}

/// What happened on the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// The worker thread's id
    pub thread: ThreadId,

    /// The worker thread's name
    pub thread_name: Option<String>,

    /// Number of completed callback invocations
    pub invocations: usize,

    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,

    /// Whether the worker was attached as a daemon thread
    pub daemon: bool,

    /// Whether the worker had to install the class-resolution context
    pub context_installed: bool,
}

/// Runs callbacks on a dedicated native worker thread.
pub struct Dispatcher<'c> {
    config: BridgeConfig,
    context: &'c ResolutionContext,
    attached: Arc<AtomicUsize>,
}

impl Dispatcher<'static> {
    /// Create a dispatcher using the process-wide resolution context.
    pub fn with_global_context(config: BridgeConfig) -> Self {
        Self::new(config, global_context())
    }
}

impl<'c> Dispatcher<'c> {
    /// Create a dispatcher whose workers install `context`.
    pub fn new(config: BridgeConfig, context: &'c ResolutionContext) -> Self {
        Self {
            config,
            context,
            attached: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The dispatcher's cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.config.cancel
    }

    /// Number of worker threads currently attached.
    pub fn attached_threads(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    /// Invoke `callback(i)` for `i` in `1..=count` on one worker thread.
    ///
    /// Blocks until the worker has finished and been joined, whatever the
    /// outcome. A cancellation request is honoured between iterations and
    /// reported through [`DispatchReport::cancelled`].
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unconfigured`] if the resolution context is unset
    ///   and at least one callback would fire
    /// - [`BridgeError::Callback`] with the first callback failure
    /// - [`BridgeError::WorkerPanicked`] if the worker panicked
    /// - [`BridgeError::ThreadSpawn`] if no worker could be started
    pub fn run_on_worker<C>(&self, callback: &mut C, count: i32) -> Result<DispatchReport>
    where
        C: Callback + Send + ?Sized,
    {
        let context = self.context;
        let cancel = &self.config.cancel;
        let daemon = self.config.worker_daemon;
        let attached = &self.attached;

        thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name(self.config.worker_name.clone())
                .spawn_scoped(scope, move || {
                    work(callback, count, context, cancel, daemon, attached)
                })?;

            match worker.join() {
                Ok(result) => result,
                Err(payload) => Err(BridgeError::WorkerPanicked(
                    panic_message(payload.as_ref())
                        .unwrap_or_else(|| self.config.unknown_message.clone()),
                )),
            }
        })
    }
}

fn work<C>(
    callback: &mut C,
    count: i32,
    context: &ResolutionContext,
    cancel: &CancelToken,
    daemon: bool,
    attached: &Arc<AtomicUsize>,
) -> Result<DispatchReport>
where
    C: Callback + ?Sized,
{
    let _attachment = ThreadAttachment::attach(daemon, attached);
    let current = thread::current();
    let mut report = DispatchReport {
        thread: current.id(),
        thread_name: current.name().map(str::to_string),
        invocations: 0,
        cancelled: false,
        daemon,
        context_installed: false,
    };

    if count <= 0 {
        return Ok(report);
    }
    report.context_installed = context.ensure_thread_context()?;

    log::debug!("worker {:?} dispatching {} callbacks", report.thread, count);
    for value in 1..=count {
        if cancel.is_cancelled() {
            log::debug!("worker {:?} cancelled before callback {}", report.thread, value);
            report.cancelled = true;
            break;
        }
        if let Err(err) = callback.callback(value) {
            log::debug!("callback {} failed on worker {:?}: {}", value, report.thread, err);
            return Err(BridgeError::Callback(err));
        }
        report.invocations += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::MapClassLoader;

    fn configured() -> ResolutionContext {
        let ctx = ResolutionContext::new();
        ctx.set_context(Arc::new(MapClassLoader::new("app")));
        ctx
    }

    #[test]
    fn test_values_in_order() {
        let ctx = configured();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let mut seen = Vec::new();
        let report = dispatcher
            .run_on_worker(&mut infallible(|v| seen.push(v)), 5)
            .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.invocations, 5);
        assert!(!report.cancelled);
        assert!(report.context_installed);
        assert_ne!(report.thread, thread::current().id());
    }

    #[test]
    fn test_zero_count_skips_context_check() {
        let ctx = ResolutionContext::new();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let report = dispatcher
            .run_on_worker(&mut infallible(|_| panic!("no callbacks expected")), 0)
            .unwrap();
        assert_eq!(report.invocations, 0);
    }

    #[test]
    fn test_unconfigured_context_fails_before_callbacks() {
        let ctx = ResolutionContext::new();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let mut calls = 0;
        let result = dispatcher.run_on_worker(&mut infallible(|_| calls += 1), 3);
        assert!(matches!(result, Err(BridgeError::Unconfigured)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_callback_error_stops_early() {
        let ctx = configured();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let mut seen = Vec::new();
        let mut callback = |v: i32| {
            seen.push(v);
            if v == 2 {
                Err(NativeError::runtime("stop at 2"))
            } else {
                Ok(())
            }
        };
        let result = dispatcher.run_on_worker(&mut callback, 5);
        match result {
            Err(BridgeError::Callback(err)) => assert_eq!(err.message(), "stop at 2"),
            other => panic!("expected callback error, got {:?}", other),
        }
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(dispatcher.attached_threads(), 0);
    }

    #[test]
    fn test_cancellation_between_iterations() {
        let ctx = configured();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let cancel = dispatcher.cancel_token().clone();
        let mut seen = Vec::new();
        let report = dispatcher
            .run_on_worker(
                &mut infallible(|v| {
                    seen.push(v);
                    if v == 3 {
                        cancel.cancel();
                    }
                }),
                10,
            )
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.invocations, 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_worker_panic_is_surfaced() {
        let ctx = configured();
        let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
        let result = dispatcher.run_on_worker(&mut infallible(|_| panic!("worker blew up")), 1);
        match result {
            Err(BridgeError::WorkerPanicked(msg)) => assert_eq!(msg, "worker blew up"),
            other => panic!("expected panic error, got {:?}", other),
        }
        assert_eq!(dispatcher.attached_threads(), 0);
    }

    #[test]
    fn test_worker_is_named() {
        let ctx = configured();
        let dispatcher = Dispatcher::new(BridgeConfig::new().with_worker_name("cb-worker"), &ctx);
        let report = dispatcher.run_on_worker(&mut infallible(|_| {}), 1).unwrap();
        assert_eq!(report.thread_name.as_deref(), Some("cb-worker"));
    }
}
