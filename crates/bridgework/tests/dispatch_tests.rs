//! Callback dispatcher tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use bridgework::dispatch::{is_attached, is_daemon};
use bridgework::resolution::thread_context;
use bridgework::*;
use pretty_assertions::assert_eq;

fn configured() -> ResolutionContext {
    let ctx = ResolutionContext::new();
    ctx.set_context(Arc::new(MapClassLoader::new("app").with_class("app.Callback")));
    ctx
}

/// Records what each invocation saw on the worker thread.
#[derive(Default)]
struct Recorder {
    values: Vec<i32>,
    threads: Vec<thread::ThreadId>,
    resolved: Vec<bool>,
    attached: Vec<(bool, bool)>,
}

impl Callback for Recorder {
    fn callback(&mut self, value: i32) -> std::result::Result<(), NativeError> {
        self.values.push(value);
        self.threads.push(thread::current().id());
        self.resolved.push(
            thread_context()
                .map(|loader| loader.load_class("app.Callback").is_ok())
                .unwrap_or(false),
        );
        self.attached.push((is_attached(), is_daemon()));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Ordering and Threading
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_callbacks_run_in_order_on_one_worker() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let mut recorder = Recorder::default();

    let report = dispatcher.run_on_worker(&mut recorder, 10).unwrap();

    assert_eq!(recorder.values, (1..=10).collect::<Vec<_>>());
    assert_eq!(report.invocations, 10);
    assert!(recorder.threads.iter().all(|t| *t == report.thread));
    assert_ne!(report.thread, thread::current().id());
}

#[test]
fn test_worker_can_resolve_classes() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let mut recorder = Recorder::default();

    let report = dispatcher.run_on_worker(&mut recorder, 3).unwrap();

    assert!(report.context_installed);
    assert_eq!(recorder.resolved, vec![true, true, true]);
}

#[test]
fn test_worker_attached_as_daemon_and_detached_after() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let mut recorder = Recorder::default();

    let report = dispatcher.run_on_worker(&mut recorder, 2).unwrap();

    assert!(report.daemon);
    assert_eq!(recorder.attached, vec![(true, true), (true, true)]);
    assert_eq!(dispatcher.attached_threads(), 0);
    assert!(!is_attached());
}

#[test]
fn test_non_daemon_worker() {
    let ctx = configured();
    let mut config = BridgeConfig::new();
    config.worker_daemon = false;
    let dispatcher = Dispatcher::new(config, &ctx);
    let mut recorder = Recorder::default();

    let report = dispatcher.run_on_worker(&mut recorder, 1).unwrap();

    assert!(!report.daemon);
    assert_eq!(recorder.attached, vec![(true, false)]);
}

#[test]
fn test_zero_and_negative_counts() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let mut recorder = Recorder::default();

    assert_eq!(dispatcher.run_on_worker(&mut recorder, 0).unwrap().invocations, 0);
    assert_eq!(dispatcher.run_on_worker(&mut recorder, -5).unwrap().invocations, 0);
    assert!(recorder.values.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Failure Paths
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unconfigured_context_reports_error() {
    let ctx = ResolutionContext::new();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let mut recorder = Recorder::default();

    let result = dispatcher.run_on_worker(&mut recorder, 4);

    assert!(matches!(result, Err(BridgeError::Unconfigured)));
    assert!(recorder.values.is_empty());
    assert_eq!(dispatcher.attached_threads(), 0);
}

#[test]
fn test_callback_failure_stops_and_joins() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);
    let calls = AtomicUsize::new(0);
    let mut callback = |value: i32| {
        calls.fetch_add(1, Ordering::SeqCst);
        if value == 4 {
            Err(NativeError::invalid_argument("four is not allowed"))
        } else {
            Ok(())
        }
    };

    let err = dispatcher.run_on_worker(&mut callback, 8).unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    let native = NativeError::from(err);
    assert_eq!(native.classify(), ExceptionKind::InvalidArgument);
    assert_eq!(native.message(), "four is not allowed");
}

#[test]
fn test_worker_panic_with_non_string_payload() {
    let ctx = configured();
    let dispatcher = Dispatcher::new(BridgeConfig::new(), &ctx);

    let result = dispatcher.run_on_worker(&mut infallible(|_| std::panic::panic_any(3_i64)), 1);

    match result {
        Err(BridgeError::WorkerPanicked(msg)) => assert_eq!(msg, "Unknown exception."),
        other => panic!("expected WorkerPanicked, got {:?}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_cancel_before_run() {
    let ctx = configured();
    let cancel = CancelToken::new();
    cancel.cancel();
    let dispatcher = Dispatcher::new(BridgeConfig::new().with_cancel(cancel), &ctx);
    let mut recorder = Recorder::default();

    let report = dispatcher.run_on_worker(&mut recorder, 5).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.invocations, 0);
    assert!(recorder.values.is_empty());
}

#[test]
fn test_cancel_from_another_thread() {
    let ctx = configured();
    let cancel = CancelToken::new();
    let dispatcher = Dispatcher::new(BridgeConfig::new().with_cancel(cancel.clone()), &ctx);
    let seen = Mutex::new(Vec::new());
    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (resume_tx, resume_rx) = std::sync::mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let resume_rx = Mutex::new(resume_rx);

    let mut callback = infallible(|value| {
        seen.lock().unwrap().push(value);
        if value == 2 {
            started_tx.lock().unwrap().send(()).unwrap();
            resume_rx.lock().unwrap().recv().unwrap();
        }
    });

    let report = thread::scope(|s| {
        s.spawn(move || {
            started_rx.recv().unwrap();
            cancel.cancel();
            resume_tx.send(()).unwrap();
        });
        dispatcher.run_on_worker(&mut callback, 100).unwrap()
    });

    assert!(report.cancelled);
    assert_eq!(report.invocations, 2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}
