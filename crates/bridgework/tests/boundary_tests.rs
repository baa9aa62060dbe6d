//! Boundary composer tests

use std::cell::Cell;
use std::sync::Arc;

use bridgework::exception::DirectFactory;
use bridgework::*;
use pretty_assertions::assert_eq;

/// Factory that counts constructions and delegates the rest.
#[derive(Default)]
struct CountingFactory {
    constructed: Cell<usize>,
}

impl ThrowableFactory for CountingFactory {
    fn construct(
        &self,
        kind: ExceptionKind,
        message: &str,
    ) -> std::result::Result<ManagedException, ManagedException> {
        self.constructed.set(self.constructed.get() + 1);
        DirectFactory.construct(kind, message)
    }

    fn attach_cause(
        &self,
        exception: &mut ManagedException,
        cause: ManagedException,
    ) -> std::result::Result<(), ManagedException> {
        DirectFactory.attach_cause(exception, cause)
    }
}

fn context() -> ResolutionContext {
    let ctx = ResolutionContext::new();
    ctx.set_context(Arc::new(MapClassLoader::new("app").with_class("app.Point")));
    ctx
}

// ═══════════════════════════════════════════════════════════════════════
// Failure Translation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_chain_built_once_at_boundary() {
    let ctx = context();
    let bridge = ExceptionBridge::with_factory(BridgeConfig::new(), CountingFactory::default());
    let boundary = Boundary::with_bridge(bridge, &ctx);

    let err = boundary
        .call(|| -> std::result::Result<(), NativeError> {
            Err(NativeError::runtime("wrapper").caused_by(NativeError::out_of_range("index")))
        })
        .unwrap_err();

    assert_eq!(boundary.bridge().factory().constructed.get(), 2);
    assert_eq!(err.kind(), ExceptionKind::Runtime);
    assert_eq!(err.cause().unwrap().kind(), ExceptionKind::OutOfRange);
}

#[test]
fn test_no_exception_on_success() {
    let ctx = context();
    let bridge = ExceptionBridge::with_factory(BridgeConfig::new(), CountingFactory::default());
    let boundary = Boundary::with_bridge(bridge, &ctx);

    let value = boundary.call(|| Ok::<_, NativeError>(3 + 4)).unwrap();
    assert_eq!(value, 7);
    assert_eq!(boundary.bridge().factory().constructed.get(), 0);
}

#[test]
fn test_panic_becomes_generic() {
    let ctx = context();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);
    let err = boundary
        .call(|| -> std::result::Result<u8, NativeError> { panic!("{} went wrong", "it") })
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Generic);
    assert_eq!(err.message(), "it went wrong");
    assert_eq!(err.class_name(), "java.lang.Exception");
}

#[test]
fn test_bridge_errors_classified() {
    let ctx = context();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);

    let err = boundary
        .call_bridge(|| EnumValue::new(EnumWidth::I8, 1000))
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::OutOfRange);

    let err = boundary
        .call_bridge(|| Exclusive::<u8>::empty().get().map(|v| *v))
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Runtime);
}

// ═══════════════════════════════════════════════════════════════════════
// Class Resolution
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_classes_resolved_before_call() {
    let ctx = context();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);

    let names = boundary
        .call_with_classes(&["app.Point", "app.Missing"], |classes| {
            Ok::<_, NativeError>(
                classes
                    .iter()
                    .map(|c| c.as_ref().map(|h| h.name().to_string()))
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap();

    assert_eq!(names, vec![Some("app.Point".to_string()), None]);
}

#[test]
fn test_unset_context_resolves_to_none() {
    let ctx = ResolutionContext::new();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);
    let resolved = boundary
        .call_with_classes(&["app.Point"], |classes| Ok::<_, NativeError>(classes[0].is_some()))
        .unwrap();
    assert!(!resolved);
}

// ═══════════════════════════════════════════════════════════════════════
// Callbacks Through the Boundary
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_callback_failure_surfaces_as_managed_exception() {
    let ctx = context();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);
    let mut callback = |value: i32| {
        if value == 3 {
            Err(NativeError::out_of_range("three"))
        } else {
            Ok(())
        }
    };

    let err = boundary.run_on_worker(&mut callback, 5).unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::OutOfRange);
    assert_eq!(err.message(), "three");
}

#[test]
fn test_unconfigured_worker_surfaces_as_runtime() {
    let ctx = ResolutionContext::new();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);
    let err = boundary
        .run_on_worker(&mut infallible(|_| {}), 1)
        .unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Runtime);
}

#[test]
fn test_managed_failure_inside_callback() {
    let ctx = context();
    let boundary = Boundary::new(BridgeConfig::new(), &ctx);
    let bridge = ExceptionBridge::new();
    let mut callback = |_value: i32| -> std::result::Result<(), NativeError> {
        let managed = ManagedException::new(ExceptionKind::InvalidArgument, "rejected");
        Err(bridge.native_from_managed(Some(&managed)))
    };

    let err = boundary.run_on_worker(&mut callback, 1).unwrap_err();
    assert_eq!(err.kind(), ExceptionKind::Runtime);
    assert_eq!(err.message(), "java.lang.IllegalArgumentException: rejected");
}
