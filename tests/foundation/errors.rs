//! Integration tests for error types

use entwine_foundation::{EntityId, Error, ErrorContext, ErrorKind, Type};

#[test]
fn not_found_carries_entity_and_key() {
    let e = EntityId::new(3, 1);
    let err = Error::not_found(e, "component hp");
    assert!(err.is_not_found());
    match &err.kind {
        ErrorKind::NotFound { entity, what } => {
            assert_eq!(*entity, e);
            assert_eq!(what, "component hp");
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert!(err.to_string().contains("component hp"));
}

#[test]
fn cycle_carries_path() {
    let path = vec![EntityId::new(0, 1), EntityId::new(1, 1), EntityId::new(0, 1)];
    let err = Error::cycle_detected(EntityId::new(0, 1), path.clone());
    assert!(matches!(&err.kind, ErrorKind::CycleDetected { path: p, .. } if *p == path));
    assert!(!err.is_not_found());
}

#[test]
fn type_mismatch_message() {
    let msg = Error::type_mismatch(Type::Int, Type::String).to_string();
    assert!(msg.contains("int"));
    assert!(msg.contains("string"));
}

#[test]
fn hook_failure_wraps_source() {
    let err = Error::hook_failed(Error::hook("rejected"));
    let ErrorKind::HookFailed(source) = &err.kind else {
        panic!("expected HookFailed");
    };
    assert!(matches!(source.kind, ErrorKind::Hook(_)));
    assert!(err.to_string().contains("rejected"));
}

#[test]
fn not_exclusive_reports_count() {
    let err = Error::not_exclusive(EntityId::new(0, 1), "OrbitOf", 2);
    assert!(matches!(err.kind, ErrorKind::NotExclusive { count: 2, .. }));
}

#[test]
fn context_is_attached() {
    let err = Error::invalid_query("bad arity").with_context(
        ErrorContext::new()
            .with_operation("from_terms")
            .with_frame("relation pattern"),
    );
    let context = err.context.as_ref().expect("context was attached");
    assert_eq!(context.operation.as_deref(), Some("from_terms"));
    assert_eq!(context.stack, vec!["relation pattern".to_string()]);
    assert!(context.to_string().contains("in from_terms"));
}
