//! Integration tests for Error types
//!
//! Tests error construction, display, and context.

use plume_foundation::{Error, ErrorContext, ErrorKind, HeapRef, ValueType};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_type_mismatch() {
    let err = Error::type_mismatch(ValueType::Integer, ValueType::String);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    assert_eq!(format!("{err}"), "type mismatch: expected integer, got string");
}

#[test]
fn error_index_out_of_bounds() {
    let err = Error::index_out_of_bounds(7, 4);
    let msg = format!("{err}");
    assert!(msg.contains('7'));
    assert!(msg.contains('4'));
}

#[test]
fn error_decode_reports_offset() {
    let err = Error::decode(19, "unexpected end of input");
    assert!(matches!(err.kind, ErrorKind::Decode { offset: 19, .. }));
    assert!(format!("{err}").contains("byte 19"));
}

#[test]
fn error_stale_reference() {
    let err = Error::stale_reference(HeapRef::new(3, 1));
    assert!(matches!(err.kind, ErrorKind::StaleReference(_)));
}

#[test]
fn error_malformed_constructor() {
    let err = Error::malformed_constructor("not a list");
    assert!(format!("{err}").contains("not a list"));
}

// =============================================================================
// Context
// =============================================================================

#[test]
fn context_names_instruction_and_source() {
    let err = Error::new(ErrorKind::ReturnOutsideFrame).with_context(
        ErrorContext::new()
            .with_instruction(4, "Return")
            .with_source("main.plb"),
    );
    assert_eq!(
        format!("{err}"),
        "return outside of a function frame at instruction 4 (Return) in main.plb"
    );
}

#[test]
fn error_without_context() {
    let err = Error::new(ErrorKind::Faulted);
    assert!(err.context.is_none());
    assert_eq!(format!("{err}"), "the VM already stopped on a fatal error");
}

#[test]
fn standard_path_message_mentions_the_variable() {
    let err = Error::new(ErrorKind::StandardPathMissing {
        library: "io".to_string(),
    });
    assert!(format!("{err}").contains("PLUME_PATH"));
}
