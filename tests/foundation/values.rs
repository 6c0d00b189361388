//! Integration tests for NaN-boxed values
//!
//! Tests encoding, decoding, and typed accessors.

use plume_foundation::{
    CANONICAL_NAN, Decoded, ErrorKind, FrameRecord, FunctionRef, Value, ValueType,
};
use proptest::prelude::*;

// =============================================================================
// Scalars
// =============================================================================

#[test]
fn integers_round_trip() {
    for n in [0, 1, -1, i32::MIN, i32::MAX] {
        let v = Value::integer(n);
        assert_eq!(v.get_type(), ValueType::Integer);
        assert_eq!(v.get_int().unwrap(), n);
    }
}

#[test]
fn floats_round_trip() {
    for f in [0.0, -0.0, 1.5, -2.25, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE] {
        let v = Value::float(f);
        assert!(v.is_float());
        assert_eq!(v.get_float().unwrap().to_bits(), f.to_bits());
    }
}

#[test]
fn nan_is_canonical() {
    let v = Value::float(f64::from_bits(0x7FF8_0000_0000_0001));
    assert_eq!(v.to_bits(), CANONICAL_NAN);
    assert_eq!(v.get_type(), ValueType::Float);
    assert!(v.get_float().unwrap().is_nan());
}

#[test]
fn special() {
    let v = Value::special();
    assert!(v.is_special());
    assert_eq!(v.get_type(), ValueType::Special);
    assert_eq!(Value::default(), v);
}

#[test]
fn booleans_are_integers() {
    assert_eq!(Value::from(true), Value::integer(1));
    assert_eq!(Value::from(false), Value::integer(0));
}

// =============================================================================
// Code Values
// =============================================================================

#[test]
fn function_fields() {
    let v = Value::function(120, 3);
    assert_eq!(v.get_type(), ValueType::Function);
    assert_eq!(
        v.get_function().unwrap(),
        FunctionRef {
            entry: 120,
            frame_size: 3
        }
    );
}

#[test]
fn funcenv_fields() {
    let v = Value::funcenv(9, 14, 10);
    assert_eq!(v.get_type(), ValueType::FuncEnv);
    let record = v.get_funcenv().unwrap();
    assert_eq!(
        record,
        FrameRecord {
            return_pc: 9,
            stack_pointer: 14,
            base_pointer: 10
        }
    );
    assert_eq!(v.get_nth_field(0).unwrap(), 9);
    assert_eq!(v.get_nth_field(2).unwrap(), 10);
}

// =============================================================================
// Accessor Errors
// =============================================================================

#[test]
fn accessors_check_the_tag() {
    let err = Value::float(1.0).get_int().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::TypeMismatch {
            expected: ValueType::Integer,
            actual: ValueType::Float
        }
    ));
    assert!(Value::integer(1).get_float().is_err());
    assert!(Value::special().get_function().is_err());
    assert!(Value::integer(0).get_ptr().is_err());
}

#[test]
fn unknown_signatures_decode_as_unknown() {
    let v = Value::from_bits(0x7FFB_0000_0000_0000);
    assert!(matches!(v.decode(), Decoded::Unknown(_)));
    assert_eq!(v.get_type(), ValueType::Unknown);
}

proptest! {
    #[test]
    fn any_integer_round_trips(n in any::<i32>()) {
        prop_assert_eq!(Value::integer(n).get_int().unwrap(), n);
    }

    #[test]
    fn any_non_nan_float_round_trips(f in any::<f64>().prop_filter("not NaN", |f| !f.is_nan())) {
        prop_assert_eq!(Value::float(f).get_float().unwrap().to_bits(), f.to_bits());
    }

    #[test]
    fn any_function_round_trips(entry in any::<u16>(), size in any::<u16>()) {
        let f = Value::function(entry, size).get_function().unwrap();
        prop_assert_eq!((f.entry, f.frame_size), (entry, size));
    }
}
