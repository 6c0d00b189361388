//! Arithmetic and comparison helpers for the dispatch loop.

use plume_bytecode::Comparator;
use plume_foundation::{Decoded, Error, Heap, Result, Value, ValueType};

fn numeric(
    a: Value,
    b: Value,
    int_op: fn(i32, i32) -> i32,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (a.decode(), b.decode()) {
        (Decoded::Integer(x), Decoded::Integer(y)) => Ok(Value::integer(int_op(x, y))),
        (Decoded::Float(x), Decoded::Float(y)) => Ok(Value::float(float_op(x, y))),
        (Decoded::Integer(_), _) => Err(Error::type_mismatch(ValueType::Integer, b.get_type())),
        (Decoded::Float(_), _) => Err(Error::type_mismatch(ValueType::Float, b.get_type())),
        _ => Err(Error::type_mismatch(ValueType::Integer, a.get_type())),
    }
}

/// Adds two values. Integers wrap.
pub(crate) fn add_values(a: Value, b: Value) -> Result<Value> {
    numeric(a, b, i32::wrapping_add, |x, y| x + y)
}

/// Subtracts `b` from `a`. Integers wrap.
pub(crate) fn sub_values(a: Value, b: Value) -> Result<Value> {
    numeric(a, b, i32::wrapping_sub, |x, y| x - y)
}

/// Multiplies two values. Integers wrap.
pub(crate) fn mul_values(a: Value, b: Value) -> Result<Value> {
    numeric(a, b, i32::wrapping_mul, |x, y| x * y)
}

fn ordering(a: Value, b: Value) -> Result<Option<std::cmp::Ordering>> {
    match (a.decode(), b.decode()) {
        (Decoded::Integer(x), Decoded::Integer(y)) => Ok(Some(x.cmp(&y))),
        (Decoded::Float(x), Decoded::Float(y)) => Ok(x.partial_cmp(&y)),
        (Decoded::Integer(_), _) => Err(Error::type_mismatch(ValueType::Integer, b.get_type())),
        (Decoded::Float(_), _) => Err(Error::type_mismatch(ValueType::Float, b.get_type())),
        _ => Err(Error::type_mismatch(ValueType::Integer, a.get_type())),
    }
}

/// Evaluates `a ⋄ b`.
///
/// Ordering comparisons involving NaN are false.
pub(crate) fn compare_values(heap: &Heap, cmp: Comparator, a: Value, b: Value) -> Result<bool> {
    use std::cmp::Ordering::{Equal, Greater, Less};

    Ok(match cmp {
        Comparator::Less => ordering(a, b)? == Some(Less),
        Comparator::Greater => ordering(a, b)? == Some(Greater),
        Comparator::LessEqual => matches!(ordering(a, b)?, Some(Less | Equal)),
        Comparator::GreaterEqual => matches!(ordering(a, b)?, Some(Greater | Equal)),
        Comparator::Equal => heap.equal(a, b)?,
        Comparator::NotEqual => !heap.equal(a, b)?,
        Comparator::And => {
            let (x, y) = (is_truthy(a)?, is_truthy(b)?);
            x && y
        }
        Comparator::Or => {
            let (x, y) = (is_truthy(a)?, is_truthy(b)?);
            x || y
        }
    })
}

/// Interprets an integer as a condition: nonzero is true.
pub(crate) fn is_truthy(value: Value) -> Result<bool> {
    Ok(value.get_int()? != 0)
}
