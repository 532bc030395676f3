//! Shallow equality used for hook dependency lists.

use trellis_dom::Value;

/// Dependency list passed to effect and memo hooks. `None` means "always".
pub type Deps = Option<Vec<Value>>;

/// Shallow comparison of two values.
///
/// Lists compare length then element-wise, maps compare key sets and values
/// by plain equality, scalars by value. `Null` is never equal to anything,
/// not even another `Null`.
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| shallow_equal(a, b))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
        }
        (a, b) => a == b,
    }
}

pub fn deps_equal(previous: &[Value], next: &[Value]) -> bool {
    previous.len() == next.len() && previous.iter().zip(next).all(|(a, b)| shallow_equal(a, b))
}

/// Whether a hook guarded by `next` must re-run given the deps it last ran with.
pub(crate) fn deps_changed(previous: Option<&[Value]>, next: Option<&[Value]>) -> bool {
    match (previous, next) {
        (Some(previous), Some(next)) => !deps_equal(previous, next),
        _ => true,
    }
}
