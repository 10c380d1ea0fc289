//! Numeric graphics handles.
//!
//! A handle is a double-precision identifier. The root object is handle
//! `0`, figures are small positive integers, and every other object gets
//! a negative handle whose integer part comes from a decreasing counter
//! (or a recycling free list) and whose fractional part is drawn fresh
//! on every allocation so a recycled integer part never reproduces a
//! previously live handle value.

use std::cmp::Ordering;
use std::fmt;

use matviz_values::Value;

/// Numeric identifier referencing a graphics object.
///
/// A handle may be in the "unset" (NaN) state, which is distinct from
/// "invalid" (a value no longer present in the registry). Equality and
/// ordering use the IEEE total order so handles can key a `BTreeMap`;
/// under that order two unset handles compare equal, so validity checks
/// go through [`Handle::ok`] rather than comparison against `unset`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Handle(f64);

impl Handle {
    pub const ROOT: Handle = Handle(0.0);

    pub fn new(value: f64) -> Self {
        // The total order distinguishes -0.0 from 0.0; normalize so
        // the root is a single map key.
        Handle(if value == 0.0 { 0.0 } else { value })
    }

    /// The unset (NaN) handle.
    pub fn unset() -> Self {
        Handle(f64::NAN)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// True unless this handle is in the NaN (unset) state.
    pub fn ok(self) -> bool {
        !self.0.is_nan()
    }

    pub fn is_root(self) -> bool {
        self.0 == 0.0
    }

    pub fn as_value(self) -> Value {
        if self.ok() {
            Value::Num(self.0)
        } else {
            Value::empty()
        }
    }
}

impl From<f64> for Handle {
    fn from(value: f64) -> Self {
        Handle(value)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Handle {}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
