use super::helpers::string_to_number;
use crate::types::number_ops;

/// How an integer-indexed exotic object treats a property key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyClass {
    /// Not a canonical numeric string; ordinary property semantics.
    Ordinary,
    /// Canonical numeric, but never an element (`"-0"`, `"1.5"`, `"Infinity"`).
    Numeric(f64),
    /// Canonical numeric and a valid integer index.
    Index(u64),
}

impl KeyClass {
    pub fn is_numeric(self) -> bool {
        !matches!(self, KeyClass::Ordinary)
    }
}

// §7.1.21 CanonicalNumericIndexString
pub fn canonical_numeric_index_string(s: &str) -> Option<f64> {
    if s == "-0" {
        return Some(-0.0);
    }
    let n = string_to_number(s);
    if number_ops::to_string(n) == s { Some(n) } else { None }
}

/// Integral, not -0, and within `0..=2^53 - 1`.
pub fn integer_index(n: f64) -> Option<u64> {
    if !number_ops::is_integral(n) {
        return None;
    }
    if n == 0.0 && n.is_sign_negative() {
        return None;
    }
    if !(0.0..=number_ops::MAX_SAFE_INTEGER).contains(&n) {
        return None;
    }
    Some(n as u64)
}

pub fn classify_key(key: &str) -> KeyClass {
    match canonical_numeric_index_string(key) {
        None => KeyClass::Ordinary,
        Some(n) => match integer_index(n) {
            Some(idx) => KeyClass::Index(idx),
            None => KeyClass::Numeric(n),
        },
    }
}
