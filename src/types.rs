use crate::runtime::JsObjectData;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(JsBigInt),
    Object(JsObject),
}

// UTF-16 code unit string, §6.1.4
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    /// Length of the string once encoded as UTF-8. Lone surrogates count as
    /// the three bytes of U+FFFD.
    pub fn utf8_len(&self) -> usize {
        char::decode_utf16(self.code_units.iter().copied())
            .map(|c| c.map_or(3, char::len_utf8))
            .sum()
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

impl JsBigInt {
    /// Number of bytes needed for the magnitude (at least one).
    pub fn magnitude_bytes(&self) -> usize {
        let bits = self.value.bits() as usize;
        bits.div_ceil(8).max(1)
    }
}

/// Shared handle to a heap object. Equality is identity.
#[derive(Clone)]
pub struct JsObject(Rc<RefCell<JsObjectData>>);

impl JsObject {
    pub fn new(data: JsObjectData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub fn borrow(&self) -> Ref<'_, JsObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, JsObjectData> {
        self.0.borrow_mut()
    }

    /// Stable identity for the lifetime of the object.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for JsObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for JsObject {
    // Objects may form cycles, so only the header is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => write!(f, "JsObject({} @ {:#x})", data.class_name, self.addr()),
            Err(_) => write!(f, "JsObject(<borrowed> @ {:#x})", self.addr()),
        }
    }
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn as_object(&self) -> Option<&JsObject> {
        match self {
            JsValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn string(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }
}

// §7.2.10 SameValue
pub fn same_value(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn is_integral(x: f64) -> bool {
        x.is_finite() && x.trunc() == x
    }

    // §6.1.6.1.20 Number::toString
    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        // ryu gives the shortest round-tripping digits
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    // Shared modular step of §7.1.6 - §7.1.11: truncate, then reduce mod 2^bits.
    fn modulo_pow2(x: f64, bits: u32) -> u64 {
        if x.is_nan() || x.is_infinite() || x == 0.0 {
            return 0;
        }
        let modulus = 2f64.powi(bits as i32);
        let int_val = x.trunc() % modulus;
        let int_val = if int_val < 0.0 { int_val + modulus } else { int_val };
        int_val as u64
    }

    // §7.1.6 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        modulo_pow2(x, 32) as u32 as i32
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        modulo_pow2(x, 32) as u32
    }

    // §7.1.8 ToInt16
    pub fn to_int16(x: f64) -> i16 {
        modulo_pow2(x, 16) as u16 as i16
    }

    // §7.1.9 ToUint16
    pub fn to_uint16(x: f64) -> u16 {
        modulo_pow2(x, 16) as u16
    }

    // §7.1.10 ToInt8
    pub fn to_int8(x: f64) -> i8 {
        modulo_pow2(x, 8) as u8 as i8
    }

    // §7.1.11 ToUint8
    pub fn to_uint8(x: f64) -> u8 {
        modulo_pow2(x, 8) as u8
    }

    // §7.1.12 ToUint8Clamp (round half to even)
    pub fn to_uint8_clamp(x: f64) -> u8 {
        if x.is_nan() || x <= 0.0 {
            return 0;
        }
        if x >= 255.0 {
            return 255;
        }
        let f = x.floor();
        if f + 0.5 < x {
            return (f + 1.0) as u8;
        }
        if x < f + 0.5 {
            return f as u8;
        }
        if f as u8 % 2 == 1 {
            (f + 1.0) as u8
        } else {
            f as u8
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{}", number_ops::to_string(*n)),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(o) => match o.0.try_borrow() {
                Ok(data) => write!(f, "[object {}]", data.class_name),
                Err(_) => write!(f, "[object Object]"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn number_shortest_round_trip() {
        assert_eq!(number_ops::to_string(0.001), "0.001");
        assert_eq!(number_ops::to_string(1.5), "1.5");
        assert_eq!(number_ops::to_string(42.0), "42");
        assert_eq!(number_ops::to_string(1e21), "1e+21");
        assert_eq!(number_ops::to_string(9007199254740992.0), "9007199254740992");
    }

    #[test]
    fn number_same_value() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value(0.0, 0.0));
    }

    #[test]
    fn to_int32_basics() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(f64::INFINITY), 0);
        assert_eq!(number_ops::to_int32(0.0), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(4294967297.0), 1);
    }

    #[test]
    fn narrow_integer_conversions() {
        assert_eq!(number_ops::to_uint8(256.0), 0);
        assert_eq!(number_ops::to_uint8(-1.0), 255);
        assert_eq!(number_ops::to_int8(128.0), -128);
        assert_eq!(number_ops::to_int16(32768.0), -32768);
        assert_eq!(number_ops::to_uint16(-1.0), 0xFFFF);
        assert_eq!(number_ops::to_uint32(-1.0), u32::MAX);
    }

    #[test]
    fn uint8_clamp_rounds_half_to_even() {
        assert_eq!(number_ops::to_uint8_clamp(-5.0), 0);
        assert_eq!(number_ops::to_uint8_clamp(300.0), 255);
        assert_eq!(number_ops::to_uint8_clamp(1.5), 2);
        assert_eq!(number_ops::to_uint8_clamp(2.5), 2);
        assert_eq!(number_ops::to_uint8_clamp(2.6), 3);
        assert_eq!(number_ops::to_uint8_clamp(f64::NAN), 0);
    }

    #[test]
    fn utf8_length_of_strings() {
        assert_eq!(JsString::from_str("test").utf8_len(), 4);
        assert_eq!(JsString::from_str("é").utf8_len(), 2);
        assert_eq!(JsString::from_str("").utf8_len(), 0);
    }

    #[test]
    fn display_values() {
        assert_eq!(format!("{}", JsValue::Undefined), "undefined");
        assert_eq!(format!("{}", JsValue::Null), "null");
        assert_eq!(format!("{}", JsValue::Boolean(true)), "true");
        assert_eq!(format!("{}", JsValue::Number(42.0)), "42");
        assert_eq!(format!("{}", JsValue::string("hi")), "hi");
    }
}
