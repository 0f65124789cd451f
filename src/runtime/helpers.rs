use super::*;
use crate::types::JsBigInt;
use num_bigint::BigInt;

pub(crate) fn to_integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

// §7.1.3 ToBoolean
pub(crate) fn to_boolean(val: &JsValue) -> bool {
    match val {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value != BigInt::from(0),
        JsValue::Object(_) => true,
    }
}

// §7.1.4.1.1 StringToNumber (uses §7.1.4.1.2 RoundMVResult via f64::parse)
pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            return BigInt::parse_bytes(digits.as_bytes(), radix)
                .and_then(|b| b.to_string().parse::<f64>().ok())
                .unwrap_or(f64::NAN);
        }
    }
    // f64::from_str also takes "inf" and "nan" spellings that StringToNumber
    // rejects, so only decimal literal characters are let through.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// §7.1.14 StringToBigInt
fn string_to_bigint(s: &str) -> Option<BigInt> {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() || digits.starts_with(['+', '-']) {
                return None;
            }
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    let (negative, digits) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    Some(if negative { -magnitude } else { magnitude })
}

#[derive(Clone, Copy, PartialEq)]
pub(crate) enum PreferredType {
    Number,
    String,
}

impl Runtime {
    // §7.1.1 ToPrimitive / §7.1.1.1 OrdinaryToPrimitive
    pub(crate) fn to_primitive(&mut self, val: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
        let JsValue::Object(o) = val else {
            return Ok(val.clone());
        };
        let methods = if hint == PreferredType::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        let mut any_callable = false;
        for method_name in methods {
            let method = self.get(o, method_name)?;
            if self.is_callable(&method) {
                any_callable = true;
                let result = self.call_function(&method, val, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        if !any_callable {
            // No Object.prototype in this realm: mirror its toString.
            let tag = o.borrow().class_name.clone();
            return Ok(JsValue::string(&format!("[object {tag}]")));
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    // §7.1.4 ToNumber
    pub fn to_number_value(&mut self, val: &JsValue) -> JsResult<f64> {
        match val {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(*b as u8 as f64),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(&s.to_rust_string())),
            JsValue::BigInt(_) => Err(JsError::type_error(
                "Cannot convert a BigInt value to a number",
            )),
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, PreferredType::Number)?;
                self.to_number_value(&prim)
            }
        }
    }

    // §7.1.13 ToBigInt
    pub fn to_bigint_value(&mut self, val: &JsValue) -> JsResult<JsValue> {
        let prim = self.to_primitive(val, PreferredType::Number)?;
        match prim {
            JsValue::BigInt(_) => Ok(prim),
            JsValue::Boolean(b) => Ok(JsValue::BigInt(JsBigInt {
                value: BigInt::from(b as u8),
            })),
            JsValue::String(ref s) => match string_to_bigint(&s.to_rust_string()) {
                Some(value) => Ok(JsValue::BigInt(JsBigInt { value })),
                None => Err(JsError::Syntax(format!("Cannot convert {s} to a BigInt"))),
            },
            JsValue::Undefined | JsValue::Null | JsValue::Number(_) => Err(JsError::type_error(
                format!("Cannot convert {prim} to a BigInt"),
            )),
            JsValue::Object(_) => Err(JsError::type_error("Cannot convert object to a BigInt")),
        }
    }

    // §7.1.17 ToString
    pub fn to_string_value(&mut self, val: &JsValue) -> JsResult<String> {
        match val {
            JsValue::Object(_) => {
                let prim = self.to_primitive(val, PreferredType::String)?;
                self.to_string_value(&prim)
            }
            JsValue::String(s) => Ok(s.to_rust_string()),
            JsValue::BigInt(b) => Ok(b.value.to_string()),
            other => Ok(format!("{other}")),
        }
    }

    // §7.1.19 ToPropertyKey
    pub fn to_property_key(&mut self, val: &JsValue) -> JsResult<String> {
        self.to_string_value(val)
    }

    // §7.1.22 ToIndex
    pub fn to_index(&mut self, val: &JsValue) -> JsResult<usize> {
        if val.is_undefined() {
            return Ok(0);
        }
        let integer_index = to_integer_or_infinity(self.to_number_value(val)?);
        if !(0.0..=number_ops::MAX_SAFE_INTEGER).contains(&integer_index) {
            return Err(JsError::range_error("Invalid index"));
        }
        Ok(integer_index as usize)
    }

    /// For Number kinds: ToNumber(value). For BigInt kinds: ToBigInt(value).
    pub(crate) fn typed_array_coerce_value(
        &mut self,
        kind: TypedArrayKind,
        value: &JsValue,
    ) -> JsResult<JsValue> {
        if kind.is_bigint() {
            self.to_bigint_value(value)
        } else {
            self.to_number_value(value).map(JsValue::Number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_number_literals() {
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("  12  "), 12.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(string_to_number(".5"), 0.5);
        assert_eq!(string_to_number("1e-3"), 0.001);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("infinity").is_nan());
        assert!(string_to_number("0x").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn string_to_bigint_literals() {
        assert_eq!(string_to_bigint(" 42 "), Some(BigInt::from(42)));
        assert_eq!(string_to_bigint("-7"), Some(BigInt::from(-7)));
        assert_eq!(string_to_bigint("0xff"), Some(BigInt::from(255)));
        assert_eq!(string_to_bigint(""), Some(BigInt::from(0)));
        assert_eq!(string_to_bigint("1.5"), None);
        assert_eq!(string_to_bigint("-"), None);
    }

    #[test]
    fn to_index_range() {
        let mut rt = Runtime::new();
        assert_eq!(rt.to_index(&JsValue::Undefined).unwrap(), 0);
        assert_eq!(rt.to_index(&JsValue::Number(3.7)).unwrap(), 3);
        assert_eq!(rt.to_index(&JsValue::Number(-0.5)).unwrap(), 0);
        assert!(rt.to_index(&JsValue::Number(-1.0)).unwrap_err().is_range_error());
        assert!(rt
            .to_index(&JsValue::Number(f64::INFINITY))
            .unwrap_err()
            .is_range_error());
    }

    #[test]
    fn to_number_calls_value_of() {
        let mut rt = Runtime::new();
        let obj = rt.create_object();
        let value_of = rt.create_function(JsFunction::native("valueOf", 0, |_, _, _| {
            Completion::Normal(JsValue::Number(7.0))
        }));
        obj.borrow_mut().insert_builtin("valueOf".to_string(), value_of);
        assert_eq!(rt.to_number_value(&JsValue::Object(obj)).unwrap(), 7.0);
    }

    #[test]
    fn to_bigint_rejects_numbers() {
        let mut rt = Runtime::new();
        assert!(rt.to_bigint_value(&JsValue::Number(1.0)).unwrap_err().is_type_error());
        assert!(matches!(
            rt.to_bigint_value(&JsValue::string("x")),
            Err(JsError::Syntax(_))
        ));
        assert!(matches!(
            rt.to_bigint_value(&JsValue::Boolean(true)),
            Ok(JsValue::BigInt(b)) if b.value == BigInt::from(1)
        ));
    }
}
