//! Typed array and DataView records over a shared [`BufferState`].

use super::buffer::BufferState;
use crate::error::{JsError, JsResult};
use crate::types::{JsBigInt, JsObject, JsValue, number_ops};
use num_bigint::{BigInt, Sign};
use std::rc::Rc;

pub(crate) const HOST_LITTLE_ENDIAN: bool = cfg!(target_endian = "little");

// Table 71: The TypedArray Constructors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub const ALL: [TypedArrayKind; 11] = [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ];

    pub fn bytes_per_element(self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| {
            k.name().eq_ignore_ascii_case(name)
                || k.name()
                    .strip_suffix("Array")
                    .is_some_and(|short| short.eq_ignore_ascii_case(name))
        })
    }

    pub fn is_bigint(self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

macro_rules! endian_bytes {
    ($v:expr, $le:expr) => {{
        let v = $v;
        if $le { v.to_le_bytes() } else { v.to_be_bytes() }
    }};
}

macro_rules! endian_read {
    ($ty:ty, $raw:expr, $le:expr) => {{
        let mut bytes = [0u8; std::mem::size_of::<$ty>()];
        bytes.copy_from_slice(&$raw[..std::mem::size_of::<$ty>()]);
        if $le { <$ty>::from_le_bytes(bytes) } else { <$ty>::from_be_bytes(bytes) }
    }};
}

// ToBigInt64 / ToBigUint64 share the low 64 bits of the two's complement.
fn bigint_low_u64(value: &BigInt) -> u64 {
    let (sign, digits) = value.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0);
    if sign == Sign::Minus { low.wrapping_neg() } else { low }
}

// §25.1.3.17 NumericToRawBytes. `value` must already be a Number, or a
// BigInt for BigInt kinds.
pub(crate) fn numeric_to_raw_bytes(
    kind: TypedArrayKind,
    value: &JsValue,
    little_endian: bool,
) -> Vec<u8> {
    let n = value.as_number().unwrap_or(f64::NAN);
    let low = match value {
        JsValue::BigInt(b) => bigint_low_u64(&b.value),
        _ => 0,
    };
    match kind {
        TypedArrayKind::Int8 => vec![number_ops::to_int8(n) as u8],
        TypedArrayKind::Uint8 => vec![number_ops::to_uint8(n)],
        TypedArrayKind::Uint8Clamped => vec![number_ops::to_uint8_clamp(n)],
        TypedArrayKind::Int16 => endian_bytes!(number_ops::to_int16(n), little_endian).to_vec(),
        TypedArrayKind::Uint16 => endian_bytes!(number_ops::to_uint16(n), little_endian).to_vec(),
        TypedArrayKind::Int32 => endian_bytes!(number_ops::to_int32(n), little_endian).to_vec(),
        TypedArrayKind::Uint32 => endian_bytes!(number_ops::to_uint32(n), little_endian).to_vec(),
        TypedArrayKind::Float32 => endian_bytes!(n as f32, little_endian).to_vec(),
        TypedArrayKind::Float64 => endian_bytes!(n, little_endian).to_vec(),
        TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => {
            endian_bytes!(low, little_endian).to_vec()
        }
    }
}

// §25.1.3.14 RawBytesToNumeric
pub(crate) fn raw_bytes_to_numeric(kind: TypedArrayKind, raw: &[u8], little_endian: bool) -> JsValue {
    match kind {
        TypedArrayKind::Int8 => JsValue::Number(raw[0] as i8 as f64),
        TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => JsValue::Number(raw[0] as f64),
        TypedArrayKind::Int16 => JsValue::Number(endian_read!(i16, raw, little_endian) as f64),
        TypedArrayKind::Uint16 => JsValue::Number(endian_read!(u16, raw, little_endian) as f64),
        TypedArrayKind::Int32 => JsValue::Number(endian_read!(i32, raw, little_endian) as f64),
        TypedArrayKind::Uint32 => JsValue::Number(endian_read!(u32, raw, little_endian) as f64),
        TypedArrayKind::Float32 => JsValue::Number(endian_read!(f32, raw, little_endian) as f64),
        TypedArrayKind::Float64 => JsValue::Number(endian_read!(f64, raw, little_endian)),
        TypedArrayKind::BigInt64 => JsValue::BigInt(JsBigInt {
            value: BigInt::from(endian_read!(i64, raw, little_endian)),
        }),
        TypedArrayKind::BigUint64 => JsValue::BigInt(JsBigInt {
            value: BigInt::from(endian_read!(u64, raw, little_endian)),
        }),
    }
}

/// Internal slots of an integer-indexed exotic object.
#[derive(Debug, Clone)]
pub struct TypedArrayInfo {
    pub kind: TypedArrayKind,
    /// The `ArrayBuffer` object this view reads through.
    pub buffer: JsObject,
    pub(crate) state: Rc<BufferState>,
    pub byte_offset: usize,
    pub array_length: usize,
    /// Constructor used by species-less creation of derived arrays.
    pub default_ctor: Option<JsObject>,
}

impl TypedArrayInfo {
    pub(crate) fn new(
        kind: TypedArrayKind,
        buffer: JsObject,
        state: Rc<BufferState>,
        byte_offset: usize,
        array_length: usize,
    ) -> Self {
        Self {
            kind,
            buffer,
            state,
            byte_offset,
            array_length,
            default_ctor: None,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.state.is_detached()
    }

    // §10.4.5.12 IsTypedArrayOutOfBounds
    pub fn is_out_of_bounds(&self) -> bool {
        if self.is_detached() {
            return true;
        }
        let end = self.byte_offset + self.array_length * self.kind.bytes_per_element();
        end > self.state.byte_length()
    }

    // §10.4.5.13 TypedArrayLength, zero when out of bounds
    pub fn length(&self) -> usize {
        if self.is_out_of_bounds() {
            0
        } else {
            self.array_length
        }
    }

    pub fn byte_length(&self) -> usize {
        self.length() * self.kind.bytes_per_element()
    }

    pub fn byte_offset(&self) -> usize {
        if self.is_out_of_bounds() {
            0
        } else {
            self.byte_offset
        }
    }

    // §10.4.5.14 IsValidIntegerIndex, for an index already known integral
    pub fn is_valid_index(&self, index: u64) -> bool {
        index < self.length() as u64
    }

    // §10.4.5.15 TypedArrayGetElement
    pub fn get_element(&self, index: u64) -> Option<JsValue> {
        if !self.is_valid_index(index) {
            return None;
        }
        let size = self.kind.bytes_per_element();
        let offset = self.byte_offset + index as usize * size;
        let mut raw = [0u8; 8];
        if !self.state.read(offset, &mut raw[..size]) {
            return None;
        }
        Some(raw_bytes_to_numeric(self.kind, &raw[..size], HOST_LITTLE_ENDIAN))
    }

    /// Writes an already coerced numeric value. Returns false when the index
    /// is no longer valid.
    pub(crate) fn set_element(&self, index: u64, numeric: &JsValue) -> bool {
        if !self.is_valid_index(index) {
            return false;
        }
        let size = self.kind.bytes_per_element();
        let offset = self.byte_offset + index as usize * size;
        let raw = numeric_to_raw_bytes(self.kind, numeric, HOST_LITTLE_ENDIAN);
        self.state.write(offset, &raw)
    }
}

/// Internal slots of a `DataView`.
#[derive(Debug, Clone)]
pub struct DataViewInfo {
    pub buffer: JsObject,
    pub(crate) state: Rc<BufferState>,
    pub byte_offset: usize,
    pub byte_length: usize,
}

impl DataViewInfo {
    pub(crate) fn new(
        buffer: JsObject,
        state: Rc<BufferState>,
        byte_offset: usize,
        byte_length: usize,
    ) -> Self {
        Self {
            buffer,
            state,
            byte_offset,
            byte_length,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.state.is_detached()
    }

    // §25.3.1.3 IsViewOutOfBounds
    pub fn is_out_of_bounds(&self) -> bool {
        self.is_detached() || self.byte_offset + self.byte_length > self.state.byte_length()
    }

    // §25.3.1.2 GetViewByteLength
    pub fn view_byte_length(&self) -> JsResult<usize> {
        if self.is_out_of_bounds() {
            return Err(JsError::type_error("DataView is out of bounds"));
        }
        Ok(self.byte_length)
    }

    fn checked_offset(&self, get_index: usize, size: usize) -> JsResult<usize> {
        let view_size = self.view_byte_length()?;
        match get_index.checked_add(size) {
            Some(end) if end <= view_size => Ok(self.byte_offset + get_index),
            _ => Err(JsError::range_error("Offset is outside the bounds of the DataView")),
        }
    }

    // §25.3.1.5 GetViewValue, after ToIndex
    pub fn get_value(
        &self,
        kind: TypedArrayKind,
        get_index: usize,
        little_endian: bool,
    ) -> JsResult<JsValue> {
        let size = kind.bytes_per_element();
        let offset = self.checked_offset(get_index, size)?;
        let mut raw = [0u8; 8];
        if !self.state.read(offset, &mut raw[..size]) {
            return Err(JsError::type_error("DataView is out of bounds"));
        }
        Ok(raw_bytes_to_numeric(kind, &raw[..size], little_endian))
    }

    // §25.3.1.6 SetViewValue, after ToIndex and numeric coercion
    pub fn set_value(
        &self,
        kind: TypedArrayKind,
        get_index: usize,
        numeric: &JsValue,
        little_endian: bool,
    ) -> JsResult<()> {
        let offset = self.checked_offset(get_index, kind.bytes_per_element())?;
        let raw = numeric_to_raw_bytes(kind, numeric, little_endian);
        if !self.state.write(offset, &raw) {
            return Err(JsError::type_error("DataView is out of bounds"));
        }
        Ok(())
    }
}
