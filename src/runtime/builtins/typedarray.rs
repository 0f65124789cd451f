use super::*;

fn this_typed_array(this: &JsValue) -> JsResult<TypedArrayInfo> {
    match this {
        JsValue::Object(o) => o
            .borrow()
            .typed_array_info
            .clone()
            .ok_or_else(|| JsError::type_error(format!("{this} is not a typed array"))),
        _ => Err(JsError::type_error(format!("{this} is not a typed array"))),
    }
}

// §23.2.5.1.3 step 5: the offset must be a multiple of the element size
fn check_alignment(kind: TypedArrayKind, byte_offset: usize) -> JsResult<()> {
    if byte_offset % kind.bytes_per_element() != 0 {
        return Err(JsError::range_error(format!(
            "start offset of {} should be a multiple of {}",
            kind.name(),
            kind.bytes_per_element()
        )));
    }
    Ok(())
}

impl Runtime {
    pub(crate) fn setup_typed_array_base_prototype(&mut self) {
        let proto = self.create_object();
        proto.borrow_mut().class_name = "TypedArray".to_string();
        self.typed_array_prototype = Some(proto.clone());

        self.define_getter(&proto, "buffer", |_rt, this, _args| {
            this_typed_array(this)
                .map(|ta| JsValue::Object(ta.buffer))
                .into()
        });
        self.define_getter(&proto, "byteLength", |_rt, this, _args| {
            this_typed_array(this)
                .map(|ta| JsValue::Number(ta.byte_length() as f64))
                .into()
        });
        self.define_getter(&proto, "byteOffset", |_rt, this, _args| {
            this_typed_array(this)
                .map(|ta| JsValue::Number(ta.byte_offset() as f64))
                .into()
        });
        self.define_getter(&proto, "length", |_rt, this, _args| {
            this_typed_array(this)
                .map(|ta| JsValue::Number(ta.length() as f64))
                .into()
        });
    }

    pub(crate) fn setup_typed_array_constructors(&mut self) {
        let Some(ta_proto) = self.typed_array_prototype.clone() else {
            return;
        };
        let ta_ctor = self.create_constructor("TypedArray", 0, &ta_proto, |_rt, _nt, _args| {
            Completion::Throw(JsError::type_error(
                "Abstract class TypedArray not directly constructable",
            ))
        });
        self.define_method(&ta_ctor, "of", 0, |rt, this, args| {
            rt.typed_array_of_this(this, args).into()
        });
        self.typed_array_constructor = Some(ta_ctor.clone());

        for kind in TypedArrayKind::ALL {
            let bpe = JsValue::Number(kind.bytes_per_element() as f64);
            let proto = self.create_object_with_proto(Some(ta_proto.clone()));
            {
                let mut p = proto.borrow_mut();
                p.class_name = kind.name().to_string();
                p.insert_property(
                    "BYTES_PER_ELEMENT".to_string(),
                    PropertyDescriptor::data(bpe.clone(), false, false, false),
                );
            }
            let ctor = self.create_constructor(kind.name(), 3, &proto, move |rt, nt, args| {
                rt.construct_typed_array(kind, nt, args).into()
            });
            {
                let mut c = ctor.borrow_mut();
                c.insert_property(
                    "BYTES_PER_ELEMENT".to_string(),
                    PropertyDescriptor::data(bpe, false, false, false),
                );
                c.prototype = Some(ta_ctor.clone());
            }
            self.typed_array_prototypes.push(proto);
            self.typed_array_constructors.push(ctor);
        }
    }

    // §23.2.5.1 TypedArray ( ...args )
    fn construct_typed_array(
        &mut self,
        kind: TypedArrayKind,
        new_target: &JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let default_proto = self.typed_array_prototypes.get(kind.index()).cloned();
        let proto = self.prototype_from_constructor(new_target, default_proto)?;
        let first = arg(args, 0);
        let JsValue::Object(ref source) = first else {
            let len = self.to_index(&first)?;
            return self.allocate_typed_array(kind, proto, len).map(JsValue::Object);
        };
        if let Some(ab) = ArrayBuffer::from_object(source) {
            // §23.2.5.1.3 InitializeTypedArrayFromArrayBuffer
            let byte_offset = self.to_index(&arg(args, 1))?;
            check_alignment(kind, byte_offset)?;
            let length = match arg(args, 2) {
                JsValue::Undefined => None,
                len => Some(self.to_index(&len)?),
            };
            return self
                .typed_array_on_buffer(kind, proto, &ab, byte_offset, length)
                .map(JsValue::Object);
        }
        let source_info = source.borrow().typed_array_info.clone();
        let view = match source_info {
            Some(src) => self.typed_array_from_typed_array(kind, proto, &src)?,
            None => self.typed_array_from_array_like(kind, proto, source)?,
        };
        Ok(JsValue::Object(view))
    }

    // §23.2.5.1.2 InitializeTypedArrayFromTypedArray
    fn typed_array_from_typed_array(
        &mut self,
        kind: TypedArrayKind,
        proto: Option<JsObject>,
        src: &TypedArrayInfo,
    ) -> JsResult<JsObject> {
        if src.is_out_of_bounds() {
            return Err(JsError::type_error("source typed array is detached or out of bounds"));
        }
        if kind.is_bigint() != src.kind.is_bigint() {
            return Err(JsError::type_error(
                "Cannot mix BigInt and other types, use explicit conversions",
            ));
        }
        let len = src.length();
        let view = self.allocate_typed_array(kind, proto, len)?;
        if let Some(target) = self.typed_array_info(&view) {
            for i in 0..len as u64 {
                if let Some(value) = src.get_element(i) {
                    target.set_element(i, &value);
                }
            }
        }
        Ok(view)
    }

    // §23.2.5.1.5 InitializeTypedArrayFromArrayLike
    fn typed_array_from_array_like(
        &mut self,
        kind: TypedArrayKind,
        proto: Option<JsObject>,
        source: &JsObject,
    ) -> JsResult<JsObject> {
        let len_value = self.get(source, "length")?;
        let len = helpers::to_integer_or_infinity(self.to_number_value(&len_value)?)
            .clamp(0.0, number_ops::MAX_SAFE_INTEGER) as usize;
        let view = self.allocate_typed_array(kind, proto, len)?;
        for k in 0..len {
            let key = index_key(k);
            let value = self.get(source, &key)?;
            self.set(&view, &key, value)?;
        }
        Ok(view)
    }

    // §23.2.5.1.6 AllocateTypedArray with a fresh zeroed buffer
    fn allocate_typed_array(
        &mut self,
        kind: TypedArrayKind,
        proto: Option<JsObject>,
        length: usize,
    ) -> JsResult<JsObject> {
        let byte_length = length
            .checked_mul(kind.bytes_per_element())
            .filter(|n| (*n as f64) <= number_ops::MAX_SAFE_INTEGER)
            .ok_or_else(|| JsError::range_error(format!("Invalid typed array length: {length}")))?;
        let ab = self.allocate_array_buffer(
            self.arraybuffer_prototype.clone(),
            BufferState::zeroed(byte_length)?,
        );
        Ok(self.make_typed_array(kind, proto, &ab, 0, length))
    }

    fn typed_array_on_buffer(
        &mut self,
        kind: TypedArrayKind,
        proto: Option<JsObject>,
        ab: &ArrayBuffer,
        byte_offset: usize,
        length: Option<usize>,
    ) -> JsResult<JsObject> {
        check_alignment(kind, byte_offset)?;
        if ab.is_detached() {
            return Err(JsError::type_error(
                "Cannot construct a typed array on a detached ArrayBuffer",
            ));
        }
        let size = kind.bytes_per_element();
        let buffer_len = ab.byte_length();
        let array_length = match length {
            None => {
                if buffer_len % size != 0 {
                    return Err(JsError::range_error(format!(
                        "byte length of {} should be a multiple of {size}",
                        kind.name()
                    )));
                }
                if byte_offset > buffer_len {
                    return Err(JsError::range_error(format!(
                        "Start offset {byte_offset} is outside the bounds of the buffer"
                    )));
                }
                (buffer_len - byte_offset) / size
            }
            Some(len) => {
                let fits = len
                    .checked_mul(size)
                    .and_then(|n| n.checked_add(byte_offset))
                    .is_some_and(|end| end <= buffer_len);
                if !fits {
                    return Err(JsError::range_error(format!("Invalid typed array length: {len}")));
                }
                len
            }
        };
        Ok(self.make_typed_array(kind, proto, ab, byte_offset, array_length))
    }

    fn make_typed_array(
        &mut self,
        kind: TypedArrayKind,
        proto: Option<JsObject>,
        ab: &ArrayBuffer,
        byte_offset: usize,
        array_length: usize,
    ) -> JsObject {
        let mut info = TypedArrayInfo::new(
            kind,
            ab.object().clone(),
            ab.state().clone(),
            byte_offset,
            array_length,
        );
        info.default_ctor = self.typed_array_constructors.get(kind.index()).cloned();
        let mut data = JsObjectData::with_class(kind.name());
        data.prototype = proto;
        data.typed_array_info = Some(info);
        log::debug!(
            "created {} view: offset {byte_offset}, length {array_length}",
            kind.name()
        );
        JsObject::new(data)
    }

    // §23.2.2.2 %TypedArray%.of ( ...items )
    fn typed_array_of_this(&mut self, this: &JsValue, items: &[JsValue]) -> JsResult<JsValue> {
        if !self.is_constructor(this) {
            return Err(JsError::type_error(format!("{this} is not a constructor")));
        }
        let len = items.len();
        let created = self.construct(this, &[JsValue::Number(len as f64)])?;
        // §23.2.4.2 TypedArrayCreateFromConstructor validation
        let info = this_typed_array(&created)?;
        if info.is_out_of_bounds() {
            return Err(JsError::type_error("constructed typed array is out of bounds"));
        }
        if info.length() < len {
            return Err(JsError::type_error("constructed typed array is too short"));
        }
        let JsValue::Object(ref view) = created else {
            return Err(JsError::type_error("not a typed array"));
        };
        for (k, value) in items.iter().enumerate() {
            self.set(view, &index_key(k), value.clone())?;
        }
        Ok(created)
    }

    /// A typed array of `kind` viewing `buffer` from `byte_offset`. With no
    /// `length` the view extends to the end of the buffer.
    pub fn new_typed_array(
        &mut self,
        kind: TypedArrayKind,
        buffer: &ArrayBuffer,
        byte_offset: usize,
        length: Option<usize>,
    ) -> JsResult<JsObject> {
        let proto = self.typed_array_prototypes.get(kind.index()).cloned();
        self.typed_array_on_buffer(kind, proto, buffer, byte_offset, length)
    }

    /// A zero-filled typed array over its own buffer.
    pub fn typed_array_from_length(&mut self, kind: TypedArrayKind, length: usize) -> JsResult<JsObject> {
        let proto = self.typed_array_prototypes.get(kind.index()).cloned();
        self.allocate_typed_array(kind, proto, length)
    }

    /// Host form of `Kind.of(...values)`; values are coerced in order.
    pub fn typed_array_of(&mut self, kind: TypedArrayKind, values: &[JsValue]) -> JsResult<JsObject> {
        let view = self.typed_array_from_length(kind, values.len())?;
        if let Some(info) = self.typed_array_info(&view) {
            for (k, value) in values.iter().enumerate() {
                self.typed_array_set_element(&info, k as u64, value)?;
            }
        }
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsBigInt;
    use num_bigint::BigInt;

    fn ctor_value(rt: &Runtime, kind: TypedArrayKind) -> JsValue {
        JsValue::Object(rt.typed_array_kind_constructor(kind).unwrap().clone())
    }

    #[test]
    fn intrinsics_are_linked() {
        let mut rt = Runtime::new();
        let ctor = rt.typed_array_kind_constructor(TypedArrayKind::Int32).unwrap().clone();
        let proto = rt.typed_array_kind_prototype(TypedArrayKind::Int32).unwrap().clone();
        assert_eq!(rt.get(&ctor, "BYTES_PER_ELEMENT").unwrap().as_number(), Some(4.0));
        assert_eq!(rt.get(&proto, "BYTES_PER_ELEMENT").unwrap().as_number(), Some(4.0));
        assert!(matches!(rt.get(&ctor, "prototype").unwrap(), JsValue::Object(p) if p == proto));
        assert!(matches!(rt.get(&proto, "constructor").unwrap(), JsValue::Object(c) if c == ctor));
        assert_eq!(
            ctor.borrow().prototype.as_ref(),
            rt.typed_array_constructor()
        );
        assert_eq!(
            proto.borrow().prototype.as_ref(),
            rt.typed_array_prototype()
        );
    }

    #[test]
    fn abstract_constructor_throws() {
        let mut rt = Runtime::new();
        let ta = JsValue::Object(rt.typed_array_constructor().unwrap().clone());
        assert!(rt.construct(&ta, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn construct_from_length_and_array_like() {
        let mut rt = Runtime::new();
        let ctor = ctor_value(&rt, TypedArrayKind::Int8);
        let view = rt.construct(&ctor, &[JsValue::Number(3.0)]).unwrap();
        let view = view.as_object().unwrap().clone();
        assert_eq!(rt.get(&view, "length").unwrap().as_number(), Some(3.0));
        assert_eq!(rt.get(&view, "byteLength").unwrap().as_number(), Some(3.0));

        let source = rt.create_object();
        {
            let mut s = source.borrow_mut();
            s.insert_value("length".to_string(), JsValue::Number(2.0));
            s.insert_value("0".to_string(), JsValue::Number(-1.0));
            s.insert_value("1".to_string(), JsValue::string("200"));
        }
        let copy = rt.construct(&ctor, &[JsValue::Object(source)]).unwrap();
        let copy = copy.as_object().unwrap().clone();
        assert_eq!(rt.get(&copy, "0").unwrap().as_number(), Some(-1.0));
        assert_eq!(rt.get(&copy, "1").unwrap().as_number(), Some(-56.0));
    }

    #[test]
    fn construct_over_buffer_validates_offset_and_length() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 8]);
        let buf = JsValue::Object(ab.object().clone());
        let ctor = ctor_value(&rt, TypedArrayKind::Uint32);
        let view = rt
            .construct(&ctor, &[buf.clone(), JsValue::Number(4.0)])
            .unwrap();
        let view = view.as_object().unwrap().clone();
        assert_eq!(rt.get(&view, "length").unwrap().as_number(), Some(1.0));
        assert_eq!(rt.get(&view, "byteOffset").unwrap().as_number(), Some(4.0));
        assert!(matches!(rt.get(&view, "buffer").unwrap(), JsValue::Object(b) if b == *ab.object()));

        let misaligned = rt.construct(&ctor, &[buf.clone(), JsValue::Number(2.0)]);
        assert!(misaligned.unwrap_err().is_range_error());
        let too_long = rt.construct(&ctor, &[buf.clone(), JsValue::Number(4.0), JsValue::Number(2.0)]);
        assert!(too_long.unwrap_err().is_range_error());
        ab.detach();
        assert!(rt.construct(&ctor, &[buf]).unwrap_err().is_type_error());
    }

    #[test]
    fn host_constructor_errors() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 6]);
        assert!(
            rt.new_typed_array(TypedArrayKind::Uint16, &ab, 1, None)
                .unwrap_err()
                .is_range_error()
        );
        assert!(
            rt.new_typed_array(TypedArrayKind::Uint32, &ab, 0, None)
                .unwrap_err()
                .is_range_error()
        );
        assert!(
            rt.new_typed_array(TypedArrayKind::Uint16, &ab, 8, None)
                .unwrap_err()
                .is_range_error()
        );
        let view = rt.new_typed_array(TypedArrayKind::Uint16, &ab, 2, None).unwrap();
        assert_eq!(rt.typed_array_info(&view).unwrap().length(), 2);
    }

    #[test]
    fn copies_between_content_types() {
        let mut rt = Runtime::new();
        let src = rt.typed_array_of(TypedArrayKind::Float64, &[JsValue::Number(1.5)]).unwrap();
        let ctor = ctor_value(&rt, TypedArrayKind::Uint8);
        let copy = rt.construct(&ctor, &[JsValue::Object(src.clone())]).unwrap();
        let copy = copy.as_object().unwrap().clone();
        assert_eq!(rt.get(&copy, "0").unwrap().as_number(), Some(1.0));

        let bigint_ctor = ctor_value(&rt, TypedArrayKind::BigInt64);
        assert!(rt.construct(&bigint_ctor, &[JsValue::Object(src)]).unwrap_err().is_type_error());
    }

    #[test]
    fn of_coerces_each_item() {
        let mut rt = Runtime::new();
        let ctor = ctor_value(&rt, TypedArrayKind::BigUint64);
        let of = rt.get(ctor.as_object().unwrap(), "of").unwrap();
        let view = rt
            .call_function(&of, &ctor, &[JsValue::string("5"), JsValue::Boolean(true)])
            .unwrap();
        let view = view.as_object().unwrap().clone();
        let five = JsBigInt { value: BigInt::from(5) };
        assert!(matches!(rt.get(&view, "0").unwrap(), JsValue::BigInt(b) if b == five));
        assert!(matches!(rt.get(&view, "1").unwrap(), JsValue::BigInt(b) if b.value == BigInt::from(1)));
        assert!(
            rt.call_function(&of, &ctor, &[JsValue::Number(1.0)])
                .unwrap_err()
                .is_type_error()
        );
        assert!(rt.call_function(&of, &JsValue::Undefined, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn views_start_with_default_constructor() {
        let mut rt = Runtime::new();
        let view = rt.typed_array_from_length(TypedArrayKind::Float32, 2).unwrap();
        let info = rt.typed_array_info(&view).unwrap();
        assert_eq!(
            info.default_ctor.as_ref(),
            rt.typed_array_kind_constructor(TypedArrayKind::Float32)
        );
        assert_eq!(view.borrow().class_name, "Float32Array");
        assert!(rt.typed_array_from_length(TypedArrayKind::Float64, usize::MAX).is_err());
    }
}
