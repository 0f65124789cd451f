use super::*;

const VIEW_KINDS: [TypedArrayKind; 10] = [
    TypedArrayKind::Int8,
    TypedArrayKind::Uint8,
    TypedArrayKind::Int16,
    TypedArrayKind::Uint16,
    TypedArrayKind::Int32,
    TypedArrayKind::Uint32,
    TypedArrayKind::Float32,
    TypedArrayKind::Float64,
    TypedArrayKind::BigInt64,
    TypedArrayKind::BigUint64,
];

fn this_data_view(this: &JsValue) -> JsResult<DataViewInfo> {
    match this {
        JsValue::Object(o) => o
            .borrow()
            .data_view_info
            .clone()
            .ok_or_else(|| JsError::type_error(format!("{this} is not a DataView"))),
        _ => Err(JsError::type_error(format!("{this} is not a DataView"))),
    }
}

impl Runtime {
    pub(crate) fn setup_dataview(&mut self) {
        let proto = self.create_object();
        proto.borrow_mut().class_name = "DataView".to_string();
        self.dataview_prototype = Some(proto.clone());

        self.define_getter(&proto, "buffer", |_rt, this, _args| {
            this_data_view(this).map(|dv| JsValue::Object(dv.buffer)).into()
        });
        self.define_getter(&proto, "byteLength", |_rt, this, _args| {
            this_data_view(this)
                .and_then(|dv| dv.view_byte_length())
                .map(|n| JsValue::Number(n as f64))
                .into()
        });
        self.define_getter(&proto, "byteOffset", |_rt, this, _args| {
            this_data_view(this)
                .and_then(|dv| {
                    if dv.is_out_of_bounds() {
                        return Err(JsError::type_error("DataView is out of bounds"));
                    }
                    Ok(JsValue::Number(dv.byte_offset as f64))
                })
                .into()
        });

        for kind in VIEW_KINDS {
            let short = kind.name().trim_end_matches("Array");
            self.define_method(&proto, &format!("get{short}"), 1, move |rt, this, args| {
                rt.data_view_get(kind, this, args).into()
            });
            self.define_method(&proto, &format!("set{short}"), 2, move |rt, this, args| {
                rt.data_view_set(kind, this, args).into()
            });
        }

        let ctor = self.create_constructor("DataView", 1, &proto, |rt, new_target, args| {
            rt.construct_data_view(new_target, args).into()
        });
        self.dataview_constructor = Some(ctor);
    }

    // §25.3.2.1 DataView ( buffer [ , byteOffset [ , byteLength ] ] )
    fn construct_data_view(&mut self, new_target: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let ab = ArrayBuffer::from_value(&arg(args, 0))?;
        let offset = self.to_index(&arg(args, 1))?;
        let length = match arg(args, 2) {
            JsValue::Undefined => None,
            len => Some(self.to_index(&len)?),
        };
        let proto = self.prototype_from_constructor(new_target, self.dataview_prototype.clone())?;
        self.data_view_on_buffer(proto, &ab, offset, length)
            .map(JsValue::Object)
    }

    fn data_view_on_buffer(
        &mut self,
        proto: Option<JsObject>,
        ab: &ArrayBuffer,
        byte_offset: usize,
        byte_length: Option<usize>,
    ) -> JsResult<JsObject> {
        if ab.is_detached() {
            return Err(JsError::type_error(
                "Cannot construct a DataView on a detached ArrayBuffer",
            ));
        }
        let buffer_len = ab.byte_length();
        if byte_offset > buffer_len {
            return Err(JsError::range_error(format!(
                "Start offset {byte_offset} is outside the bounds of the buffer"
            )));
        }
        let view_len = match byte_length {
            None => buffer_len - byte_offset,
            Some(len) if len <= buffer_len - byte_offset => len,
            Some(len) => {
                return Err(JsError::range_error(format!("Invalid DataView length {len}")));
            }
        };
        let mut data = JsObjectData::with_class("DataView");
        data.prototype = proto;
        data.data_view_info = Some(DataViewInfo::new(
            ab.object().clone(),
            ab.state().clone(),
            byte_offset,
            view_len,
        ));
        log::debug!("created DataView: offset {byte_offset}, length {view_len}");
        Ok(JsObject::new(data))
    }

    // §25.3.1.5 GetViewValue
    fn data_view_get(&mut self, kind: TypedArrayKind, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let dv = this_data_view(this)?;
        let index = self.to_index(&arg(args, 0))?;
        let little_endian = helpers::to_boolean(&arg(args, 1));
        dv.get_value(kind, index, little_endian)
    }

    // §25.3.1.6 SetViewValue
    fn data_view_set(&mut self, kind: TypedArrayKind, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let dv = this_data_view(this)?;
        let index = self.to_index(&arg(args, 0))?;
        let numeric = self.typed_array_coerce_value(kind, &arg(args, 1))?;
        let little_endian = helpers::to_boolean(&arg(args, 2));
        dv.set_value(kind, index, &numeric, little_endian)?;
        Ok(JsValue::Undefined)
    }

    /// A `DataView` over `buffer`; with no `byte_length` it extends to the end.
    pub fn new_data_view(
        &mut self,
        buffer: &ArrayBuffer,
        byte_offset: usize,
        byte_length: Option<usize>,
    ) -> JsResult<JsObject> {
        let proto = self.dataview_prototype.clone();
        self.data_view_on_buffer(proto, buffer, byte_offset, byte_length)
    }

    /// Host form of `view.getXxx(index, littleEndian)`.
    pub fn data_view_get_value(
        &self,
        view: &JsObject,
        kind: TypedArrayKind,
        index: usize,
        little_endian: bool,
    ) -> JsResult<JsValue> {
        let dv = this_data_view(&JsValue::Object(view.clone()))?;
        dv.get_value(kind, index, little_endian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_method(rt: &mut Runtime, view: &JsObject, name: &str, args: &[JsValue]) -> JsResult<JsValue> {
        let method = rt.get(view, name)?;
        rt.call_function(&method, &JsValue::Object(view.clone()), args)
    }

    #[test]
    fn methods_cover_every_element_type() {
        let rt = Runtime::new();
        let proto = rt.dataview_prototype().unwrap().clone();
        for name in ["getInt8", "setUint8", "getFloat32", "setBigUint64", "getBigInt64"] {
            assert!(proto.borrow().has_own_property(name), "{name}");
        }
        assert!(!proto.borrow().has_own_property("getUint8Clamped"));
    }

    #[test]
    fn get_and_set_default_to_big_endian() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 4]);
        let view = rt.new_data_view(&ab, 0, None).unwrap();
        call_method(&mut rt, &view, "setUint16", &[JsValue::Number(0.0), JsValue::Number(0x0102 as f64)])
            .unwrap();
        call_method(
            &mut rt,
            &view,
            "setUint16",
            &[JsValue::Number(2.0), JsValue::Number(0x0304 as f64), JsValue::Boolean(true)],
        )
        .unwrap();
        assert_eq!(ab.bytes(), vec![0x01, 0x02, 0x04, 0x03]);
        let le = call_method(&mut rt, &view, "getUint16", &[JsValue::Number(0.0), JsValue::Boolean(true)])
            .unwrap();
        assert_eq!(le.as_number(), Some(0x0201 as f64));
        let out = call_method(&mut rt, &view, "getUint32", &[JsValue::Number(1.0)]);
        assert!(out.unwrap_err().is_range_error());
    }

    #[test]
    fn constructor_checks_bounds() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 4]);
        let ctor = JsValue::Object(rt.dataview_constructor().unwrap().clone());
        let buf = JsValue::Object(ab.object().clone());
        let view = rt
            .construct(&ctor, &[buf.clone(), JsValue::Number(1.0), JsValue::Number(2.0)])
            .unwrap();
        let view = view.as_object().unwrap().clone();
        assert_eq!(rt.get(&view, "byteLength").unwrap().as_number(), Some(2.0));
        assert_eq!(rt.get(&view, "byteOffset").unwrap().as_number(), Some(1.0));
        let beyond = rt.construct(&ctor, &[buf.clone(), JsValue::Number(5.0)]);
        assert!(beyond.unwrap_err().is_range_error());
        let long = rt.construct(&ctor, &[buf.clone(), JsValue::Number(2.0), JsValue::Number(3.0)]);
        assert!(long.unwrap_err().is_range_error());
        assert!(rt.construct(&ctor, &[JsValue::Number(1.0)]).unwrap_err().is_type_error());
        ab.detach();
        assert!(rt.construct(&ctor, &[buf]).unwrap_err().is_type_error());
        assert!(rt.get(&view, "byteLength").unwrap_err().is_type_error());
    }

    #[test]
    fn detached_view_accessors_throw_type_error() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 8]);
        let view = rt.new_data_view(&ab, 0, None).unwrap();
        ab.detach();
        let bigint_from_number =
            call_method(&mut rt, &view, "setBigInt64", &[JsValue::Number(0.0), JsValue::Number(1.0)]);
        assert!(bigint_from_number.unwrap_err().is_type_error());
        let plain = call_method(&mut rt, &view, "setInt8", &[JsValue::Number(0.0), JsValue::Number(1.0)]);
        assert!(plain.unwrap_err().is_type_error());
        assert!(
            rt.data_view_get_value(&view, TypedArrayKind::Int8, 0, false)
                .unwrap_err()
                .is_type_error()
        );
    }
}
