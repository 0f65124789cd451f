use super::*;
use std::rc::Rc;

fn this_array_buffer(this: &JsValue) -> JsResult<ArrayBuffer> {
    let obj = this_object(this, |o| o.array_buffer.is_some(), "an ArrayBuffer")?;
    ArrayBuffer::from_object(&obj).ok_or_else(|| JsError::type_error("not an ArrayBuffer"))
}

// Relative start/end arguments of §25.1.6.7 step 6..10.
fn relative_bound(rt: &mut Runtime, val: &JsValue, len: usize, default: usize) -> JsResult<usize> {
    if val.is_undefined() {
        return Ok(default);
    }
    let rel = helpers::to_integer_or_infinity(rt.to_number_value(val)?);
    let len = len as f64;
    let bound = if rel < 0.0 { (len + rel).max(0.0) } else { rel.min(len) };
    Ok(bound as usize)
}

impl Runtime {
    pub(crate) fn setup_arraybuffer(&mut self) {
        let proto = self.create_object();
        proto.borrow_mut().class_name = "ArrayBuffer".to_string();
        self.arraybuffer_prototype = Some(proto.clone());

        self.define_getter(&proto, "byteLength", |_rt, this, _args| {
            this_array_buffer(this)
                .map(|ab| JsValue::Number(ab.byte_length() as f64))
                .into()
        });
        self.define_getter(&proto, "detached", |_rt, this, _args| {
            this_array_buffer(this)
                .map(|ab| JsValue::Boolean(ab.is_detached()))
                .into()
        });
        self.define_method(&proto, "slice", 2, |rt, this, args| {
            rt.array_buffer_slice(this, args).into()
        });

        let ctor = self.create_constructor("ArrayBuffer", 1, &proto, |rt, new_target, args| {
            rt.construct_array_buffer(new_target, args).into()
        });
        self.define_method(&ctor, "isView", 1, |_rt, _this, args| {
            let is_view = matches!(arg(args, 0), JsValue::Object(ref o)
                if o.borrow().typed_array_info.is_some() || o.borrow().data_view_info.is_some());
            Completion::Normal(JsValue::Boolean(is_view))
        });
        self.arraybuffer_constructor = Some(ctor);
    }

    // §25.1.4.1 ArrayBuffer ( length )
    fn construct_array_buffer(&mut self, new_target: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let byte_length = self.to_index(&arg(args, 0))?;
        let proto = self.prototype_from_constructor(new_target, self.arraybuffer_prototype.clone())?;
        let ab = self.allocate_array_buffer(proto, BufferState::zeroed(byte_length)?);
        Ok(JsValue::Object(ab.object().clone()))
    }

    // §25.1.6.7 ArrayBuffer.prototype.slice ( start, end )
    fn array_buffer_slice(&mut self, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let ab = this_array_buffer(this)?;
        if ab.is_detached() {
            return Err(JsError::type_error("Cannot slice a detached ArrayBuffer"));
        }
        let len = ab.byte_length();
        let first = relative_bound(self, &arg(args, 0), len, 0)?;
        let last = relative_bound(self, &arg(args, 1), len, len)?;
        // Coercing the bounds may have run user code that detached the buffer.
        if ab.is_detached() {
            return Err(JsError::type_error("Cannot slice a detached ArrayBuffer"));
        }
        let copy = ab.state().slice(first, last.max(first));
        let result = self.new_array_buffer(copy);
        Ok(JsValue::Object(result.object().clone()))
    }

    pub(crate) fn allocate_array_buffer(
        &mut self,
        proto: Option<JsObject>,
        state: Rc<BufferState>,
    ) -> ArrayBuffer {
        let mut data = JsObjectData::with_class("ArrayBuffer");
        data.prototype = proto;
        data.array_buffer = Some(state.clone());
        let object = JsObject::new(data);
        log::trace!("allocated array buffer of {} bytes", state.byte_length());
        ArrayBuffer::from_state(object, state)
    }

    /// Wraps `bytes` in a fresh `ArrayBuffer` object of this realm.
    pub fn new_array_buffer(&mut self, bytes: Vec<u8>) -> ArrayBuffer {
        self.allocate_array_buffer(self.arraybuffer_prototype.clone(), BufferState::new(bytes))
    }

    /// The buffer viewed by a typed array or `DataView`.
    pub fn view_buffer(&self, view: &JsObject) -> Option<ArrayBuffer> {
        let data = view.borrow();
        if let Some(ref info) = data.typed_array_info {
            return Some(ArrayBuffer::from_state(info.buffer.clone(), info.state.clone()));
        }
        data.data_view_info
            .as_ref()
            .map(|dv| ArrayBuffer::from_state(dv.buffer.clone(), dv.state.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_allocates_zeroed_storage() {
        let mut rt = Runtime::new();
        let ctor = JsValue::Object(rt.arraybuffer_constructor().unwrap().clone());
        let ab = rt.construct(&ctor, &[JsValue::Number(4.0)]).unwrap();
        let ab = ArrayBuffer::from_value(&ab).unwrap();
        assert_eq!(ab.bytes(), vec![0; 4]);
        assert!(
            rt.construct(&ctor, &[JsValue::Number(-1.0)])
                .unwrap_err()
                .is_range_error()
        );
        assert!(rt.call_function(&ctor, &JsValue::Undefined, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn unallocatable_length_is_a_range_error() {
        let mut rt = Runtime::new();
        let ctor = JsValue::Object(rt.arraybuffer_constructor().unwrap().clone());
        let max_index = JsValue::Number(number_ops::MAX_SAFE_INTEGER);
        assert!(rt.construct(&ctor, &[max_index]).unwrap_err().is_range_error());
    }

    #[test]
    fn getters_observe_detachment() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![1, 2, 3]);
        let obj = ab.object().clone();
        assert_eq!(rt.get(&obj, "byteLength").unwrap().as_number(), Some(3.0));
        assert!(matches!(rt.get(&obj, "detached").unwrap(), JsValue::Boolean(false)));
        assert!(ab.detach());
        assert_eq!(rt.get(&obj, "byteLength").unwrap().as_number(), Some(0.0));
        assert!(matches!(rt.get(&obj, "detached").unwrap(), JsValue::Boolean(true)));
    }

    #[test]
    fn slice_copies_relative_range() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![1, 2, 3, 4, 5]);
        let slice = rt.get(ab.object(), "slice").unwrap();
        let this = JsValue::Object(ab.object().clone());
        let copy = rt
            .call_function(&slice, &this, &[JsValue::Number(1.0), JsValue::Number(-1.0)])
            .unwrap();
        assert_eq!(ArrayBuffer::from_value(&copy).unwrap().bytes(), vec![2, 3, 4]);
        ab.detach();
        assert!(rt.call_function(&slice, &this, &[]).unwrap_err().is_type_error());
    }

    #[test]
    fn is_view_recognises_views_only() {
        let mut rt = Runtime::new();
        let ab = rt.new_array_buffer(vec![0; 4]);
        let ctor = rt.arraybuffer_constructor().unwrap().clone();
        let is_view = rt.get(&ctor, "isView").unwrap();
        let view = rt.new_data_view(&ab, 0, None).unwrap();
        let this = JsValue::Undefined;
        let yes = rt.call_function(&is_view, &this, &[JsValue::Object(view)]).unwrap();
        let no = rt
            .call_function(&is_view, &this, &[JsValue::Object(ab.object().clone())])
            .unwrap();
        assert!(matches!(yes, JsValue::Boolean(true)));
        assert!(matches!(no, JsValue::Boolean(false)));
    }
}
