// §10.4.5 TypedArray Exotic Objects
//
// Numeric keys never fall through to the prototype chain; every method
// below resolves them against the view itself or reports absence.

use super::canonical::{KeyClass, classify_key};
use super::*;

impl Runtime {
    pub(crate) fn typed_array_info(&self, o: &JsObject) -> Option<TypedArrayInfo> {
        o.borrow().typed_array_info.clone()
    }

    // §10.4.5.1 [[GetOwnProperty]]
    pub(crate) fn typed_array_get_own_property(
        &self,
        o: &JsObject,
        info: &TypedArrayInfo,
        key: &str,
    ) -> Option<PropertyDescriptor> {
        match classify_key(key) {
            KeyClass::Ordinary => o.borrow().get_own_property(key).cloned(),
            KeyClass::Numeric(_) => None,
            KeyClass::Index(idx) => info
                .get_element(idx)
                .map(|value| PropertyDescriptor::data(value, true, true, true)),
        }
    }

    // §10.4.5.2 [[HasProperty]]; `None` means the key is ordinary.
    pub(crate) fn typed_array_has_property(info: &TypedArrayInfo, key: &str) -> Option<bool> {
        match classify_key(key) {
            KeyClass::Ordinary => None,
            KeyClass::Numeric(_) => Some(false),
            KeyClass::Index(idx) => Some(info.is_valid_index(idx)),
        }
    }

    // §10.4.5.4 [[Get]]; `None` means the key is ordinary.
    pub(crate) fn typed_array_get(info: &TypedArrayInfo, key: &str) -> Option<JsValue> {
        match classify_key(key) {
            KeyClass::Ordinary => None,
            KeyClass::Numeric(_) => Some(JsValue::Undefined),
            KeyClass::Index(idx) => Some(info.get_element(idx).unwrap_or(JsValue::Undefined)),
        }
    }

    // §10.4.5.3 [[DefineOwnProperty]]
    pub(crate) fn typed_array_define_own_property(
        &mut self,
        o: &JsObject,
        info: &TypedArrayInfo,
        key: &str,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        let idx = match classify_key(key) {
            KeyClass::Ordinary => {
                return Ok(o.borrow_mut().define_own_property(key.to_string(), desc));
            }
            KeyClass::Numeric(_) => return Ok(false),
            KeyClass::Index(idx) => idx,
        };
        if !info.is_valid_index(idx) {
            return Ok(false);
        }
        if desc.configurable == Some(false)
            || desc.enumerable == Some(false)
            || desc.is_accessor_descriptor()
            || desc.writable == Some(false)
        {
            return Ok(false);
        }
        if let Some(value) = desc.value {
            self.typed_array_set_element(info, idx, &value)?;
        }
        Ok(true)
    }

    // §10.4.5.16 TypedArraySetElement
    //
    // The value is only coerced once the index is known to address a live
    // element; a detached or shrunk buffer turns the write into a no-op.
    pub(crate) fn typed_array_set_element(
        &mut self,
        info: &TypedArrayInfo,
        idx: u64,
        value: &JsValue,
    ) -> JsResult<()> {
        if !info.is_valid_index(idx) {
            return Ok(());
        }
        let numeric = self.typed_array_coerce_value(info.kind, value)?;
        info.set_element(idx, &numeric);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint8_view(rt: &mut Runtime, bytes: Vec<u8>) -> JsObject {
        let len = bytes.len();
        let buffer = rt.new_array_buffer(bytes);
        rt.new_typed_array(TypedArrayKind::Uint8, &buffer, 0, Some(len))
            .unwrap()
    }

    fn throwing_value_of(rt: &mut Runtime) -> JsValue {
        let obj = rt.create_object();
        let f = rt.native_fn("valueOf", 0, |_, _, _| {
            Completion::Throw(JsError::Throw(JsValue::string("coerced")))
        });
        obj.borrow_mut().insert_builtin("valueOf".to_string(), f);
        JsValue::Object(obj)
    }

    #[test]
    fn numeric_non_index_keys_are_absent() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![1, 2]);
        for key in ["-0", "1.5", "-1", "NaN", "Infinity", "2"] {
            assert!(rt.get_own_property(&view, key).is_none(), "{key}");
            assert!(!rt.has_property(&view, key).unwrap(), "{key}");
            assert!(rt.get(&view, key).unwrap().is_undefined(), "{key}");
        }
    }

    #[test]
    fn element_descriptor_is_fully_permissive() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![9]);
        let desc = rt.get_own_property(&view, "0").unwrap();
        assert_eq!(desc.value.and_then(|v| v.as_number()), Some(9.0));
        assert_eq!(desc.writable, Some(true));
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn define_rejects_restrictive_attributes() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![0; 2]);
        let frozen = PropertyDescriptor {
            writable: Some(false),
            ..PropertyDescriptor::value_only(JsValue::Number(1.0))
        };
        assert!(!rt.reflect_define_property(&view, "0", frozen).unwrap());
        let accessor = PropertyDescriptor::accessor(None, None, true, true);
        assert!(!rt.reflect_define_property(&view, "0", accessor).unwrap());
        let value = PropertyDescriptor::value_only(JsValue::Number(300.0));
        assert!(rt.reflect_define_property(&view, "1", value).unwrap());
        assert_eq!(rt.get(&view, "1").unwrap().as_number(), Some(44.0));
        assert!(rt.get(&view, "0").unwrap().as_number() == Some(0.0));
    }

    #[test]
    fn out_of_range_define_fails_before_coercion() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![0; 2]);
        let thrower = throwing_value_of(&mut rt);
        let desc = PropertyDescriptor::value_only(thrower.clone());
        assert!(!rt.reflect_define_property(&view, "5", desc.clone()).unwrap());
        assert!(rt.reflect_define_property(&view, "0", desc).is_err());
    }

    #[test]
    fn set_coerces_only_live_elements() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![0; 2]);
        let thrower = throwing_value_of(&mut rt);
        assert!(rt.set(&view, "7", thrower.clone()).unwrap());
        assert!(rt.set(&view, "1.5", thrower.clone()).unwrap());
        assert!(rt.set(&view, "0", thrower).is_err());
    }

    #[test]
    fn delete_of_live_element_fails() {
        let mut rt = Runtime::new();
        let view = uint8_view(&mut rt, vec![0; 2]);
        assert!(!rt.delete_property(&view, "0"));
        assert!(rt.delete_property(&view, "2"));
        assert!(rt.delete_property(&view, "-0"));
        view.borrow_mut()
            .insert_value("tag".to_string(), JsValue::Boolean(true));
        assert!(rt.delete_property(&view, "tag"));
        assert!(!rt.has_property(&view, "tag").unwrap());
    }
}
