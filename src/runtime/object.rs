//! Internal-method dispatch. Integer-indexed exotic objects are routed to
//! `integer_indexed` before any ordinary algorithm runs.

use super::*;

impl Runtime {
    // [[GetOwnProperty]]
    pub fn get_own_property(&self, o: &JsObject, key: &str) -> Option<PropertyDescriptor> {
        if let Some(info) = self.typed_array_info(o) {
            return self.typed_array_get_own_property(o, &info, key);
        }
        o.borrow().get_own_property(key).cloned()
    }

    // [[DefineOwnProperty]]
    pub fn define_own_property(
        &mut self,
        o: &JsObject,
        key: &str,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        if let Some(info) = self.typed_array_info(o) {
            return self.typed_array_define_own_property(o, &info, key, desc);
        }
        Ok(o.borrow_mut().define_own_property(key.to_string(), desc))
    }

    // [[HasProperty]]
    pub fn has_property(&mut self, o: &JsObject, key: &str) -> JsResult<bool> {
        if let Some(info) = self.typed_array_info(o)
            && let Some(has) = Self::typed_array_has_property(&info, key)
        {
            return Ok(has);
        }
        self.ordinary_has_property(o, key)
    }

    // [[Get]] with the object itself as receiver
    pub fn get(&mut self, o: &JsObject, key: &str) -> JsResult<JsValue> {
        self.get_with_receiver(o, key, o)
    }

    pub fn get_with_receiver(
        &mut self,
        o: &JsObject,
        key: &str,
        receiver: &JsObject,
    ) -> JsResult<JsValue> {
        if let Some(info) = self.typed_array_info(o)
            && let Some(value) = Self::typed_array_get(&info, key)
        {
            return Ok(value);
        }
        self.ordinary_get(o, key, receiver)
    }

    /// Property read that also accepts a numeric key, as `view[1]` does.
    pub fn get_value(&mut self, o: &JsObject, key: &JsValue) -> JsResult<JsValue> {
        let key = self.to_property_key(key)?;
        self.get(o, &key)
    }

    // [[Set]] with the object itself as receiver
    pub fn set(&mut self, o: &JsObject, key: &str, value: JsValue) -> JsResult<bool> {
        self.set_with_receiver(o, key, value, o)
    }

    pub fn set_with_receiver(
        &mut self,
        o: &JsObject,
        key: &str,
        value: JsValue,
        receiver: &JsObject,
    ) -> JsResult<bool> {
        if let Some(info) = self.typed_array_info(o) {
            match canonical::classify_key(key) {
                canonical::KeyClass::Ordinary => {}
                canonical::KeyClass::Numeric(_) => return Ok(true),
                canonical::KeyClass::Index(idx) => {
                    if o.ptr_eq(receiver) {
                        self.typed_array_set_element(&info, idx, &value)?;
                        return Ok(true);
                    }
                    if !info.is_valid_index(idx) {
                        return Ok(true);
                    }
                }
            }
        }
        self.ordinary_set(o, key, value, receiver)
    }

    /// Assignment expression semantics: a failed [[Set]] throws in strict
    /// code and is ignored otherwise.
    pub fn put(&mut self, o: &JsObject, key: &str, value: JsValue, strict: bool) -> JsResult<()> {
        if !self.set(o, key, value)? && strict {
            return Err(JsError::type_error(format!(
                "Cannot assign to read only property '{key}'"
            )));
        }
        Ok(())
    }

    // [[Delete]]
    pub fn delete_property(&mut self, o: &JsObject, key: &str) -> bool {
        if let Some(info) = self.typed_array_info(o) {
            match canonical::classify_key(key) {
                canonical::KeyClass::Ordinary => {}
                canonical::KeyClass::Numeric(_) => return true,
                canonical::KeyClass::Index(idx) => return !info.is_valid_index(idx),
            }
        }
        o.borrow_mut().delete_own_property(key)
    }

    // [[OwnPropertyKeys]]
    pub fn own_property_keys(&self, o: &JsObject) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(info) = self.typed_array_info(o) {
            keys.extend((0..info.length()).map(index_key));
        }
        keys.extend(o.borrow().ordinary_own_keys());
        keys
    }

    // §7.3.8 DefinePropertyOrThrow
    pub fn define_property_or_throw(
        &mut self,
        o: &JsObject,
        key: &str,
        desc: PropertyDescriptor,
    ) -> JsResult<()> {
        if !self.define_own_property(o, key, desc)? {
            return Err(JsError::type_error(format!("Cannot redefine property: {key}")));
        }
        Ok(())
    }

    /// Boolean-reporting counterpart of [`Runtime::define_property_or_throw`].
    pub fn reflect_define_property(
        &mut self,
        o: &JsObject,
        key: &str,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        self.define_own_property(o, key, desc)
    }

    // §20.1.2.4 Object.defineProperty ( O, P, Attributes )
    pub fn object_define_property(
        &mut self,
        target: &JsValue,
        key: &JsValue,
        attributes: &JsValue,
    ) -> JsResult<JsValue> {
        let JsValue::Object(o) = target else {
            return Err(JsError::type_error("Object.defineProperty called on non-object"));
        };
        let key = self.to_property_key(key)?;
        let desc = self.to_property_descriptor(attributes)?;
        self.define_property_or_throw(o, &key, desc)?;
        Ok(target.clone())
    }

    // §28.1.3 Reflect.defineProperty ( target, propertyKey, attributes )
    pub fn reflect_define_property_value(
        &mut self,
        target: &JsValue,
        key: &JsValue,
        attributes: &JsValue,
    ) -> JsResult<bool> {
        let JsValue::Object(o) = target else {
            return Err(JsError::type_error("Reflect.defineProperty called on non-object"));
        };
        let key = self.to_property_key(key)?;
        let desc = self.to_property_descriptor(attributes)?;
        self.reflect_define_property(o, &key, desc)
    }

    // §6.2.6.5 ToPropertyDescriptor
    pub fn to_property_descriptor(&mut self, val: &JsValue) -> JsResult<PropertyDescriptor> {
        let JsValue::Object(d) = val else {
            return Err(JsError::type_error("Property description must be an object"));
        };
        let mut desc = PropertyDescriptor::default();
        if self.has_property(d, "enumerable")? {
            desc.enumerable = Some(helpers::to_boolean(&self.get(d, "enumerable")?));
        }
        if self.has_property(d, "configurable")? {
            desc.configurable = Some(helpers::to_boolean(&self.get(d, "configurable")?));
        }
        if self.has_property(d, "value")? {
            desc.value = Some(self.get(d, "value")?);
        }
        if self.has_property(d, "writable")? {
            desc.writable = Some(helpers::to_boolean(&self.get(d, "writable")?));
        }
        if self.has_property(d, "get")? {
            let getter = self.get(d, "get")?;
            if !getter.is_undefined() && !self.is_callable(&getter) {
                return Err(JsError::type_error(format!("Getter must be a function: {getter}")));
            }
            desc.get = Some(getter);
        }
        if self.has_property(d, "set")? {
            let setter = self.get(d, "set")?;
            if !setter.is_undefined() && !self.is_callable(&setter) {
                return Err(JsError::type_error(format!("Setter must be a function: {setter}")));
            }
            desc.set = Some(setter);
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(JsError::type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// Inverse of [`Runtime::to_property_descriptor`].
    pub fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            if let Some(ref v) = desc.value {
                o.insert_value("value".to_string(), v.clone());
            }
            if let Some(w) = desc.writable {
                o.insert_value("writable".to_string(), JsValue::Boolean(w));
            }
            if let Some(ref g) = desc.get {
                o.insert_value("get".to_string(), g.clone());
            }
            if let Some(ref s) = desc.set {
                o.insert_value("set".to_string(), s.clone());
            }
            if let Some(e) = desc.enumerable {
                o.insert_value("enumerable".to_string(), JsValue::Boolean(e));
            }
            if let Some(c) = desc.configurable {
                o.insert_value("configurable".to_string(), JsValue::Boolean(c));
            }
        }
        JsValue::Object(obj)
    }

    // §10.1.7.1 OrdinaryHasProperty
    fn ordinary_has_property(&mut self, o: &JsObject, key: &str) -> JsResult<bool> {
        if o.borrow().has_own_property(key) {
            return Ok(true);
        }
        let proto = o.borrow().prototype.clone();
        match proto {
            Some(p) => self.has_property(&p, key),
            None => Ok(false),
        }
    }

    // §10.1.8.1 OrdinaryGet
    fn ordinary_get(&mut self, o: &JsObject, key: &str, receiver: &JsObject) -> JsResult<JsValue> {
        let desc = o.borrow().get_own_property(key).cloned();
        let Some(desc) = desc else {
            let proto = o.borrow().prototype.clone();
            return match proto {
                Some(p) => self.get_with_receiver(&p, key, receiver),
                None => Ok(JsValue::Undefined),
            };
        };
        if desc.is_accessor_descriptor() {
            return match desc.get {
                Some(getter) if !getter.is_undefined() => {
                    self.call_function(&getter, &JsValue::Object(receiver.clone()), &[])
                }
                _ => Ok(JsValue::Undefined),
            };
        }
        Ok(desc.value.unwrap_or(JsValue::Undefined))
    }

    // §10.1.9.2 OrdinarySetWithOwnDescriptor
    fn ordinary_set(
        &mut self,
        o: &JsObject,
        key: &str,
        value: JsValue,
        receiver: &JsObject,
    ) -> JsResult<bool> {
        let own = o.borrow().get_own_property(key).cloned();
        let own = match own {
            Some(d) => d,
            None => {
                let proto = o.borrow().prototype.clone();
                if let Some(p) = proto {
                    return self.set_with_receiver(&p, key, value, receiver);
                }
                PropertyDescriptor::data_default(JsValue::Undefined)
            }
        };
        if own.is_data_descriptor() {
            if own.writable == Some(false) {
                return Ok(false);
            }
            return match self.get_own_property(receiver, key) {
                Some(existing) => {
                    if existing.is_accessor_descriptor() || existing.writable == Some(false) {
                        return Ok(false);
                    }
                    self.define_own_property(receiver, key, PropertyDescriptor::value_only(value))
                }
                None => {
                    self.define_own_property(receiver, key, PropertyDescriptor::data_default(value))
                }
            };
        }
        match own.set {
            Some(setter) if !setter.is_undefined() => {
                self.call_function(&setter, &JsValue::Object(receiver.clone()), &[value])?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
