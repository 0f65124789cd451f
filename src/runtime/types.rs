use super::Runtime;
use super::buffer::BufferState;
use super::view::{DataViewInfo, TypedArrayInfo};
use crate::error::JsError;
use crate::types::{JsValue, same_value};
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug)]
pub enum Completion {
    Normal(JsValue),
    Throw(JsError),
}

impl Completion {
    pub fn into_result(self) -> Result<JsValue, JsError> {
        match self {
            Completion::Normal(v) => Ok(v),
            Completion::Throw(e) => Err(e),
        }
    }
}

impl From<Result<JsValue, JsError>> for Completion {
    fn from(r: Result<JsValue, JsError>) -> Self {
        match r {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub struct JsFunction {
    pub name: String,
    pub arity: usize,
    pub(crate) call: NativeFn,
    /// Construct behaviour; `None` means the function is not a constructor.
    pub(crate) construct: Option<NativeFn>,
}

impl JsFunction {
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            call: Rc::new(f),
            construct: None,
        }
    }

    pub fn with_construct(
        mut self,
        f: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        self.construct = Some(Rc::new(f));
        self
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JsFunction::Native({:?}, {})", self.name, self.arity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    /// A partial descriptor carrying only `[[Value]]`.
    pub fn value_only(value: JsValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn accessor(
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value: None,
            writable: None,
            get,
            set,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    fn is_empty(&self) -> bool {
        self.is_generic_descriptor() && self.enumerable.is_none() && self.configurable.is_none()
    }
}

pub struct JsObjectData {
    pub properties: FxHashMap<String, PropertyDescriptor>,
    pub property_order: Vec<String>,
    pub prototype: Option<crate::types::JsObject>,
    pub callable: Option<JsFunction>,
    pub class_name: String,
    pub extensible: bool,
    pub array_buffer: Option<Rc<BufferState>>,
    pub typed_array_info: Option<TypedArrayInfo>,
    pub data_view_info: Option<DataViewInfo>,
}

impl JsObjectData {
    pub fn new() -> Self {
        Self {
            properties: FxHashMap::default(),
            property_order: Vec::new(),
            prototype: None,
            callable: None,
            class_name: "Object".to_string(),
            extensible: true,
            array_buffer: None,
            typed_array_info: None,
            data_view_info: None,
        }
    }

    pub fn with_class(class_name: &str) -> Self {
        let mut data = Self::new();
        data.class_name = class_name.to_string();
        data
    }

    pub fn get_own_property(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    // §10.1.6.3 ValidateAndApplyPropertyDescriptor
    pub fn define_own_property(&mut self, key: String, desc: PropertyDescriptor) -> bool {
        let Some(current) = self.properties.get(&key) else {
            if !self.extensible {
                return false;
            }
            let complete = if desc.is_accessor_descriptor() {
                PropertyDescriptor::accessor(
                    Some(desc.get.unwrap_or(JsValue::Undefined)),
                    Some(desc.set.unwrap_or(JsValue::Undefined)),
                    desc.enumerable.unwrap_or(false),
                    desc.configurable.unwrap_or(false),
                )
            } else {
                PropertyDescriptor::data(
                    desc.value.unwrap_or(JsValue::Undefined),
                    desc.writable.unwrap_or(false),
                    desc.enumerable.unwrap_or(false),
                    desc.configurable.unwrap_or(false),
                )
            };
            self.insert_property(key, complete);
            return true;
        };

        if desc.is_empty() {
            return true;
        }

        if current.configurable == Some(false) {
            if desc.configurable == Some(true) {
                return false;
            }
            if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
                return false;
            }
            if !desc.is_generic_descriptor()
                && desc.is_accessor_descriptor() != current.is_accessor_descriptor()
            {
                return false;
            }
            if current.is_accessor_descriptor() {
                if let Some(ref g) = desc.get
                    && !same_value(g, current.get.as_ref().unwrap_or(&JsValue::Undefined))
                {
                    return false;
                }
                if let Some(ref s) = desc.set
                    && !same_value(s, current.set.as_ref().unwrap_or(&JsValue::Undefined))
                {
                    return false;
                }
            } else if current.writable == Some(false) {
                if desc.writable == Some(true) {
                    return false;
                }
                if let Some(ref v) = desc.value
                    && !same_value(v, current.value.as_ref().unwrap_or(&JsValue::Undefined))
                {
                    return false;
                }
            }
        }

        let current = current.clone();
        let merged = if desc.is_accessor_descriptor() && current.is_data_descriptor() {
            PropertyDescriptor::accessor(
                Some(desc.get.unwrap_or(JsValue::Undefined)),
                Some(desc.set.unwrap_or(JsValue::Undefined)),
                desc.enumerable.or(current.enumerable).unwrap_or(false),
                desc.configurable.or(current.configurable).unwrap_or(false),
            )
        } else if desc.is_data_descriptor() && current.is_accessor_descriptor() {
            PropertyDescriptor::data(
                desc.value.unwrap_or(JsValue::Undefined),
                desc.writable.unwrap_or(false),
                desc.enumerable.or(current.enumerable).unwrap_or(false),
                desc.configurable.or(current.configurable).unwrap_or(false),
            )
        } else {
            PropertyDescriptor {
                value: desc.value.or(current.value),
                writable: desc.writable.or(current.writable),
                get: desc.get.or(current.get),
                set: desc.set.or(current.set),
                enumerable: desc.enumerable.or(current.enumerable),
                configurable: desc.configurable.or(current.configurable),
            }
        };
        self.properties.insert(key, merged);
        true
    }

    pub fn insert_value(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data_default(value));
    }

    pub fn insert_builtin(&mut self, key: String, value: JsValue) {
        self.insert_property(key, PropertyDescriptor::data(value, true, false, true));
    }

    pub fn insert_property(&mut self, key: String, desc: PropertyDescriptor) {
        if !self.properties.contains_key(&key) {
            self.property_order.push(key.clone());
        }
        self.properties.insert(key, desc);
    }

    // §10.1.10.1 OrdinaryDelete
    pub fn delete_own_property(&mut self, key: &str) -> bool {
        match self.properties.get(key) {
            None => true,
            Some(desc) if desc.configurable == Some(true) => {
                self.properties.remove(key);
                self.property_order.retain(|k| k != key);
                true
            }
            Some(_) => false,
        }
    }

    /// Own string keys in insertion order.
    pub fn ordinary_own_keys(&self) -> Vec<String> {
        self.property_order.clone()
    }
}

impl Default for JsObjectData {
    fn default() -> Self {
        Self::new()
    }
}
