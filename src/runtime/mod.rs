use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsValue, number_ops};

mod types;
pub use types::*;

pub mod buffer;
pub mod canonical;
pub mod memusage;
pub mod view;

mod builtins;
mod helpers;
mod integer_indexed;
mod object;

pub use buffer::{ArrayBuffer, BufferState};
pub use view::{DataViewInfo, TypedArrayInfo, TypedArrayKind};

/// A realm holding the binary-data intrinsics.
pub struct Runtime {
    object_prototype: Option<JsObject>,
    function_prototype: Option<JsObject>,
    arraybuffer_prototype: Option<JsObject>,
    arraybuffer_constructor: Option<JsObject>,
    typed_array_prototype: Option<JsObject>,
    typed_array_constructor: Option<JsObject>,
    typed_array_prototypes: Vec<JsObject>,
    typed_array_constructors: Vec<JsObject>,
    dataview_prototype: Option<JsObject>,
    dataview_constructor: Option<JsObject>,
}

impl Runtime {
    pub fn new() -> Self {
        let mut rt = Self {
            object_prototype: None,
            function_prototype: None,
            arraybuffer_prototype: None,
            arraybuffer_constructor: None,
            typed_array_prototype: None,
            typed_array_constructor: None,
            typed_array_prototypes: Vec::new(),
            typed_array_constructors: Vec::new(),
            dataview_prototype: None,
            dataview_constructor: None,
        };
        let object_proto = JsObject::new(JsObjectData::new());
        let mut function_proto_data = JsObjectData::with_class("Function");
        function_proto_data.prototype = Some(object_proto.clone());
        rt.object_prototype = Some(object_proto);
        rt.function_prototype = Some(JsObject::new(function_proto_data));
        rt.setup_globals();
        rt
    }

    fn setup_globals(&mut self) {
        self.setup_arraybuffer();
        self.setup_typed_array_base_prototype();
        self.setup_typed_array_constructors();
        self.setup_dataview();
    }

    pub fn object_prototype(&self) -> Option<&JsObject> {
        self.object_prototype.as_ref()
    }

    pub fn arraybuffer_prototype(&self) -> Option<&JsObject> {
        self.arraybuffer_prototype.as_ref()
    }

    pub fn arraybuffer_constructor(&self) -> Option<&JsObject> {
        self.arraybuffer_constructor.as_ref()
    }

    /// `%TypedArray%.prototype`, shared by every concrete kind.
    pub fn typed_array_prototype(&self) -> Option<&JsObject> {
        self.typed_array_prototype.as_ref()
    }

    /// The abstract `%TypedArray%` intrinsic.
    pub fn typed_array_constructor(&self) -> Option<&JsObject> {
        self.typed_array_constructor.as_ref()
    }

    pub fn typed_array_kind_prototype(&self, kind: TypedArrayKind) -> Option<&JsObject> {
        self.typed_array_prototypes.get(kind.index())
    }

    pub fn typed_array_kind_constructor(&self, kind: TypedArrayKind) -> Option<&JsObject> {
        self.typed_array_constructors.get(kind.index())
    }

    pub fn dataview_prototype(&self) -> Option<&JsObject> {
        self.dataview_prototype.as_ref()
    }

    pub fn dataview_constructor(&self) -> Option<&JsObject> {
        self.dataview_constructor.as_ref()
    }

    pub fn create_object(&mut self) -> JsObject {
        self.create_object_with_proto(self.object_prototype.clone())
    }

    pub fn create_object_with_proto(&mut self, proto: Option<JsObject>) -> JsObject {
        let mut data = JsObjectData::new();
        data.prototype = proto;
        JsObject::new(data)
    }

    pub fn create_function(&mut self, func: JsFunction) -> JsValue {
        JsValue::Object(self.create_function_object(func))
    }

    pub(crate) fn create_function_object(&mut self, func: JsFunction) -> JsObject {
        let mut data = JsObjectData::with_class("Function");
        data.prototype = self.function_prototype.clone();
        data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(func.arity as f64), false, false, true),
        );
        data.insert_property(
            "name".to_string(),
            PropertyDescriptor::data(
                JsValue::String(JsString::from_str(&func.name)),
                false,
                false,
                true,
            ),
        );
        data.callable = Some(func);
        JsObject::new(data)
    }

    pub(crate) fn native_fn(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> JsValue {
        self.create_function(JsFunction::native(name, arity, f))
    }

    pub fn is_callable(&self, val: &JsValue) -> bool {
        matches!(val, JsValue::Object(o) if o.borrow().callable.is_some())
    }

    pub fn is_constructor(&self, val: &JsValue) -> bool {
        matches!(val, JsValue::Object(o)
            if o.borrow().callable.as_ref().is_some_and(|f| f.construct.is_some()))
    }

    // §7.3.14 Call
    pub fn call_function(
        &mut self,
        func: &JsValue,
        this: &JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        let native = match func {
            JsValue::Object(o) => o.borrow().callable.as_ref().map(|f| f.call.clone()),
            _ => None,
        };
        match native {
            Some(f) => f(self, this, args).into_result(),
            None => Err(JsError::type_error(format!("{func} is not a function"))),
        }
    }

    // §7.3.15 Construct; new.target is always the constructor itself.
    pub fn construct(&mut self, ctor: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let native = match ctor {
            JsValue::Object(o) => o.borrow().callable.as_ref().and_then(|f| f.construct.clone()),
            _ => None,
        };
        match native {
            Some(f) => f(self, ctor, args).into_result(),
            None => Err(JsError::type_error(format!("{ctor} is not a constructor"))),
        }
    }

    /// Prototype for an object created by `new_target`, falling back to the
    /// intrinsic default (§10.1.14 GetPrototypeFromConstructor).
    pub(crate) fn prototype_from_constructor(
        &mut self,
        new_target: &JsValue,
        default: Option<JsObject>,
    ) -> JsResult<Option<JsObject>> {
        if let JsValue::Object(ctor) = new_target {
            let proto = self.get(ctor, "prototype")?;
            if let JsValue::Object(p) = proto {
                return Ok(Some(p));
            }
        }
        Ok(default)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

pub(crate) fn index_key(index: usize) -> String {
    number_ops::to_string(index as f64)
}
