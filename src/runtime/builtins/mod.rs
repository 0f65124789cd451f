use super::*;

mod arraybuffer;
mod dataview;
mod typedarray;

impl Runtime {
    pub(crate) fn define_getter(
        &mut self,
        target: &JsObject,
        name: &str,
        f: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) {
        let getter = self.native_fn(&format!("get {name}"), 0, f);
        target.borrow_mut().insert_property(
            name.to_string(),
            PropertyDescriptor::accessor(Some(getter), None, false, true),
        );
    }

    pub(crate) fn define_method(
        &mut self,
        target: &JsObject,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) {
        let method = self.native_fn(name, arity, f);
        target.borrow_mut().insert_builtin(name.to_string(), method);
    }

    /// A constructor that throws when called without `new`, linked to
    /// `proto` through `prototype` / `constructor`.
    pub(crate) fn create_constructor(
        &mut self,
        name: &str,
        arity: usize,
        proto: &JsObject,
        construct: impl Fn(&mut Runtime, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> JsObject {
        let requires_new = format!("Constructor {name} requires 'new'");
        let func = JsFunction::native(name, arity, move |_rt, _this, _args| {
            Completion::Throw(JsError::type_error(requires_new.clone()))
        })
        .with_construct(construct);
        let ctor = self.create_function_object(func);
        ctor.borrow_mut().insert_property(
            "prototype".to_string(),
            PropertyDescriptor::data(JsValue::Object(proto.clone()), false, false, false),
        );
        proto.borrow_mut().insert_property(
            "constructor".to_string(),
            PropertyDescriptor::data(JsValue::Object(ctor.clone()), true, false, true),
        );
        ctor
    }
}

/// `this` as an object carrying the given internal slot, or a TypeError.
pub(crate) fn this_object(
    this: &JsValue,
    has_slot: impl Fn(&JsObjectData) -> bool,
    what: &str,
) -> JsResult<JsObject> {
    match this {
        JsValue::Object(o) if has_slot(&o.borrow()) => Ok(o.clone()),
        _ => Err(JsError::type_error(format!("{this} is not {what}"))),
    }
}
