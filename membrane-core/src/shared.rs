//! Marker slot, unwrapping, and shadow targets

use membrane_object::{NativeFunction, Object, ObjectClass, Value};
use membrane_types::{PropertyKey, Symbol};
use once_cell::sync::Lazy;

/// Key answered by every membrane proxy with its original object
///
/// Never handed out, so no other code can forge or observe it.
static TARGET_SLOT: Lazy<PropertyKey> =
    Lazy::new(|| PropertyKey::Symbol(Symbol::new("@@membraneTargetSlot")));

pub(crate) fn target_slot() -> &'static PropertyKey {
    &TARGET_SLOT
}

pub(crate) fn is_target_slot(key: &PropertyKey) -> bool {
    key == target_slot()
}

/// The original behind a membrane proxy, or `obj` itself
///
/// Only proxies are asked for the marker. A proxy that was not built by a
/// membrane (or whose trap fails) reads as its own original.
pub(crate) fn unwrap_object(obj: &Object) -> Object {
    if !obj.is_proxy() {
        return obj.clone();
    }
    match obj.get(target_slot().clone()) {
        Ok(Value::Object(original)) => original,
        _ => obj.clone(),
    }
}

pub(crate) fn unwrap_value(value: &Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(unwrap_object(obj)),
        other => other.clone(),
    }
}

/// A fresh, empty target matching the original's kind
///
/// Arrays get an array shadow and callables a function shadow so that
/// `is_array`/`is_callable` answer the same through the proxy.
pub(crate) fn create_shadow_target(original: &Object) -> Object {
    let class = if original.is_array() {
        ObjectClass::Array
    } else if original.is_callable() {
        let function = NativeFunction::noop();
        if original.is_constructor() {
            ObjectClass::Function(function.into_constructor())
        } else {
            ObjectClass::Function(function)
        }
    } else {
        ObjectClass::Plain
    };
    Object::bare(class)
}

/// Default observability: everything but opaque host objects
pub(crate) fn default_value_is_observable(obj: &Object) -> bool {
    !obj.is_host()
}
