//! The proxy handler trait
//!
//! A [`ProxyHandler`] supplies one trap per internal operation. Every trap
//! has a default that forwards the operation to the proxy target, so a
//! handler only overrides what it intercepts.

use crate::descriptor::PropertyDescriptor;
use crate::error::Result;
use crate::object::Object;
use crate::value::Value;
use membrane_types::PropertyKey;

/// Traps invoked by [`Object`] when the object is a proxy
///
/// `target` is always the proxy target the handler was created with. Results
/// are validated against it after each trap returns.
pub trait ProxyHandler: Send + Sync {
    fn get(&self, target: &Object, key: &PropertyKey, receiver: &Value) -> Result<Value> {
        target.get_with_receiver(key.clone(), receiver)
    }

    fn set(&self, target: &Object, key: &PropertyKey, value: Value, receiver: &Value) -> Result<bool> {
        target.set_with_receiver(key.clone(), value, receiver)
    }

    fn has(&self, target: &Object, key: &PropertyKey) -> Result<bool> {
        target.has(key.clone())
    }

    fn delete_property(&self, target: &Object, key: &PropertyKey) -> Result<bool> {
        target.delete(key.clone())
    }

    fn own_keys(&self, target: &Object) -> Result<Vec<PropertyKey>> {
        target.own_keys()
    }

    fn get_own_property_descriptor(
        &self,
        target: &Object,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>> {
        target.get_own_property_descriptor(key.clone())
    }

    fn define_property(&self, target: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Result<bool> {
        target.define_property(key.clone(), desc)
    }

    fn get_prototype_of(&self, target: &Object) -> Result<Option<Object>> {
        target.get_prototype_of()
    }

    fn set_prototype_of(&self, target: &Object, proto: Option<Object>) -> Result<bool> {
        target.set_prototype_of(proto)
    }

    fn is_extensible(&self, target: &Object) -> Result<bool> {
        target.is_extensible()
    }

    fn prevent_extensions(&self, target: &Object) -> Result<bool> {
        target.prevent_extensions()
    }

    fn apply(&self, target: &Object, this: &Value, args: &[Value]) -> Result<Value> {
        target.call(this, args)
    }

    fn construct(&self, target: &Object, args: &[Value]) -> Result<Value> {
        target.construct(args)
    }
}

/// A handler that intercepts nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct TransparentHandler;

impl ProxyHandler for TransparentHandler {}
