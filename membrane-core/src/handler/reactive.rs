//! Reactive policy
//!
//! Reads behave like the read-only policy but wrap reactively. Writes are
//! applied to the original and reported through `value_mutated`.

use super::base::{refused, Policy};
use membrane_object::{Object, PropertyDescriptor, ProxyHandler, Result, Value};
use membrane_types::{PropertyKey, ProxyKind};

const LENGTH: &str = "length";
const PROTO: &str = "__proto__";

#[derive(Debug)]
pub(crate) struct ReactiveHandler {
    policy: Policy,
}

impl ReactiveHandler {
    pub(crate) fn new(policy: Policy) -> Self {
        debug_assert_eq!(policy.kind, ProxyKind::Reactive);
        ReactiveHandler { policy }
    }

    fn original(&self) -> &Object {
        &self.policy.original
    }

    fn report(&self, key: &PropertyKey, value: &Value) {
        self.policy.membrane.report(self.original(), key, value);
    }
}

/// Does the shadow pin `key` so that no write may succeed?
fn pinned(shadow: &Object, key: &PropertyKey) -> Result<bool> {
    Ok(match shadow.get_own_property_descriptor(key.clone())? {
        Some(PropertyDescriptor::Data {
            writable: false,
            configurable: false,
            ..
        }) => true,
        Some(PropertyDescriptor::Accessor {
            set: None,
            configurable: false,
            ..
        }) => true,
        _ => false,
    })
}

impl ProxyHandler for ReactiveHandler {
    fn get(&self, _shadow: &Object, key: &PropertyKey, _receiver: &Value) -> Result<Value> {
        self.policy.get(key)
    }

    fn set(&self, shadow: &Object, key: &PropertyKey, value: Value, _receiver: &Value) -> Result<bool> {
        let original = self.original();
        let previous = original.get(key.clone())?;

        // Arrays report length writes even when the value did not move
        let forced = key.as_str() == Some(LENGTH) && original.is_array();
        if previous.same_value(&value) && !forced {
            return Ok(!pinned(shadow, key)?);
        }

        let stored = original.set(key.clone(), value.clone())?;
        if stored {
            self.report(key, &value);
        }
        Ok(stored)
    }

    fn has(&self, shadow: &Object, key: &PropertyKey) -> Result<bool> {
        self.policy.has(shadow, key)
    }

    fn delete_property(&self, shadow: &Object, key: &PropertyKey) -> Result<bool> {
        if !self.original().delete(key.clone())? {
            return Ok(false);
        }
        // The shadow may hold a copy from locking
        if !shadow.delete(key.clone())? {
            return Err(refused(key, "delete the record"));
        }
        self.report(key, &Value::Undefined);
        Ok(true)
    }

    fn own_keys(&self, shadow: &Object) -> Result<Vec<PropertyKey>> {
        self.policy.own_keys(shadow)
    }

    fn get_own_property_descriptor(
        &self,
        shadow: &Object,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>> {
        self.policy.get_own_property_descriptor(shadow, key)
    }

    fn define_property(&self, shadow: &Object, key: &PropertyKey, desc: PropertyDescriptor) -> Result<bool> {
        let membrane = &self.policy.membrane;
        let unwrapped = desc.map_value(|value| membrane.unwrap_reactive(&value));

        if !self.original().define_property(key.clone(), unwrapped.clone())? {
            return Ok(false);
        }

        if !unwrapped.is_configurable()
            && !shadow.define_property(key.clone(), self.policy.wrap_descriptor(unwrapped.clone()))?
        {
            return Err(refused(key, "mirror the definition"));
        }

        let value = unwrapped.value().cloned().unwrap_or_default();
        self.report(key, &value);
        Ok(true)
    }

    fn get_prototype_of(&self, _shadow: &Object) -> Result<Option<Object>> {
        self.policy.get_prototype_of()
    }

    fn set_prototype_of(&self, _shadow: &Object, proto: Option<Object>) -> Result<bool> {
        let changed = self.original().set_prototype_of(proto.clone())?;
        if changed {
            self.report(&PropertyKey::from(PROTO), &Value::from(proto));
        }
        Ok(changed)
    }

    fn is_extensible(&self, shadow: &Object) -> Result<bool> {
        self.policy.is_extensible(shadow)
    }

    fn prevent_extensions(&self, shadow: &Object) -> Result<bool> {
        if !self.original().prevent_extensions()? {
            return Ok(false);
        }
        self.policy.lock_shadow_target(shadow)?;
        Ok(true)
    }

    fn apply(&self, _shadow: &Object, _this: &Value, _args: &[Value]) -> Result<Value> {
        Ok(Value::Undefined)
    }

    fn construct(&self, _shadow: &Object, _args: &[Value]) -> Result<Value> {
        Ok(Value::Undefined)
    }
}
