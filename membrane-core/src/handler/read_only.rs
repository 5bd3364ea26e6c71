//! Read-only policy
//!
//! Reads are observed and wrapped read-only, so everything reachable through
//! the proxy is read-only too. Every write-family trap is refused.

use super::base::Policy;
use membrane_object::{Object, ObjectError, PropertyDescriptor, ProxyHandler, Result, Value};
use membrane_types::{Mutation, PropertyKey, ProxyKind};

#[derive(Debug)]
pub(crate) struct ReadOnlyHandler {
    policy: Policy,
}

impl ReadOnlyHandler {
    pub(crate) fn new(policy: Policy) -> Self {
        debug_assert_eq!(policy.kind, ProxyKind::ReadOnly);
        ReadOnlyHandler { policy }
    }

    /// Strict membranes raise, lenient ones report failure
    fn refuse(&self, mutation: Mutation) -> Result<bool> {
        let membrane = &self.policy.membrane;
        if membrane.is_strict() {
            return Err(ObjectError::invalid_mutation(mutation, &self.policy.original));
        }
        tracing::debug!(
            %mutation,
            original = %self.policy.original.id(),
            "refused mutation through read-only proxy"
        );
        membrane.record_rejected();
        Ok(false)
    }
}

impl ProxyHandler for ReadOnlyHandler {
    fn get(&self, _shadow: &Object, key: &PropertyKey, _receiver: &Value) -> Result<Value> {
        self.policy.get(key)
    }

    fn set(&self, _shadow: &Object, key: &PropertyKey, _value: Value, _receiver: &Value) -> Result<bool> {
        self.refuse(Mutation::Set(key.clone()))
    }

    fn has(&self, shadow: &Object, key: &PropertyKey) -> Result<bool> {
        self.policy.has(shadow, key)
    }

    fn delete_property(&self, _shadow: &Object, key: &PropertyKey) -> Result<bool> {
        self.refuse(Mutation::Delete(key.clone()))
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

    fn define_property(&self, _shadow: &Object, key: &PropertyKey, _desc: PropertyDescriptor) -> Result<bool> {
        self.refuse(Mutation::DefineProperty(key.clone()))
    }

    fn get_prototype_of(&self, _shadow: &Object) -> Result<Option<Object>> {
        self.policy.get_prototype_of()
    }

    fn set_prototype_of(&self, _shadow: &Object, _proto: Option<Object>) -> Result<bool> {
        self.refuse(Mutation::SetPrototypeOf)
    }

    fn is_extensible(&self, shadow: &Object) -> Result<bool> {
        self.policy.is_extensible(shadow)
    }

    fn prevent_extensions(&self, _shadow: &Object) -> Result<bool> {
        self.refuse(Mutation::PreventExtensions)
    }

    fn apply(&self, _shadow: &Object, _this: &Value, _args: &[Value]) -> Result<Value> {
        Ok(Value::Undefined)
    }

    fn construct(&self, _shadow: &Object, _args: &[Value]) -> Result<Value> {
        Ok(Value::Undefined)
    }
}
