//! Read traps shared by both policies
//!
//! A [`Policy`] binds one original object to the membrane that wrapped it.
//! The read side (get, has, keys, descriptors, prototype, extensibility) is
//! the same for both proxy kinds; only the wrapper applied to values leaving
//! the original differs.

use crate::membrane::Membrane;
use crate::shared;
use membrane_object::{Object, ObjectError, PropertyDescriptor, Result, Value};
use membrane_types::{PropertyKey, ProxyKind};

/// State held by every proxy handler
#[derive(Debug, Clone)]
pub(crate) struct Policy {
    pub(crate) membrane: Membrane,
    pub(crate) original: Object,
    pub(crate) kind: ProxyKind,
}

impl Policy {
    pub(crate) fn new(membrane: Membrane, original: Object, kind: ProxyKind) -> Self {
        Policy {
            membrane,
            original,
            kind,
        }
    }

    /// Wrap a value leaving the original with this policy's kind
    pub(crate) fn wrap(&self, value: &Value) -> Value {
        self.membrane.wrap(self.kind, value)
    }

    pub(crate) fn wrap_descriptor(&self, desc: PropertyDescriptor) -> PropertyDescriptor {
        desc.map_value(|value| self.wrap(&value))
    }

    pub(crate) fn get(&self, key: &PropertyKey) -> Result<Value> {
        if shared::is_target_slot(key) {
            return Ok(Value::Object(self.original.clone()));
        }
        let value = self.original.get(key.clone())?;
        self.membrane.observe(&self.original, key);
        Ok(self.wrap(&value))
    }

    pub(crate) fn has(&self, shadow: &Object, key: &PropertyKey) -> Result<bool> {
        self.membrane.observe(&self.original, key);
        let found = self.original.has(key.clone())?;
        if !found {
            self.forget_stale(shadow, key)?;
        }
        Ok(found)
    }

    /// The original's own string keys followed by its own symbol keys
    pub(crate) fn own_keys(&self, shadow: &Object) -> Result<Vec<PropertyKey>> {
        let (symbols, mut keys): (Vec<PropertyKey>, Vec<PropertyKey>) = self
            .original
            .own_keys()?
            .into_iter()
            .partition(PropertyKey::is_symbol);
        keys.extend(symbols);

        // A locked shadow must report exactly the original's keys
        if !shadow.is_extensible()? {
            for recorded in shadow.own_keys()? {
                if !keys.contains(&recorded) {
                    self.forget_stale(shadow, &recorded)?;
                }
            }
        }
        Ok(keys)
    }

    /// Drop a configurable shadow record for a key the original no longer has
    fn forget_stale(&self, shadow: &Object, key: &PropertyKey) -> Result<()> {
        let Some(record) = shadow.get_own_property_descriptor(key.clone())? else {
            return Ok(());
        };
        if record.is_configurable() && !shadow.delete(key.clone())? {
            return Err(refused(key, "drop a stale record"));
        }
        Ok(())
    }

    /// The original's descriptor with its value wrapped
    ///
    /// Non-configurable descriptors are copied onto the shadow so the proxy
    /// may report them. Once the shadow holds a frozen record it is returned
    /// as is; writable records are refreshed with the current value.
    pub(crate) fn get_own_property_descriptor(
        &self,
        shadow: &Object,
        key: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>> {
        self.membrane.observe(&self.original, key);

        let Some(desc) = self.original.get_own_property_descriptor(key.clone())? else {
            self.forget_stale(shadow, key)?;
            return Ok(None);
        };

        let recorded = shadow.get_own_property_descriptor(key.clone())?;
        if let Some(record) = &recorded {
            if !record.is_configurable() && !record.is_writable() {
                return Ok(recorded);
            }
        }

        let wrapped = self.wrap_descriptor(desc);
        if (!wrapped.is_configurable() || recorded.is_some())
            && !shadow.define_property(key.clone(), wrapped.clone())?
        {
            return Err(refused(key, "record the descriptor"));
        }
        Ok(Some(wrapped))
    }

    pub(crate) fn get_prototype_of(&self) -> Result<Option<Object>> {
        self.original.get_prototype_of()
    }

    pub(crate) fn is_extensible(&self, shadow: &Object) -> Result<bool> {
        if !shadow.is_extensible()? {
            return Ok(false);
        }
        if !self.original.is_extensible()? {
            self.lock_shadow_target(shadow)?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Copy every own descriptor and the prototype of the original onto the
    /// shadow, then make the shadow non-extensible
    pub(crate) fn lock_shadow_target(&self, shadow: &Object) -> Result<()> {
        for key in self.original.own_keys()? {
            let Some(desc) = self.original.get_own_property_descriptor(key.clone())? else {
                continue;
            };
            if !shadow.define_property(key.clone(), self.wrap_descriptor(desc))? {
                return Err(refused(&key, "lock the descriptor"));
            }
        }
        if !shadow.set_prototype_of(self.original.get_prototype_of()?)? {
            return Err(ObjectError::InvariantViolation(
                "shadow target refused to align its prototype".to_string(),
            ));
        }
        shadow.prevent_extensions()?;
        Ok(())
    }
}

/// The shadow target rejected a write needed to stay consistent
pub(crate) fn refused(key: &PropertyKey, action: &str) -> ObjectError {
    ObjectError::InvariantViolation(format!("shadow target refused to {action} for {key}"))
}

#[cfg(test)]
mod tests {
    use crate::{Membrane, MembraneOptions};
    use membrane_object::{Object, ObjectError, PropertyDescriptor, ProxyHandler, Result, Value};
    use membrane_types::{PropertyKey, Symbol};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn read_only(membrane: &Membrane, obj: &Object) -> Object {
        membrane
            .get_read_only_proxy(&Value::from(obj))
            .into_object()
            .expect("wrappable")
    }

    #[test]
    fn test_locked_shadow_follows_direct_deletes() {
        let membrane = Membrane::new(MembraneOptions::default().strict(true));
        let original = Object::from_entries([("a", 1), ("b", 2)]);
        let proxy = read_only(&membrane, &original);

        original.prevent_extensions().unwrap();
        assert!(!proxy.is_extensible().unwrap());
        assert!(original.delete("a").unwrap());

        assert_eq!(proxy.own_property_names().unwrap(), vec!["b"]);
        assert_eq!(proxy.get_own_property_descriptor("a").unwrap(), None);
        assert!(!proxy.has("a").unwrap());
        assert_eq!(proxy.get("b").unwrap(), Value::from(2));
    }

    #[test]
    fn test_stale_descriptor_dropped_before_keys_are_listed() {
        let membrane = Membrane::new(MembraneOptions::default().strict(true));
        let original = Object::from_entries([("a", 1)]);
        let proxy = read_only(&membrane, &original);

        original.prevent_extensions().unwrap();
        assert!(!proxy.is_extensible().unwrap());
        assert!(original.delete("a").unwrap());

        // Descriptor lookup before the key listing
        assert_eq!(proxy.get_own_property_descriptor("a").unwrap(), None);
        assert!(proxy.own_keys().unwrap().is_empty());
    }

    /// Lists symbols ahead of strings
    struct SymbolsFirst;

    impl ProxyHandler for SymbolsFirst {
        fn own_keys(&self, target: &Object) -> Result<Vec<PropertyKey>> {
            let (strings, mut keys): (Vec<PropertyKey>, Vec<PropertyKey>) = target
                .own_keys()?
                .into_iter()
                .partition(|key| !key.is_symbol());
            keys.extend(strings);
            Ok(keys)
        }
    }

    #[test]
    fn test_own_keys_lists_strings_before_symbols() {
        let membrane = Membrane::default();
        let sym = Symbol::new("s");
        let target = Object::from_entries([("a", 1)]);
        target.set(sym.clone(), 2).unwrap();
        let foreign = Object::new_proxy(target, Arc::new(SymbolsFirst));
        assert_eq!(
            foreign.own_keys().unwrap(),
            vec![PropertyKey::from(&sym), PropertyKey::from("a")]
        );

        let proxy = read_only(&membrane, &foreign);
        assert_eq!(
            proxy.own_keys().unwrap(),
            vec![PropertyKey::from("a"), PropertyKey::from(&sym)]
        );
    }

    /// Reports `k` frozen, but with a new value on every lookup
    struct Drifting(AtomicU32);

    impl ProxyHandler for Drifting {
        fn get_own_property_descriptor(
            &self,
            target: &Object,
            key: &PropertyKey,
        ) -> Result<Option<PropertyDescriptor>> {
            if key.as_str() != Some("k") {
                return target.get_own_property_descriptor(key.clone());
            }
            let next = self.0.fetch_add(1, Ordering::Relaxed);
            Ok(Some(
                PropertyDescriptor::data(next)
                    .with_writable(false)
                    .with_configurable(false),
            ))
        }
    }

    #[test]
    fn test_refused_lock_is_an_error() {
        let membrane = Membrane::new(MembraneOptions::default().strict(true));
        let target = Object::new();
        target
            .define_property("k", PropertyDescriptor::data(0).with_configurable(false))
            .unwrap();
        let foreign = Object::new_proxy(target.clone(), Arc::new(Drifting(AtomicU32::new(1))));
        let proxy = read_only(&membrane, &foreign);

        // Records k = 1 on the shadow
        proxy.get_own_property_descriptor("k").unwrap();

        target.prevent_extensions().unwrap();
        let err = proxy.is_extensible().unwrap_err();
        assert!(matches!(err, ObjectError::InvariantViolation(ref msg) if msg.contains("lock")));
    }
}
