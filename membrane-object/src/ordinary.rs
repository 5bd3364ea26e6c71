//! Ordinary object storage and the define/delete validation rules
//!
//! An [`OrdinaryObject`] is the lock-protected state behind every non-proxy
//! [`Object`](crate::Object). All validation here is local to one object;
//! operations that walk the prototype chain or call user code live on
//! `Object` so that no lock is held while they run.

use crate::descriptor::PropertyDescriptor;
use crate::object::{Object, ObjectClass};
use crate::value::Value;
use indexmap::IndexMap;
use membrane_types::PropertyKey;
use once_cell::sync::Lazy;

const LENGTH: &str = "length";

static LENGTH_KEY: Lazy<PropertyKey> = Lazy::new(|| PropertyKey::from(LENGTH));

/// Internal slots and own properties of an ordinary object
#[derive(Debug, Clone)]
pub struct OrdinaryObject {
    /// `[[Prototype]]` (None ends the chain)
    pub(crate) prototype: Option<Object>,

    /// `[[Extensible]]`
    pub(crate) extensible: bool,

    /// Own properties in insertion order
    pub(crate) properties: IndexMap<PropertyKey, PropertyDescriptor>,

    pub(crate) class: ObjectClass,
}

impl OrdinaryObject {
    pub(crate) fn new(class: ObjectClass, prototype: Option<Object>) -> Self {
        OrdinaryObject {
            prototype,
            extensible: true,
            properties: IndexMap::new(),
            class,
        }
    }

    pub(crate) fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub(crate) fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }

    /// `[[DefineOwnProperty]]`, including array `length` bookkeeping
    ///
    /// Returns false when the definition is rejected.
    pub(crate) fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        if !self.tracks_length() {
            return self.validate_and_apply(key, desc);
        }

        if key.as_str() == Some(LENGTH) {
            return self.define_length(desc);
        }

        if let Some(index) = key.array_index() {
            let len = self.array_length();
            if index >= len && !self.length_writable() {
                return false;
            }
            if !self.validate_and_apply(key, desc) {
                return false;
            }
            if index >= len {
                self.write_length(index + 1);
            }
            return true;
        }

        self.validate_and_apply(key, desc)
    }

    /// `[[Delete]]` - false if the property is non-configurable
    pub(crate) fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            None => true,
            Some(desc) if !desc.is_configurable() => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
        }
    }

    /// `[[OwnPropertyKeys]]`: integer indices ascending, then string keys in
    /// insertion order, then symbol keys in insertion order
    pub(crate) fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, PropertyKey)> = Vec::new();
        let mut strings: Vec<PropertyKey> = Vec::new();
        let mut symbols: Vec<PropertyKey> = Vec::new();

        for key in self.properties.keys() {
            match key {
                PropertyKey::String(_) => match key.array_index() {
                    Some(index) => indices.push((index, key.clone())),
                    None => strings.push(key.clone()),
                },
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
            }
        }

        indices.sort_by_key(|(index, _)| *index);
        let mut keys: Vec<PropertyKey> = indices.into_iter().map(|(_, key)| key).collect();
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    fn validate_and_apply(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        match self.properties.get(&key) {
            None => {
                if !self.extensible {
                    return false;
                }
            }
            Some(current) if !current.is_configurable() => {
                if !compatible_with_non_configurable(current, &desc) {
                    return false;
                }
            }
            Some(_) => {}
        }
        self.properties.insert(key, desc);
        true
    }

    fn tracks_length(&self) -> bool {
        matches!(self.class, ObjectClass::Array) && self.properties.contains_key(&*LENGTH_KEY)
    }

    pub(crate) fn array_length(&self) -> u32 {
        self.properties
            .get(&*LENGTH_KEY)
            .and_then(|desc| desc.value())
            .and_then(Value::as_number)
            .map(|n| n as u32)
            .unwrap_or(0)
    }

    fn length_writable(&self) -> bool {
        self.properties
            .get(&*LENGTH_KEY)
            .map(PropertyDescriptor::is_writable)
            .unwrap_or(false)
    }

    fn write_length(&mut self, len: u32) {
        if let Some(PropertyDescriptor::Data { value, .. }) = self.properties.get_mut(&*LENGTH_KEY) {
            *value = Value::from(len);
        }
    }

    fn define_length(&mut self, desc: PropertyDescriptor) -> bool {
        let new_len = match desc.value().and_then(Value::as_number) {
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n < f64::from(u32::MAX) => n as u32,
            Some(_) => return false,
            // Attribute-only redefinition
            None => return self.validate_and_apply(LENGTH_KEY.clone(), desc),
        };

        let old_len = self.array_length();
        if new_len >= old_len {
            return self.validate_and_apply(LENGTH_KEY.clone(), desc);
        }
        if !self.length_writable() {
            return false;
        }

        // Truncate from the end; a non-configurable element stops the truncation
        let mut doomed: Vec<(u32, PropertyKey)> = self
            .properties
            .keys()
            .filter_map(|key| key.array_index().map(|index| (index, key.clone())))
            .filter(|(index, _)| *index >= new_len)
            .collect();
        doomed.sort_by(|a, b| b.0.cmp(&a.0));

        for (index, key) in doomed {
            if !self.delete(&key) {
                let stopped = desc.map_value(|_| Value::from(index + 1));
                self.properties.insert(LENGTH_KEY.clone(), stopped);
                return false;
            }
        }

        self.validate_and_apply(LENGTH_KEY.clone(), desc)
    }
}

/// Can `desc` replace the non-configurable descriptor `current`?
fn compatible_with_non_configurable(current: &PropertyDescriptor, desc: &PropertyDescriptor) -> bool {
    if desc.is_configurable() || desc.is_enumerable() != current.is_enumerable() {
        return false;
    }

    match (current, desc) {
        (
            PropertyDescriptor::Data {
                value: current_value,
                writable: current_writable,
                ..
            },
            PropertyDescriptor::Data {
                value: new_value,
                writable: new_writable,
                ..
            },
        ) => *current_writable || (!*new_writable && current_value.same_value(new_value)),
        (
            PropertyDescriptor::Accessor {
                get: current_get,
                set: current_set,
                ..
            },
            PropertyDescriptor::Accessor {
                get: new_get,
                set: new_set,
                ..
            },
        ) => current_get == new_get && current_set == new_set,
        // Cannot switch between data and accessor
        _ => false,
    }
}
