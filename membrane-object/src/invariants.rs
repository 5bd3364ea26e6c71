//! Proxy invariant checks
//!
//! After a trap returns, its result is compared against the proxy target.
//! A proxy may lie about configurable, extensible state, but never about
//! non-configurable properties or a non-extensible target. Each check
//! mirrors one internal method.

use crate::descriptor::PropertyDescriptor;
use crate::error::{ObjectError, Result};
use crate::object::Object;
use crate::value::Value;
use hashbrown::HashSet;
use membrane_types::PropertyKey;

fn violation(message: String) -> ObjectError {
    ObjectError::InvariantViolation(message)
}

/// `[[GetOwnProperty]]`
pub fn check_get_own_property(
    target: &Object,
    key: &PropertyKey,
    trap_result: Option<&PropertyDescriptor>,
) -> Result<()> {
    let target_desc = target.get_own_property_descriptor(key.clone())?;
    let extensible = target.is_extensible()?;

    match (trap_result, target_desc) {
        (None, Some(existing)) if !existing.is_configurable() => Err(violation(format!(
            "getOwnPropertyDescriptor: cannot report non-configurable property {key} as non-existent"
        ))),
        (None, Some(_)) if !extensible => Err(violation(format!(
            "getOwnPropertyDescriptor: cannot report existing property {key} as non-existent on a non-extensible target"
        ))),
        (Some(_), None) if !extensible => Err(violation(format!(
            "getOwnPropertyDescriptor: cannot report property {key} as existent on a non-extensible target"
        ))),
        (Some(reported), existing) if !reported.is_configurable() => match existing {
            Some(existing) if !existing.is_configurable() => {
                if let (
                    PropertyDescriptor::Data { value: rv, writable: false, .. },
                    PropertyDescriptor::Data { value: ev, writable: false, .. },
                ) = (reported, &existing)
                {
                    if !rv.same_value(ev) {
                        return Err(violation(format!(
                            "getOwnPropertyDescriptor: non-configurable non-writable property {key} must report the same value"
                        )));
                    }
                }
                Ok(())
            }
            _ => Err(violation(format!(
                "getOwnPropertyDescriptor: cannot report {key} as non-configurable when the target property is configurable or absent"
            ))),
        },
        _ => Ok(()),
    }
}

/// `[[HasProperty]]`, only relevant when the trap answered false
pub fn check_has(target: &Object, key: &PropertyKey) -> Result<()> {
    let Some(existing) = target.get_own_property_descriptor(key.clone())? else {
        return Ok(());
    };
    if !existing.is_configurable() {
        return Err(violation(format!(
            "has: cannot report non-configurable property {key} as non-existent"
        )));
    }
    if !target.is_extensible()? {
        return Err(violation(format!(
            "has: cannot report property {key} as non-existent on a non-extensible target"
        )));
    }
    Ok(())
}

/// `[[Get]]`
pub fn check_get(target: &Object, key: &PropertyKey, trap_result: &Value) -> Result<()> {
    match target.get_own_property_descriptor(key.clone())? {
        Some(PropertyDescriptor::Data {
            value,
            writable: false,
            configurable: false,
            ..
        }) if !trap_result.same_value(&value) => Err(violation(format!(
            "get: non-configurable non-writable property {key} must return the same value"
        ))),
        Some(PropertyDescriptor::Accessor {
            get: None,
            configurable: false,
            ..
        }) if !trap_result.is_undefined() => Err(violation(format!(
            "get: non-configurable accessor {key} without a getter must return undefined"
        ))),
        _ => Ok(()),
    }
}

/// `[[Set]]`, only relevant when the trap answered true
pub fn check_set(target: &Object, key: &PropertyKey, value: &Value) -> Result<()> {
    match target.get_own_property_descriptor(key.clone())? {
        Some(PropertyDescriptor::Data {
            value: current,
            writable: false,
            configurable: false,
            ..
        }) if !value.same_value(&current) => Err(violation(format!(
            "set: cannot change non-configurable non-writable property {key}"
        ))),
        Some(PropertyDescriptor::Accessor {
            set: None,
            configurable: false,
            ..
        }) => Err(violation(format!(
            "set: cannot set non-configurable accessor {key} without a setter"
        ))),
        _ => Ok(()),
    }
}

/// `[[Delete]]`, only relevant when the trap answered true
pub fn check_delete(target: &Object, key: &PropertyKey) -> Result<()> {
    let Some(existing) = target.get_own_property_descriptor(key.clone())? else {
        return Ok(());
    };
    if !existing.is_configurable() {
        return Err(violation(format!(
            "deleteProperty: cannot delete non-configurable property {key}"
        )));
    }
    if !target.is_extensible()? {
        return Err(violation(format!(
            "deleteProperty: cannot delete property {key} of a non-extensible target"
        )));
    }
    Ok(())
}

/// `[[OwnPropertyKeys]]`
pub fn check_own_keys(target: &Object, trap_result: &[PropertyKey]) -> Result<()> {
    let mut seen = HashSet::with_capacity(trap_result.len());
    for key in trap_result {
        if !seen.insert(key) {
            return Err(violation(format!("ownKeys: duplicate key {key}")));
        }
    }

    let target_keys = target.own_keys()?;
    for key in &target_keys {
        let non_configurable = target
            .get_own_property_descriptor(key.clone())?
            .is_some_and(|desc| !desc.is_configurable());
        if non_configurable && !seen.contains(key) {
            return Err(violation(format!(
                "ownKeys: result must include non-configurable property {key}"
            )));
        }
    }

    if !target.is_extensible()? {
        let exact = target_keys.len() == trap_result.len()
            && target_keys.iter().all(|key| seen.contains(key));
        if !exact {
            return Err(violation(
                "ownKeys: a non-extensible target requires the exact key set".to_string(),
            ));
        }
    }
    Ok(())
}

/// `[[GetPrototypeOf]]`
pub fn check_get_prototype_of(target: &Object, trap_result: Option<&Object>) -> Result<()> {
    if target.is_extensible()? {
        return Ok(());
    }
    let actual = target.get_prototype_of()?;
    if !same_prototype(actual.as_ref(), trap_result) {
        return Err(violation(
            "getPrototypeOf: a non-extensible target must report its own prototype".to_string(),
        ));
    }
    Ok(())
}

/// `[[SetPrototypeOf]]`, only relevant when the trap answered true
pub fn check_set_prototype_of(target: &Object, new_proto: Option<&Object>) -> Result<()> {
    if target.is_extensible()? {
        return Ok(());
    }
    let actual = target.get_prototype_of()?;
    if !same_prototype(actual.as_ref(), new_proto) {
        return Err(violation(
            "setPrototypeOf: a non-extensible target keeps its prototype".to_string(),
        ));
    }
    Ok(())
}

/// `[[IsExtensible]]`
pub fn check_is_extensible(target: &Object, trap_result: bool) -> Result<()> {
    if trap_result != target.is_extensible()? {
        return Err(violation(
            "isExtensible: result must match the target".to_string(),
        ));
    }
    Ok(())
}

/// `[[PreventExtensions]]`, only relevant when the trap answered true
pub fn check_prevent_extensions(target: &Object) -> Result<()> {
    if target.is_extensible()? {
        return Err(violation(
            "preventExtensions: cannot report success while the target is extensible".to_string(),
        ));
    }
    Ok(())
}

/// `[[DefineOwnProperty]]`, only relevant when the trap answered true
pub fn check_define_own_property(target: &Object, key: &PropertyKey, desc: &PropertyDescriptor) -> Result<()> {
    let existing = target.get_own_property_descriptor(key.clone())?;
    if existing.is_none() && !target.is_extensible()? {
        return Err(violation(format!(
            "defineProperty: cannot add property {key} to a non-extensible target"
        )));
    }
    if desc.is_configurable() {
        return Ok(());
    }
    match existing {
        Some(existing) if !existing.is_configurable() => {
            if let (
                PropertyDescriptor::Data { value: nv, writable: false, .. },
                PropertyDescriptor::Data { value: tv, writable: false, .. },
            ) = (desc, &existing)
            {
                if !nv.same_value(tv) {
                    return Err(violation(format!(
                        "defineProperty: cannot change the value of non-configurable non-writable property {key}"
                    )));
                }
            }
            Ok(())
        }
        _ => Err(violation(format!(
            "defineProperty: cannot define non-configurable property {key} when the target property is configurable or absent"
        ))),
    }
}

fn same_prototype(a: Option<&Object>, b: Option<&Object>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ProxyHandler;
    use std::sync::Arc;

    fn locked(key: &str, value: i32) -> Object {
        let obj = Object::new();
        obj.define_property(
            key,
            PropertyDescriptor::data(value)
                .with_writable(false)
                .with_configurable(false),
        )
        .unwrap();
        obj
    }

    #[test]
    fn test_check_get() {
        let target = locked("x", 42);
        let key = PropertyKey::from("x");
        assert!(check_get(&target, &key, &Value::from(42)).is_ok());
        assert!(check_get(&target, &key, &Value::from(99)).is_err());
        assert!(check_get(&target, &"other".into(), &Value::from(99)).is_ok());
    }

    #[test]
    fn test_check_has_and_delete() {
        let target = locked("x", 1);
        let key = PropertyKey::from("x");
        assert!(check_has(&target, &key).is_err());
        assert!(check_delete(&target, &key).is_err());
        assert!(check_has(&target, &"y".into()).is_ok());
    }

    #[test]
    fn test_check_own_keys() {
        let target = locked("required", 1);
        assert!(check_own_keys(&target, &[]).is_err());
        assert!(check_own_keys(&target, &["required".into()]).is_ok());
        assert!(check_own_keys(&target, &["required".into(), "required".into()]).is_err());

        target.prevent_extensions().unwrap();
        assert!(check_own_keys(&target, &["required".into(), "extra".into()]).is_err());
    }

    #[test]
    fn test_check_extensibility() {
        let target = Object::new();
        assert!(check_is_extensible(&target, true).is_ok());
        assert!(check_is_extensible(&target, false).is_err());
        assert!(check_prevent_extensions(&target).is_err());

        target.prevent_extensions().unwrap();
        assert!(check_prevent_extensions(&target).is_ok());
    }

    #[test]
    fn test_check_prototype() {
        let proto = Object::new();
        let target = Object::with_prototype(Some(proto.clone()));
        let other = Object::new();
        assert!(check_get_prototype_of(&target, Some(&other)).is_ok());

        target.prevent_extensions().unwrap();
        assert!(check_get_prototype_of(&target, Some(&proto)).is_ok());
        assert!(check_get_prototype_of(&target, Some(&other)).is_err());
        assert!(check_set_prototype_of(&target, None).is_err());
    }

    #[test]
    fn test_check_define_and_describe() {
        let target = Object::new();
        let key = PropertyKey::from("x");
        let sealed = PropertyDescriptor::data(1).with_configurable(false);
        assert!(check_define_own_property(&target, &key, &sealed).is_err());
        assert!(check_get_own_property(&target, &key, Some(&sealed)).is_err());

        target.define_property("x", sealed.clone()).unwrap();
        assert!(check_define_own_property(&target, &key, &sealed).is_ok());
        assert!(check_get_own_property(&target, &key, None).is_err());
    }

    /// A handler that lies about a frozen property
    struct Liar;

    impl ProxyHandler for Liar {
        fn get(&self, _target: &Object, _key: &PropertyKey, _receiver: &Value) -> Result<Value> {
            Ok(Value::from("lie"))
        }
    }

    #[test]
    fn test_violations_surface_through_proxies() {
        let proxy = Object::new_proxy(locked("x", 1), Arc::new(Liar));
        let err = proxy.get("x").unwrap_err();
        assert!(matches!(err, ObjectError::InvariantViolation(_)));
    }
}
