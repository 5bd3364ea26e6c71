//! Integration tests for read-only proxies

use membrane_core::prelude::*;
use membrane_object::TransparentHandler;
use parking_lot::Mutex;
use std::sync::Arc;

fn strict_membrane() -> Membrane {
    Membrane::new(MembraneOptions::default().strict(true))
}

fn obj(value: &Value) -> &Object {
    value.as_object().expect("expected an object")
}

#[test]
fn test_same_proxy_every_time() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("x", 1)]);

    let first = membrane.get_read_only_proxy(&Value::from(&o));
    let second = membrane.get_read_only_proxy(&Value::from(&o));
    assert_eq!(obj(&first).get("x").unwrap(), obj(&second).get("x").unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_never_rewraps_own_proxy() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("x", 1)]);

    let first = membrane.get_read_only_proxy(&Value::from(&o));
    let second = membrane.get_read_only_proxy(&first);
    assert_eq!(first, second);
}

#[test]
fn test_rewraps_unknown_proxy() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("x", 1)]);
    let foreign = Value::from(Object::new_proxy(o, Arc::new(TransparentHandler)));

    let wrapped = membrane.get_read_only_proxy(&foreign);
    assert_ne!(wrapped, foreign);
    assert_eq!(obj(&wrapped).get("x").unwrap(), Value::from(1));
}

#[test]
fn test_frozen_objects() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", Object::new())]);
    o.freeze().unwrap();

    let proxy = membrane.get_read_only_proxy(&Value::from(&o));
    let foo = obj(&proxy).get("foo").unwrap();
    assert!(obj(&foo).is_proxy());

    // Frozen values are reported unchanged through the descriptor
    let desc = obj(&proxy).get_own_property_descriptor("foo").unwrap().unwrap();
    assert_eq!(desc.value(), Some(&foo));
    assert!(obj(&proxy).is_frozen().unwrap());
}

#[test]
fn test_cycles_keep_identity() {
    let membrane = strict_membrane();
    let a = Object::new();
    let foo = Object::from_entries([("self", &a)]);
    a.set("foo", &foo).unwrap();

    let proxy = membrane.get_read_only_proxy(&Value::from(&a));
    let foo_proxy = obj(&proxy).get("foo").unwrap();
    assert_eq!(obj(&foo_proxy).get("self").unwrap(), proxy);
}

#[test]
fn test_getter_descriptor() {
    let membrane = strict_membrane();
    let a = Object::from_entries([("hello", "world")]);
    let returned = a.clone();
    let getter = Object::new_function("getter", move |_, _| Ok(Value::from(&returned)));

    let o = Object::from_entries([("test", 2)]);
    o.define_property(
        "foo",
        PropertyDescriptor::accessor(Some(getter), None).with_configurable(false),
    )
    .unwrap();

    let proxy = membrane.get_read_only_proxy(&Value::from(&o));
    let desc = obj(&proxy).get_own_property_descriptor("foo").unwrap().unwrap();
    let from_getter = desc.getter().unwrap().call(&Value::Undefined, &[]).unwrap();

    assert_eq!(
        membrane.get_read_only_proxy(&from_getter),
        obj(&proxy).get("foo").unwrap()
    );
}

#[test]
fn test_has() {
    let membrane = strict_membrane();
    let proto = Object::from_entries([("inherited", 1)]);
    let o = Object::with_prototype(Some(proto));
    o.set("foo", "bar").unwrap();

    let proxy = membrane.get_read_only_proxy(&Value::from(&o));
    assert!(obj(&proxy).has("foo").unwrap());
    assert!(obj(&proxy).has("inherited").unwrap());
    assert!(!obj(&proxy).has("missing").unwrap());
}

#[test]
fn test_delete_throws() {
    let membrane = strict_membrane();
    let array = Object::array_from([Object::from_entries([("foo", "bar")])]);

    let proxy = membrane.get_read_only_proxy(&Value::from(&array));
    let err = obj(&proxy).delete(PropertyKey::index(0)).unwrap_err();
    assert!(err.is_invalid_mutation());
    assert!(array.has(PropertyKey::index(0)).unwrap());
}

#[test]
fn test_extensible_when_original_is() {
    let membrane = strict_membrane();
    let hello = Object::from_entries([("hello", "world")]);
    let o = Object::from_entries([("hello", hello)]);

    let proxy = membrane.get_read_only_proxy(&Value::from(&o));
    assert!(obj(&proxy).is_extensible().unwrap());

    o.prevent_extensions().unwrap();
    assert!(!obj(&proxy).is_extensible().unwrap());
    assert_eq!(obj(&proxy).own_property_names().unwrap(), vec!["hello"]);
}

#[test]
fn test_structural_mutations_throw() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", "bar")]);
    let proxy = membrane.get_read_only_proxy(&Value::from(&o));

    assert!(obj(&proxy).prevent_extensions().unwrap_err().is_invalid_mutation());
    assert!(obj(&proxy)
        .define_property("hello", PropertyDescriptor::data("world"))
        .unwrap_err()
        .is_invalid_mutation());
    assert!(obj(&proxy)
        .set_prototype_of(Some(Object::new()))
        .unwrap_err()
        .is_invalid_mutation());

    assert!(o.is_extensible().unwrap());
    assert!(!o.has("hello").unwrap());
}

#[test]
fn test_nested_prototype_change_throws() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", Object::from_entries([("bar", "baz")]))]);
    let proxy = membrane.get_read_only_proxy(&Value::from(&o));

    let foo = obj(&proxy).get("foo").unwrap();
    let err = obj(&foo).set_prototype_of(Some(Object::new())).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @r#"Invalid mutation: cannot set prototype on "[object Object]", "[object Object]" is read-only"#
    );
}

#[test]
fn test_own_property_names_and_symbols() {
    let membrane = strict_membrane();
    let sym = Symbol::anonymous();

    let o = Object::from_entries([("a", "b")]);
    o.set(sym.clone(), "symbol").unwrap();
    let proxy = membrane.get_read_only_proxy(&Value::from(&o));
    assert_eq!(obj(&proxy).own_property_names().unwrap(), vec!["a"]);
    assert_eq!(obj(&proxy).own_property_symbols().unwrap(), vec![sym.clone()]);
    assert_eq!(obj(&proxy).keys().unwrap(), vec!["a"]);

    let only_symbol = Object::new();
    only_symbol.set(sym.clone(), "symbol").unwrap();
    let proxy = membrane.get_read_only_proxy(&Value::from(&only_symbol));
    assert!(obj(&proxy).own_property_names().unwrap().is_empty());
    assert_eq!(obj(&proxy).own_property_symbols().unwrap(), vec![sym]);
}

#[test]
fn test_empty_object_identity() {
    let membrane = strict_membrane();
    let o = Value::from(Object::new());
    assert_eq!(membrane.get_read_only_proxy(&o), membrane.get_read_only_proxy(&o));
}

#[test]
fn test_deep_mutation_throws() {
    let membrane = strict_membrane();
    let proxy = membrane.get_read_only_proxy(&Value::from(Object::new()));
    assert!(obj(&proxy).set("foo", "bar").unwrap_err().is_invalid_mutation());
}

#[test]
fn test_observes_reads() {
    let calls: Arc<Mutex<Vec<(Object, PropertyKey)>>> = Arc::default();
    let sink = calls.clone();
    let membrane = Membrane::new(
        MembraneOptions::default()
            .strict(true)
            .with_value_observed(move |target, key| sink.lock().push((target.clone(), key.clone()))),
    );

    let inner = Object::from_entries([("bar", "baz")]);
    let o = Object::from_entries([("foo", Value::from("bar")), ("deep", Value::from(&inner))]);
    let proxy = membrane.get_read_only_proxy(&Value::from(&o));

    obj(&proxy).get("foo").unwrap();
    {
        let calls = calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.ptr_eq(&o));
        assert_eq!(calls[0].1, PropertyKey::from("foo"));
    }

    let deep = obj(&proxy).get("deep").unwrap();
    obj(&deep).get("bar").unwrap();
    let calls = calls.lock();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].0.ptr_eq(&inner));
    assert_eq!(calls[2].1, PropertyKey::from("bar"));
}

#[test]
fn test_read_only_through_get_proxy() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", "bar")]);

    let read_only = membrane.get_read_only_proxy(&Value::from(&o));
    let write_and_read = membrane.get_proxy(&read_only);
    assert!(obj(&write_and_read).set("foo", "baz").is_err());
    assert_eq!(o.get("foo").unwrap(), Value::from("bar"));
}

#[test]
fn test_read_only_through_initialization() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", "bar")]);

    let read_only = membrane.get_read_only_proxy(&Value::from(&o));
    let holder = Object::from_entries([("x", read_only)]);
    let write_and_read = membrane.get_proxy(&Value::from(&holder));

    let x = obj(&write_and_read).get("x").unwrap();
    assert!(obj(&x).set("foo", "baz").is_err());
}

#[test]
fn test_read_only_through_assignment() {
    let membrane = strict_membrane();
    let o = Object::from_entries([("foo", "bar")]);

    let read_only = membrane.get_read_only_proxy(&Value::from(&o));
    let write_and_read = membrane.get_proxy(&Value::from(Object::new()));
    obj(&write_and_read).set("x", read_only).unwrap();

    let x = obj(&write_and_read).get("x").unwrap();
    assert!(obj(&x).set("foo", "baz").is_err());
}

#[test]
fn test_frozen_reactive_converted_to_read_only() {
    let membrane = strict_membrane();
    let value = Object::new();
    let o = Object::from_entries([("foo", &value)]);

    let reactive = membrane.get_proxy(&Value::from(&o));
    assert!(obj(&reactive).freeze().unwrap());
    assert!(o.is_frozen().unwrap());

    let read_only = membrane.get_read_only_proxy(&reactive);
    let foo = obj(&read_only).get("foo").unwrap();
    assert_eq!(membrane.unwrap(&foo), Value::from(&value));
}

#[test]
fn test_descriptor_values_are_wrapped() {
    let membrane = strict_membrane();
    let entry = Object::from_entries([("foo", "bar")]);
    let todos = Object::new();
    todos
        .define_property("entry", PropertyDescriptor::data(&entry))
        .unwrap();

    let proxy = membrane.get_read_only_proxy(&Value::from(&todos));
    let desc = obj(&proxy).get_own_property_descriptor("entry").unwrap().unwrap();
    let value = desc.value().unwrap();

    assert!(obj(value).set("foo", "").is_err());
    assert_eq!(entry.get("foo").unwrap(), Value::from("bar"));
}

#[test]
fn test_lenient_mode_fails_silently() {
    let membrane = Membrane::new(MembraneOptions::default().strict(false));
    let o = Object::from_entries([("foo", Object::from_entries([("bar", "baz")]))]);
    let proxy = membrane.get_read_only_proxy(&Value::from(&o));

    assert!(!obj(&proxy).set("foo", 1).unwrap());
    assert!(!obj(&proxy).delete("foo").unwrap());
    assert!(!obj(&proxy).prevent_extensions().unwrap());
    assert!(!obj(&proxy)
        .define_property("x", PropertyDescriptor::data(1))
        .unwrap());
    let foo = obj(&proxy).get("foo").unwrap();
    assert!(!obj(&foo).set_prototype_of(None).unwrap());

    assert!(o.get("foo").unwrap().is_object());
    assert_eq!(membrane.metrics().mutations_rejected, 5);
}
