//! Object handles and the internal operations
//!
//! An [`Object`] is a cheap, shareable handle to either an ordinary object or
//! a proxy. Every structural operation goes through the methods here, which
//! either run the ordinary algorithm or dispatch to the proxy's
//! [`ProxyHandler`] and validate the trap result against the proxy target.

use crate::descriptor::PropertyDescriptor;
use crate::error::{ObjectError, Result};
use crate::handler::ProxyHandler;
use crate::invariants;
use crate::ordinary::OrdinaryObject;
use crate::value::Value;
use membrane_types::{ObjectId, PropertyKey, Symbol};
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Maximum prototype chain depth walked by get/set/has
pub const MAX_PROTOTYPE_CHAIN_DEPTH: usize = 1024;

/// Signature of a native function body: `(this, arguments) -> result`
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value> + Send + Sync;

/// A callable backed by Rust code
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    body: Arc<NativeFn>,
    constructor: bool,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<Arc<str>>,
        body: impl Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        NativeFunction {
            name: name.into(),
            body: Arc::new(body),
            constructor: false,
        }
    }

    /// A function that does nothing and returns undefined
    pub fn noop() -> Self {
        Self::new("", |_, _| Ok(Value::Undefined))
    }

    /// Allow this function to be used with `construct`
    pub fn into_constructor(mut self) -> Self {
        self.constructor = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    pub fn invoke(&self, this: &Value, args: &[Value]) -> Result<Value> {
        (self.body)(this, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// The class of an ordinary object
#[derive(Debug, Clone)]
pub enum ObjectClass {
    Plain,
    Array,
    Function(NativeFunction),
    /// An opaque host value, e.g. a handle to a resource
    Host(Arc<str>),
}

impl ObjectClass {
    /// Tag used in `[object Tag]` renderings
    pub fn tag(&self) -> &str {
        match self {
            ObjectClass::Plain => "Object",
            ObjectClass::Array => "Array",
            ObjectClass::Function(_) => "Function",
            ObjectClass::Host(tag) => tag,
        }
    }
}

struct ProxySlots {
    target: Object,
    handler: Arc<dyn ProxyHandler>,
}

enum ObjectKind {
    Ordinary(RwLock<OrdinaryObject>),
    Proxy(ProxySlots),
}

struct ObjectCell {
    id: ObjectId,
    kind: ObjectKind,
}

/// Shared handle to an object
///
/// Cloning the handle never copies the object. Equality is identity.
#[derive(Clone)]
pub struct Object(Arc<ObjectCell>);

/// Non-owning handle to an object
#[derive(Clone)]
pub struct WeakObject(Weak<ObjectCell>);

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(Object)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(obj) => write!(f, "Weak({obj:?})"),
            None => write!(f, "Weak(<dropped>)"),
        }
    }
}

impl Object {
    fn from_kind(kind: ObjectKind) -> Self {
        Object(Arc::new(ObjectCell {
            id: ObjectId::next(),
            kind,
        }))
    }

    fn ordinary_with(class: ObjectClass, prototype: Option<Object>) -> Self {
        Self::from_kind(ObjectKind::Ordinary(RwLock::new(OrdinaryObject::new(
            class, prototype,
        ))))
    }

    /// A new empty plain object without a prototype
    pub fn new() -> Self {
        Self::ordinary_with(ObjectClass::Plain, None)
    }

    pub fn with_prototype(prototype: Option<Object>) -> Self {
        Self::ordinary_with(ObjectClass::Plain, prototype)
    }

    /// A plain object holding the given data properties, in order
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
    {
        let obj = Self::new();
        if let Some(lock) = obj.ordinary() {
            let mut state = lock.write();
            for (key, value) in entries {
                state.define_own_property(key.into(), PropertyDescriptor::data(value));
            }
        }
        obj
    }

    /// A new empty array with a `length` property
    pub fn new_array() -> Self {
        let obj = Self::ordinary_with(ObjectClass::Array, None);
        if let Some(lock) = obj.ordinary() {
            lock.write().properties.insert(
                PropertyKey::from("length"),
                PropertyDescriptor::data(0)
                    .with_enumerable(false)
                    .with_configurable(false),
            );
        }
        obj
    }

    pub fn array_from<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        let obj = Self::new_array();
        if let Some(lock) = obj.ordinary() {
            let mut state = lock.write();
            for (index, value) in values.into_iter().enumerate() {
                state.define_own_property(PropertyKey::index(index), PropertyDescriptor::data(value));
            }
        }
        obj
    }

    pub fn new_function(
        name: impl Into<Arc<str>>,
        body: impl Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::ordinary_with(ObjectClass::Function(NativeFunction::new(name, body)), None)
    }

    pub fn new_constructor(
        name: impl Into<Arc<str>>,
        body: impl Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        let function = NativeFunction::new(name, body).into_constructor();
        Self::ordinary_with(ObjectClass::Function(function), None)
    }

    /// An opaque host object tagged with `tag`
    pub fn new_host(tag: impl Into<Arc<str>>) -> Self {
        Self::ordinary_with(ObjectClass::Host(tag.into()), None)
    }

    /// An ordinary object of the given class with no own properties and no
    /// prototype. Arrays created this way carry no `length` slot.
    pub fn bare(class: ObjectClass) -> Self {
        Self::ordinary_with(class, None)
    }

    /// A proxy intercepting every operation on `target` through `handler`
    pub fn new_proxy(target: Object, handler: Arc<dyn ProxyHandler>) -> Self {
        Self::from_kind(ObjectKind::Proxy(ProxySlots { target, handler }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject(Arc::downgrade(&self.0))
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.0.kind, ObjectKind::Proxy(_))
    }

    fn ordinary(&self) -> Option<&RwLock<OrdinaryObject>> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Some(lock),
            ObjectKind::Proxy(_) => None,
        }
    }

    /// The class of an ordinary object; proxies report their target's class
    pub fn class(&self) -> ObjectClass {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => lock.read().class.clone(),
            ObjectKind::Proxy(slots) => slots.target.class(),
        }
    }

    /// `IsArray`: sees through proxies to their target
    pub fn is_array(&self) -> bool {
        matches!(self.class(), ObjectClass::Array)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.class(), ObjectClass::Function(_))
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.class(), ObjectClass::Function(f) if f.is_constructor())
    }

    pub fn is_host(&self) -> bool {
        matches!(self.class(), ObjectClass::Host(_))
    }

    // -- [[GetOwnProperty]] -------------------------------------------------

    pub fn get_own_property_descriptor(
        &self,
        key: impl Into<PropertyKey>,
    ) -> Result<Option<PropertyDescriptor>> {
        let key = key.into();
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.read().get_own_property(&key).cloned()),
            ObjectKind::Proxy(slots) => {
                let result = slots.handler.get_own_property_descriptor(&slots.target, &key)?;
                invariants::check_get_own_property(&slots.target, &key, result.as_ref())?;
                Ok(result)
            }
        }
    }

    pub fn has_own_property(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        Ok(self.get_own_property_descriptor(key)?.is_some())
    }

    // -- [[DefineOwnProperty]] ----------------------------------------------

    pub fn define_property(
        &self,
        key: impl Into<PropertyKey>,
        desc: PropertyDescriptor,
    ) -> Result<bool> {
        let key = key.into();
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.write().define_own_property(key, desc)),
            ObjectKind::Proxy(slots) => {
                let defined = slots
                    .handler
                    .define_property(&slots.target, &key, desc.clone())?;
                if defined {
                    invariants::check_define_own_property(&slots.target, &key, &desc)?;
                }
                Ok(defined)
            }
        }
    }

    // -- [[Get]] ------------------------------------------------------------

    pub fn get(&self, key: impl Into<PropertyKey>) -> Result<Value> {
        let receiver = Value::Object(self.clone());
        self.get_at_depth(&key.into(), &receiver, 0)
    }

    /// `[[Get]]` with an explicit receiver (the `this` of accessors)
    pub fn get_with_receiver(&self, key: impl Into<PropertyKey>, receiver: &Value) -> Result<Value> {
        self.get_at_depth(&key.into(), receiver, 0)
    }

    fn get_at_depth(&self, key: &PropertyKey, receiver: &Value, depth: usize) -> Result<Value> {
        if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
            return Err(ObjectError::PrototypeChainTooDeep {
                max: MAX_PROTOTYPE_CHAIN_DEPTH,
            });
        }

        let lock = match &self.0.kind {
            ObjectKind::Ordinary(lock) => lock,
            ObjectKind::Proxy(slots) => {
                let value = slots.handler.get(&slots.target, key, receiver)?;
                invariants::check_get(&slots.target, key, &value)?;
                return Ok(value);
            }
        };

        // Copy what we need out of the lock before running user code
        let (own, prototype) = {
            let state = lock.read();
            (state.get_own_property(key).cloned(), state.prototype.clone())
        };

        match own {
            Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
            Some(PropertyDescriptor::Accessor { get: Some(getter), .. }) => getter.call(receiver, &[]),
            Some(PropertyDescriptor::Accessor { get: None, .. }) => Ok(Value::Undefined),
            None => match prototype {
                Some(proto) => proto.get_at_depth(key, receiver, depth + 1),
                None => Ok(Value::Undefined),
            },
        }
    }

    // -- [[Set]] ------------------------------------------------------------

    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<bool> {
        let receiver = Value::Object(self.clone());
        self.set_at_depth(&key.into(), value.into(), &receiver, 0)
    }

    pub fn set_with_receiver(
        &self,
        key: impl Into<PropertyKey>,
        value: impl Into<Value>,
        receiver: &Value,
    ) -> Result<bool> {
        self.set_at_depth(&key.into(), value.into(), receiver, 0)
    }

    fn set_at_depth(&self, key: &PropertyKey, value: Value, receiver: &Value, depth: usize) -> Result<bool> {
        if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
            return Err(ObjectError::PrototypeChainTooDeep {
                max: MAX_PROTOTYPE_CHAIN_DEPTH,
            });
        }

        let lock = match &self.0.kind {
            ObjectKind::Ordinary(lock) => lock,
            ObjectKind::Proxy(slots) => {
                let stored = slots
                    .handler
                    .set(&slots.target, key, value.clone(), receiver)?;
                if stored {
                    invariants::check_set(&slots.target, key, &value)?;
                }
                return Ok(stored);
            }
        };

        let (own, prototype) = {
            let state = lock.read();
            (state.get_own_property(key).cloned(), state.prototype.clone())
        };

        let own = match (own, prototype) {
            (Some(desc), _) => desc,
            (None, Some(proto)) => return proto.set_at_depth(key, value, receiver, depth + 1),
            (None, None) => PropertyDescriptor::data(Value::Undefined),
        };

        match own {
            PropertyDescriptor::Accessor { set: Some(setter), .. } => {
                setter.call(receiver, &[value])?;
                Ok(true)
            }
            PropertyDescriptor::Accessor { set: None, .. } => Ok(false),
            PropertyDescriptor::Data { writable: false, .. } => Ok(false),
            PropertyDescriptor::Data { .. } => {
                let Value::Object(receiver) = receiver else {
                    return Ok(false);
                };
                match receiver.get_own_property_descriptor(key.clone())? {
                    Some(existing) if existing.is_accessor() || !existing.is_writable() => Ok(false),
                    Some(existing) => receiver.define_property(key.clone(), existing.map_value(|_| value)),
                    None => receiver.define_property(key.clone(), PropertyDescriptor::data(value)),
                }
            }
        }
    }

    // -- [[HasProperty]] ----------------------------------------------------

    pub fn has(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        self.has_at_depth(&key.into(), 0)
    }

    fn has_at_depth(&self, key: &PropertyKey, depth: usize) -> Result<bool> {
        if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
            return Err(ObjectError::PrototypeChainTooDeep {
                max: MAX_PROTOTYPE_CHAIN_DEPTH,
            });
        }

        let lock = match &self.0.kind {
            ObjectKind::Ordinary(lock) => lock,
            ObjectKind::Proxy(slots) => {
                let found = slots.handler.has(&slots.target, key)?;
                if !found {
                    invariants::check_has(&slots.target, key)?;
                }
                return Ok(found);
            }
        };

        let prototype = {
            let state = lock.read();
            if state.has_own_property(key) {
                return Ok(true);
            }
            state.prototype.clone()
        };

        match prototype {
            Some(proto) => proto.has_at_depth(key, depth + 1),
            None => Ok(false),
        }
    }

    // -- [[Delete]] ---------------------------------------------------------

    pub fn delete(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        let key = key.into();
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.write().delete(&key)),
            ObjectKind::Proxy(slots) => {
                let deleted = slots.handler.delete_property(&slots.target, &key)?;
                if deleted {
                    invariants::check_delete(&slots.target, &key)?;
                }
                Ok(deleted)
            }
        }
    }

    // -- [[OwnPropertyKeys]] ------------------------------------------------

    pub fn own_keys(&self) -> Result<Vec<PropertyKey>> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.read().own_property_keys()),
            ObjectKind::Proxy(slots) => {
                let keys = slots.handler.own_keys(&slots.target)?;
                invariants::check_own_keys(&slots.target, &keys)?;
                Ok(keys)
            }
        }
    }

    /// Own string keys, enumerable or not
    pub fn own_property_names(&self) -> Result<Vec<String>> {
        Ok(self
            .own_keys()?
            .into_iter()
            .filter_map(|key| match key {
                PropertyKey::String(s) => Some(s),
                PropertyKey::Symbol(_) => None,
            })
            .collect())
    }

    pub fn own_property_symbols(&self) -> Result<Vec<Symbol>> {
        Ok(self
            .own_keys()?
            .into_iter()
            .filter_map(|key| match key {
                PropertyKey::String(_) => None,
                PropertyKey::Symbol(sym) => Some(sym),
            })
            .collect())
    }

    /// Enumerable own string keys
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for name in self.own_property_names()? {
            if let Some(desc) = self.get_own_property_descriptor(name.as_str())? {
                if desc.is_enumerable() {
                    keys.push(name);
                }
            }
        }
        Ok(keys)
    }

    // -- [[GetPrototypeOf]] / [[SetPrototypeOf]] ----------------------------

    pub fn get_prototype_of(&self) -> Result<Option<Object>> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.read().prototype.clone()),
            ObjectKind::Proxy(slots) => {
                let proto = slots.handler.get_prototype_of(&slots.target)?;
                invariants::check_get_prototype_of(&slots.target, proto.as_ref())?;
                Ok(proto)
            }
        }
    }

    /// Returns false if the object is non-extensible or the change would
    /// create a prototype cycle
    pub fn set_prototype_of(&self, proto: Option<Object>) -> Result<bool> {
        let lock = match &self.0.kind {
            ObjectKind::Ordinary(lock) => lock,
            ObjectKind::Proxy(slots) => {
                let changed = slots.handler.set_prototype_of(&slots.target, proto.clone())?;
                if changed {
                    invariants::check_set_prototype_of(&slots.target, proto.as_ref())?;
                }
                return Ok(changed);
            }
        };

        {
            let state = lock.read();
            if same_object(state.prototype.as_ref(), proto.as_ref()) {
                return Ok(true);
            }
            if !state.extensible {
                return Ok(false);
            }
        }

        // Walk the new chain; proxies end the walk
        let mut cursor = proto.clone();
        while let Some(current) = cursor {
            if current.ptr_eq(self) {
                return Ok(false);
            }
            cursor = match current.ordinary() {
                Some(next) => next.read().prototype.clone(),
                None => None,
            };
        }

        lock.write().prototype = proto;
        Ok(true)
    }

    // -- [[IsExtensible]] / [[PreventExtensions]] ---------------------------

    pub fn is_extensible(&self) -> Result<bool> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => Ok(lock.read().extensible),
            ObjectKind::Proxy(slots) => {
                let extensible = slots.handler.is_extensible(&slots.target)?;
                invariants::check_is_extensible(&slots.target, extensible)?;
                Ok(extensible)
            }
        }
    }

    pub fn prevent_extensions(&self) -> Result<bool> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => {
                lock.write().extensible = false;
                Ok(true)
            }
            ObjectKind::Proxy(slots) => {
                let prevented = slots.handler.prevent_extensions(&slots.target)?;
                if prevented {
                    invariants::check_prevent_extensions(&slots.target)?;
                }
                Ok(prevented)
            }
        }
    }

    /// Freeze: prevent extensions, then make every own property
    /// non-configurable and every data property non-writable
    ///
    /// Works through proxies using only the interceptable operations.
    pub fn freeze(&self) -> Result<bool> {
        if !self.prevent_extensions()? {
            return Ok(false);
        }
        for key in self.own_keys()? {
            let Some(mut desc) = self.get_own_property_descriptor(key.clone())? else {
                continue;
            };
            desc.set_non_configurable();
            desc.set_non_writable();
            if !self.define_property(key, desc)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_frozen(&self) -> Result<bool> {
        if self.is_extensible()? {
            return Ok(false);
        }
        for key in self.own_keys()? {
            if let Some(desc) = self.get_own_property_descriptor(key)? {
                if desc.is_configurable() || desc.is_writable() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // -- [[Call]] / [[Construct]] -------------------------------------------

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => {
                let class = lock.read().class.clone();
                match class {
                    ObjectClass::Function(function) => function.invoke(this, args),
                    _ => Err(ObjectError::NotCallable(self.to_string())),
                }
            }
            ObjectKind::Proxy(slots) => {
                if !slots.target.is_callable() {
                    return Err(ObjectError::NotCallable(self.to_string()));
                }
                slots.handler.apply(&slots.target, this, args)
            }
        }
    }

    pub fn construct(&self, args: &[Value]) -> Result<Value> {
        match &self.0.kind {
            ObjectKind::Ordinary(lock) => {
                let class = lock.read().class.clone();
                match class {
                    ObjectClass::Function(function) if function.is_constructor() => {
                        let instance = Value::Object(Object::new());
                        match function.invoke(&instance, args)? {
                            Value::Object(obj) => Ok(Value::Object(obj)),
                            _ => Ok(instance),
                        }
                    }
                    _ => Err(ObjectError::NotConstructor(self.to_string())),
                }
            }
            ObjectKind::Proxy(slots) => {
                if !slots.target.is_constructor() {
                    return Err(ObjectError::NotConstructor(self.to_string()));
                }
                slots.handler.construct(&slots.target, args)
            }
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ObjectKind::Ordinary(_) => write!(f, "{}{}", self.class().tag(), self.id()),
            ObjectKind::Proxy(slots) => write!(f, "Proxy{}({:?})", self.id(), slots.target),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class().tag())
    }
}

fn same_object(a: Option<&Object>, b: Option<&Object>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}
