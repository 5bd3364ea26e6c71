//! The membrane facade
//!
//! [`Membrane`] hands out proxies for values crossing the boundary. The same
//! original always maps to the same proxy of a given kind, proxies are never
//! wrapped again, and values read through a proxy are wrapped on the way out.

use crate::config::MembraneConfig;
use crate::handler::{Policy, ReactiveHandler, ReadOnlyHandler};
use crate::metrics::{MembraneMetrics, MetricsSnapshot};
use crate::registry::{Registry, RegistryStats};
use crate::shared;
use membrane_object::{Object, ProxyHandler, Value};
use membrane_types::{PropertyKey, ProxyKind};
use std::fmt;
use std::sync::Arc;

/// Called with `(original, key)` whenever a key is read through a proxy
pub type ValueObserved = Arc<dyn Fn(&Object, &PropertyKey) + Send + Sync>;

/// Called with `(original, key, new_value)` after a reactive write
pub type ValueMutated = Arc<dyn Fn(&Object, &PropertyKey, &Value) + Send + Sync>;

/// Decides whether an original object may be wrapped
pub type ValueIsObservable = Arc<dyn Fn(&Object) -> bool + Send + Sync>;

/// Construction options for a [`Membrane`]
#[derive(Clone, Default)]
pub struct MembraneOptions {
    value_observed: Option<ValueObserved>,
    value_mutated: Option<ValueMutated>,
    value_is_observable: Option<ValueIsObservable>,
    config: MembraneConfig,
}

impl MembraneOptions {
    /// Default options: no callbacks, build-mode strictness
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded configuration
    pub fn from_config(config: MembraneConfig) -> Self {
        MembraneOptions {
            config,
            ..Self::default()
        }
    }

    /// Set the callback for observed reads
    pub fn with_value_observed(
        mut self,
        callback: impl Fn(&Object, &PropertyKey) + Send + Sync + 'static,
    ) -> Self {
        self.value_observed = Some(Arc::new(callback));
        self
    }

    /// Set the callback for reactive writes
    pub fn with_value_mutated(
        mut self,
        callback: impl Fn(&Object, &PropertyKey, &Value) + Send + Sync + 'static,
    ) -> Self {
        self.value_mutated = Some(Arc::new(callback));
        self
    }

    /// Replace the default predicate (every non-host object is observable)
    pub fn with_value_is_observable(
        mut self,
        predicate: impl Fn(&Object) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.value_is_observable = Some(Arc::new(predicate));
        self
    }

    /// Raise on read-only mutations instead of failing silently
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = Some(strict);
        self
    }

    /// Insertions between registry sweeps
    pub fn sweep_threshold(mut self, threshold: usize) -> Self {
        self.config.sweep_threshold = threshold;
        self
    }

    /// The serializable part of these options
    pub fn config(&self) -> &MembraneConfig {
        &self.config
    }
}

impl fmt::Debug for MembraneOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembraneOptions")
            .field("value_observed", &self.value_observed.is_some())
            .field("value_mutated", &self.value_mutated.is_some())
            .field("value_is_observable", &self.value_is_observable.is_some())
            .field("config", &self.config)
            .finish()
    }
}

struct MembraneInner {
    value_observed: Option<ValueObserved>,
    value_mutated: Option<ValueMutated>,
    value_is_observable: Option<ValueIsObservable>,
    strict: bool,
    registry: Registry,
    metrics: MembraneMetrics,
}

/// A wrapping boundary with its own identity registry
///
/// Cloning is cheap and yields a handle to the same membrane.
#[derive(Clone)]
pub struct Membrane {
    inner: Arc<MembraneInner>,
}

impl Membrane {
    /// Create a membrane with an empty registry
    pub fn new(options: MembraneOptions) -> Self {
        let strict = options.config.is_strict();
        Membrane {
            inner: Arc::new(MembraneInner {
                value_observed: options.value_observed,
                value_mutated: options.value_mutated,
                value_is_observable: options.value_is_observable,
                strict,
                registry: Registry::new(options.config.sweep_threshold),
                metrics: MembraneMetrics::new(),
            }),
        }
    }

    /// The reactive view of `value`
    ///
    /// Primitives and unobservable objects come back unchanged, as does a
    /// read-only proxy: a read-only view never turns back into a mutable one.
    ///
    /// The registry holds proxies weakly. While any handle to the proxy is
    /// alive, every call returns that same proxy. Once all handles are
    /// dropped the next call builds a new proxy with a new [`ObjectId`], even
    /// if the original is still alive. Keep the proxy if its identity matters.
    ///
    /// [`ObjectId`]: membrane_types::ObjectId
    pub fn get_proxy(&self, value: &Value) -> Value {
        self.wrap(ProxyKind::Reactive, value)
    }

    /// The read-only view of `value`
    ///
    /// Identity lasts as long as some handle to the proxy does, as for
    /// [`get_proxy`](Self::get_proxy).
    pub fn get_read_only_proxy(&self, value: &Value) -> Value {
        self.wrap(ProxyKind::ReadOnly, value)
    }

    /// The original behind a membrane proxy, or `value` itself
    pub fn unwrap(&self, value: &Value) -> Value {
        shared::unwrap_value(value)
    }

    /// Would `get_proxy` wrap this value?
    pub fn is_wrappable(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => self.is_observable(&shared::unwrap_object(obj)),
            _ => false,
        }
    }

    /// Do read-only proxies raise on mutation?
    pub fn is_strict(&self) -> bool {
        self.inner.strict
    }

    /// Current counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Identity registry occupancy and hit rate
    pub fn registry_stats(&self) -> RegistryStats {
        self.inner.registry.stats()
    }

    /// Drop registry entries whose original or proxy is gone
    pub fn purge(&self) -> usize {
        let swept = self.inner.registry.purge();
        self.inner.metrics.record_swept(swept);
        swept
    }

    fn is_observable(&self, original: &Object) -> bool {
        match &self.inner.value_is_observable {
            Some(predicate) => predicate(original),
            None => shared::default_value_is_observable(original),
        }
    }

    pub(crate) fn wrap(&self, kind: ProxyKind, value: &Value) -> Value {
        let Value::Object(obj) = value else {
            return value.clone();
        };
        let original = shared::unwrap_object(obj);
        if !self.is_observable(&original) {
            return value.clone();
        }

        if kind == ProxyKind::Reactive
            && self
                .inner
                .registry
                .is_proxy_of(ProxyKind::ReadOnly, &original, obj)
        {
            return value.clone();
        }

        Value::Object(self.acquire(kind, &original))
    }

    fn acquire(&self, kind: ProxyKind, original: &Object) -> Object {
        let acquired = self
            .inner
            .registry
            .get_or_create(kind, original, || self.build(kind, original));

        let metrics = &self.inner.metrics;
        if acquired.hit {
            metrics.record_hit();
        } else {
            metrics.record_miss();
            metrics.record_created(kind);
            tracing::debug!(
                %kind,
                original = %original.id(),
                proxy = %acquired.proxy.id(),
                "created membrane proxy"
            );
        }
        if acquired.swept > 0 {
            metrics.record_swept(acquired.swept);
        }
        acquired.proxy
    }

    fn build(&self, kind: ProxyKind, original: &Object) -> Object {
        let shadow = shared::create_shadow_target(original);
        let policy = Policy::new(self.clone(), original.clone(), kind);
        let handler: Arc<dyn ProxyHandler> = match kind {
            ProxyKind::Reactive => Arc::new(ReactiveHandler::new(policy)),
            ProxyKind::ReadOnly => Arc::new(ReadOnlyHandler::new(policy)),
        };
        Object::new_proxy(shadow, handler)
    }

    /// Strip a reactive proxy of this membrane down to its original
    pub(crate) fn unwrap_reactive(&self, value: &Value) -> Value {
        let Value::Object(obj) = value else {
            return value.clone();
        };
        if !obj.is_proxy() {
            return value.clone();
        }
        let original = shared::unwrap_object(obj);
        if self
            .inner
            .registry
            .is_proxy_of(ProxyKind::Reactive, &original, obj)
        {
            Value::Object(original)
        } else {
            value.clone()
        }
    }

    pub(crate) fn observe(&self, original: &Object, key: &PropertyKey) {
        tracing::trace!(original = %original.id(), %key, "observed");
        self.inner.metrics.record_observed();
        if let Some(callback) = &self.inner.value_observed {
            callback(original, key);
        }
    }

    pub(crate) fn report(&self, original: &Object, key: &PropertyKey, value: &Value) {
        tracing::trace!(original = %original.id(), %key, "mutated");
        self.inner.metrics.record_mutation();
        if let Some(callback) = &self.inner.value_mutated {
            callback(original, key, value);
        }
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.metrics.record_rejected();
    }
}

impl Default for Membrane {
    fn default() -> Self {
        Self::new(MembraneOptions::default())
    }
}

impl fmt::Debug for Membrane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membrane")
            .field("strict", &self.inner.strict)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membrane_object::TransparentHandler;

    fn wrap(membrane: &Membrane, obj: &Object) -> Object {
        membrane
            .get_proxy(&Value::from(obj))
            .into_object()
            .expect("wrappable")
    }

    #[test]
    fn test_primitives_pass_through() {
        let membrane = Membrane::default();
        for value in [Value::Undefined, Value::Null, Value::from(1), Value::from("s")] {
            assert_eq!(membrane.get_proxy(&value), value);
            assert_eq!(membrane.get_read_only_proxy(&value), value);
            assert!(!membrane.is_wrappable(&value));
        }
    }

    #[test]
    fn test_host_objects_pass_through() {
        let membrane = Membrane::default();
        let host = Value::from(Object::new_host("Date"));
        assert_eq!(membrane.get_proxy(&host), host);
        assert_eq!(membrane.registry_stats().entries(), 0);
    }

    #[test]
    fn test_custom_observability() {
        let membrane = Membrane::new(
            MembraneOptions::default().with_value_is_observable(|obj| !obj.is_array()),
        );
        let array = Value::from(Object::new_array());
        assert_eq!(membrane.get_proxy(&array), array);
        assert!(membrane.is_wrappable(&Value::from(Object::new())));
    }

    #[test]
    fn test_identity_and_idempotence() {
        let membrane = Membrane::default();
        let original = Object::new();
        let proxy = wrap(&membrane, &original);

        assert!(!proxy.ptr_eq(&original));
        assert!(wrap(&membrane, &original).ptr_eq(&proxy));
        assert!(wrap(&membrane, &proxy).ptr_eq(&proxy));
        assert_eq!(membrane.unwrap(&Value::from(&proxy)), Value::from(&original));

        let metrics = membrane.metrics();
        assert_eq!(metrics.reactive_created, 1);
        assert_eq!(metrics.registry_hits, 2);
    }

    #[test]
    fn test_read_only_never_becomes_reactive() {
        let membrane = Membrane::default();
        let original = Object::new();
        let read_only = membrane.get_read_only_proxy(&Value::from(&original));

        assert_eq!(membrane.get_proxy(&read_only), read_only);

        // A reactive proxy converts to the read-only one
        let reactive = membrane.get_proxy(&Value::from(&original));
        assert_eq!(membrane.get_read_only_proxy(&reactive), read_only);
    }

    #[test]
    fn test_membranes_do_not_share_proxies() {
        let first = Membrane::default();
        let second = Membrane::default();
        let original = Object::new();

        let a = wrap(&first, &original);
        let b = wrap(&second, &original);
        assert!(!a.ptr_eq(&b));

        // A proxy from another membrane is unwrapped, then rewrapped here
        assert!(wrap(&second, &a).ptr_eq(&b));
    }

    #[test]
    fn test_foreign_proxy_is_wrapped() {
        let membrane = Membrane::default();
        let original = Object::new();
        let foreign = Object::new_proxy(original.clone(), Arc::new(TransparentHandler));

        let wrapped_foreign = wrap(&membrane, &foreign);
        let wrapped_original = wrap(&membrane, &original);
        assert!(!wrapped_foreign.ptr_eq(&wrapped_original));
        assert!(!wrapped_foreign.ptr_eq(&foreign));
    }

    #[test]
    fn test_unwrap_reactive_only_touches_own_reactive_proxies() {
        let membrane = Membrane::default();
        let other = Membrane::default();
        let original = Object::new();

        let reactive = membrane.get_proxy(&Value::from(&original));
        let read_only = membrane.get_read_only_proxy(&Value::from(&original));
        let foreign = other.get_proxy(&Value::from(&original));

        assert_eq!(membrane.unwrap_reactive(&reactive), Value::from(&original));
        assert_eq!(membrane.unwrap_reactive(&read_only), read_only);
        assert_eq!(membrane.unwrap_reactive(&foreign), foreign);
        assert_eq!(membrane.unwrap_reactive(&Value::from(1)), Value::from(1));
    }

    #[test]
    fn test_dropping_original_frees_entry() {
        let membrane = Membrane::default();
        {
            let original = Object::new();
            let _proxy = wrap(&membrane, &original);
        }
        assert_eq!(membrane.registry_stats().reactive_entries, 1);
        assert_eq!(membrane.purge(), 1);
        assert_eq!(membrane.registry_stats().reactive_entries, 0);
        assert_eq!(membrane.metrics().entries_swept, 1);
    }
}
