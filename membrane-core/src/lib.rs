//! Reactive and read-only membranes
//!
//! A [`Membrane`] wraps a graph of objects in proxies, lazily and one level
//! at a time. Every read through a proxy is reported to `value_observed` and
//! every write through a reactive proxy to `value_mutated`, while the
//! original objects stay untouched by the wrapping itself.
//!
//! # Identity
//!
//! For each original there is at most one live proxy per kind. Wrapping a
//! proxy recovers its original first, so proxies never nest, and a
//! read-only proxy is never turned back into a mutable one.
//!
//! # Example
//!
//! ```
//! use membrane_core::{Membrane, MembraneOptions};
//! use membrane_object::{Object, Value};
//! use std::sync::{Arc, Mutex};
//!
//! let reads = Arc::new(Mutex::new(Vec::new()));
//! let sink = reads.clone();
//! let membrane = Membrane::new(
//!     MembraneOptions::default()
//!         .strict(true)
//!         .with_value_observed(move |_, key| sink.lock().unwrap().push(key.to_string())),
//! );
//!
//! let state = Object::from_entries([("count", 1)]);
//! let view = membrane.get_read_only_proxy(&Value::from(&state));
//! let view = view.as_object().unwrap();
//!
//! assert_eq!(view.get("count").unwrap(), Value::from(1));
//! assert!(view.set("count", 2).is_err());
//! assert_eq!(*reads.lock().unwrap(), vec!["count"]);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
mod handler;
pub mod membrane;
pub mod metrics;
mod registry;
mod shared;

pub use config::{ConfigError, MembraneConfig};
pub use membrane::{Membrane, MembraneOptions, ValueIsObservable, ValueMutated, ValueObserved};
pub use metrics::{MembraneMetrics, MetricsSnapshot};
pub use registry::RegistryStats;

/// Commonly used types
pub mod prelude {
    pub use crate::{Membrane, MembraneConfig, MembraneOptions};
    pub use membrane_object::{Object, ObjectError, PropertyDescriptor, Value};
    pub use membrane_types::{PropertyKey, ProxyKind, Symbol};
}
