//! Dynamic object model for the reactive membrane
//!
//! Objects here behave like script-engine objects: string- or symbol-keyed
//! properties with data or accessor descriptors, a prototype chain,
//! extensibility, and optional call behavior. Any object may instead be a
//! proxy whose operations are intercepted by a [`ProxyHandler`]; results
//! are checked against the proxy target so a handler cannot misreport
//! non-configurable state.
//!
//! ```
//! use membrane_object::{Object, Value};
//!
//! let obj = Object::from_entries([("x", 1)]);
//! obj.set("y", 2).unwrap();
//! assert_eq!(obj.get("y").unwrap(), Value::from(2));
//! assert_eq!(obj.keys().unwrap(), vec!["x", "y"]);
//! ```

pub mod descriptor;
pub mod error;
pub mod handler;
pub mod invariants;
pub mod object;
pub mod ordinary;
pub mod value;

pub use descriptor::PropertyDescriptor;
pub use error::{ObjectError, Result};
pub use handler::{ProxyHandler, TransparentHandler};
pub use object::{NativeFunction, Object, ObjectClass, WeakObject, MAX_PROTOTYPE_CHAIN_DEPTH};
pub use value::Value;

pub use membrane_types::{Mutation, ObjectId, PropertyKey, ProxyKind, Symbol};
