//! Shared types for the reactive membrane
//!
//! This crate provides the identity and key types used across the membrane
//! workspace: object identifiers, unforgeable symbols, property keys, the two
//! proxy kinds and the description of a rejected mutation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static OBJECT_COUNTER: AtomicU64 = AtomicU64::new(1);
static SYMBOL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Object identifier
///
/// Every object allocated by the object model gets a process-unique id.
/// Ids are never reused, so a stale id can never alias a newer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Allocate the next object id
    pub fn next() -> Self {
        Self(OBJECT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Symbol identifier
///
/// The inner value is private: symbols can only be minted through
/// [`Symbol::new`], which makes them unforgeable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u64);

impl SymbolId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A unique symbol, usable as a property key
///
/// Two symbols are equal only if they come from the same call to
/// [`Symbol::new`]; the description is informational.
#[derive(Debug, Clone)]
pub struct Symbol {
    id: SymbolId,
    description: Option<Arc<str>>,
}

impl Symbol {
    /// Mint a new symbol with a description
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: SymbolId(SYMBOL_COUNTER.fetch_add(1, Ordering::Relaxed)),
            description: Some(description.into()),
        }
    }

    /// Mint a new symbol without a description
    pub fn anonymous() -> Self {
        Self {
            id: SymbolId(SYMBOL_COUNTER.fetch_add(1, Ordering::Relaxed)),
            description: None,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "Symbol({desc})"),
            None => write!(f, "Symbol()"),
        }
    }
}

/// A property key: either a string or a symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(Symbol),
}

impl PropertyKey {
    /// Key for an array index
    pub fn index(index: usize) -> Self {
        Self::String(index.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::String(_) => None,
            Self::Symbol(sym) => Some(sym),
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// The array index this key denotes, if it is a canonical index string
    ///
    /// Canonical means no sign, no leading zeros (except "0" itself) and a
    /// value below `u32::MAX`.
    pub fn array_index(&self) -> Option<u32> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match s.parse::<u64>() {
            Ok(n) if n < u64::from(u32::MAX) => Some(n as u32),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Symbol(sym) => write!(f, "{sym}"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for PropertyKey {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<Symbol> for PropertyKey {
    fn from(sym: Symbol) -> Self {
        Self::Symbol(sym)
    }
}

impl From<&Symbol> for PropertyKey {
    fn from(sym: &Symbol) -> Self {
        Self::Symbol(sym.clone())
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        Self::index(index)
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}

/// The two wrapping policies of the membrane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    /// Mutable, observed view
    Reactive,

    /// Immutable, observed view
    ReadOnly,
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyKind::Reactive => write!(f, "reactive"),
            ProxyKind::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// A write-family operation, as reported when it is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set(PropertyKey),
    Delete(PropertyKey),
    DefineProperty(PropertyKey),
    SetPrototypeOf,
    PreventExtensions,
}

impl Mutation {
    /// The property key targeted by the operation, if any
    pub fn key(&self) -> Option<&PropertyKey> {
        match self {
            Mutation::Set(key) | Mutation::Delete(key) | Mutation::DefineProperty(key) => {
                Some(key)
            }
            Mutation::SetPrototypeOf | Mutation::PreventExtensions => None,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Set(key) => write!(f, "set \"{key}\""),
            Mutation::Delete(key) => write!(f, "delete \"{key}\""),
            Mutation::DefineProperty(key) => write!(f, "defineProperty \"{key}\""),
            Mutation::SetPrototypeOf => write!(f, "set prototype"),
            Mutation::PreventExtensions => write!(f, "preventExtensions"),
        }
    }
}
