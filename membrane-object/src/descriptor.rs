//! Property descriptors

use crate::object::Object;
use crate::value::Value;

/// A property descriptor: either a data slot or an accessor pair
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDescriptor {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<Object>,
        set: Option<Object>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// A writable, enumerable, configurable data descriptor
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor descriptor
    pub fn accessor(get: Option<Object>, set: Option<Object>) -> Self {
        Self::Accessor {
            get,
            set,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn with_writable(mut self, flag: bool) -> Self {
        if let Self::Data { writable, .. } = &mut self {
            *writable = flag;
        }
        self
    }

    pub fn with_enumerable(mut self, flag: bool) -> Self {
        match &mut self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable = flag,
        }
        self
    }

    pub fn with_configurable(mut self, flag: bool) -> Self {
        match &mut self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => {
                *configurable = flag
            }
        }
        self
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }

    /// Is this a data descriptor with writable=true?
    pub fn is_writable(&self) -> bool {
        match self {
            Self::Data { writable, .. } => *writable,
            Self::Accessor { .. } => false,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    pub fn getter(&self) -> Option<&Object> {
        match self {
            Self::Accessor { get, .. } => get.as_ref(),
            Self::Data { .. } => None,
        }
    }

    pub fn setter(&self) -> Option<&Object> {
        match self {
            Self::Accessor { set, .. } => set.as_ref(),
            Self::Data { .. } => None,
        }
    }

    /// Replace the value of a data descriptor; accessors are returned unchanged
    pub fn map_value(self, f: impl FnOnce(Value) -> Value) -> Self {
        match self {
            Self::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => Self::Data {
                value: f(value),
                writable,
                enumerable,
                configurable,
            },
            accessor => accessor,
        }
    }

    pub fn set_non_configurable(&mut self) {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => {
                *configurable = false;
            }
        }
    }

    /// Make this data descriptor non-writable (no-op for accessors)
    pub fn set_non_writable(&mut self) {
        if let Self::Data { writable, .. } = self {
            *writable = false;
        }
    }
}
