//=========================================================================
// Port Values
//=========================================================================
//
// The closed set of value types that flow along graph edges.
//
// Architecture:
//   PortType   declared type of a port (signature level)
//   PortValue  tagged value stored in a port slot (tick level)
//   PortData   maps Rust types onto PortType for typed get/set
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use super::world::EntityId;

//=== PortType ============================================================

/// Declared type of a node port.
///
/// Edges require exact type equality between the source output and the
/// destination input. There are no implicit conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Bool,
    Int,
    Float,
    Text,
    Entity,
}

impl PortType {
    /// Returns the value a port of this type holds when nothing was written.
    pub fn default_value(self) -> PortValue {
        match self {
            Self::Bool => PortValue::Bool(false),
            Self::Int => PortValue::Int(0),
            Self::Float => PortValue::Float(0.0),
            Self::Text => PortValue::Text(String::new()),
            Self::Entity => PortValue::Entity(EntityId::default()),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Entity => "entity",
        };
        f.write_str(name)
    }
}

//=== PortValue ===========================================================

/// A single value held by an input or output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Entity(EntityId),
}

impl PortValue {
    /// Returns the type tag of this value.
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::Text(_) => PortType::Text,
            Self::Entity(_) => PortType::Entity,
        }
    }

    /// Extracts the payload as `T`, or `None` if the tag differs.
    pub fn get<T: PortData>(&self) -> Option<T> {
        T::from_value(self)
    }
}

//=== PortData ============================================================

/// Rust types that can be read from and written to ports.
///
/// Implemented for `bool`, `i64`, `f64`, `String` and [`EntityId`].
pub trait PortData: Sized {
    /// The port type this Rust type maps onto.
    const TYPE: PortType;

    /// Extracts the payload if `value` carries this type.
    fn from_value(value: &PortValue) -> Option<Self>;

    /// Wraps the payload in a tagged value.
    fn into_value(self) -> PortValue;

    /// The type-default of this port type.
    fn type_default() -> Self {
        Self::from_value(&Self::TYPE.default_value())
            .unwrap_or_else(|| unreachable!("type default always matches its own type"))
    }
}

macro_rules! impl_port_data {
    ($ty:ty, $variant:ident, |$v:ident| $extract:expr) => {
        impl PortData for $ty {
            const TYPE: PortType = PortType::$variant;

            fn from_value(value: &PortValue) -> Option<Self> {
                match value {
                    PortValue::$variant($v) => Some($extract),
                    _ => None,
                }
            }

            fn into_value(self) -> PortValue {
                PortValue::$variant(self)
            }
        }

        impl From<$ty> for PortValue {
            fn from(value: $ty) -> Self {
                value.into_value()
            }
        }
    };
}

impl_port_data!(bool, Bool, |v| *v);
impl_port_data!(i64, Int, |v| *v);
impl_port_data!(f64, Float, |v| *v);
impl_port_data!(String, Text, |v| v.clone());
impl_port_data!(EntityId, Entity, |v| *v);

impl From<&str> for PortValue {
    fn from(value: &str) -> Self {
        PortValue::Text(value.to_owned())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
