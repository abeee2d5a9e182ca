//! Host callback interface
//!
//! The codec never sees host data directly. It walks a block's fields and
//! asks a [`Getter`] for each value on encode, or hands each decoded value
//! to a [`Setter`]. Nested blocks and lists are reached through opaque
//! `Userdata` handles returned by the host.

use thiserror::Error;

use crate::schema::ValueKind;

/// Identifies the field being read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey<'a> {
    /// Name of the block that declares the field
    pub block: &'a str,
    pub name: &'a str,
    /// Element index for list items; `None` for scalars and list counts
    pub index: Option<usize>,
    /// Referenced block name for custom-typed fields
    pub type_name: Option<&'a str>,
    /// Declared kind of the field
    pub kind: ValueKind,
    pub is_list: bool,
}

/// A value supplied by a [`Getter`]
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a, U> {
    Integer(i64),
    /// Accepted by the type system but rejected by the codec
    Number(f64),
    String(&'a [u8]),
    /// Handle to the host object backing a nested block
    Custom(U),
    Nil,
}

impl<U> Value<'_, U> {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Custom(_) => ValueKind::Custom,
            Value::Nil => ValueKind::Nil,
        }
    }
}

/// A value handed to a [`Setter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    Integer(i64),
    /// Borrowed from the decode buffer; copy it to keep it
    String(&'a [u8]),
    /// A nested block follows; return a handle for it
    Custom,
    /// A list of this many elements follows; return a handle for it
    List(usize),
    /// Field absent, or optional field whose tag did not match
    Nil,
}

/// Failure reported by a host callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read access to host data during encode
pub trait Getter {
    type Userdata;

    /// Return the value for `key` in the object behind `ud`
    ///
    /// For list fields the codec first calls with `key.index == None`
    /// and expects the element count as an `Integer`, then once per
    /// element with the same `ud`.
    fn get<'a>(
        &'a self,
        ud: &'a Self::Userdata,
        key: &FieldKey<'_>,
    ) -> Result<Value<'a, Self::Userdata>, HostError>;
}

/// Write access to host data during decode
pub trait Setter {
    type Userdata;

    /// Store `value` for `key` in the object behind `ud`
    ///
    /// Must return a child handle for [`Decoded::Custom`] and
    /// [`Decoded::List`]; list elements are then set against the list
    /// handle. The return value is ignored for everything else.
    fn set(
        &mut self,
        ud: &Self::Userdata,
        key: &FieldKey<'_>,
        value: Decoded<'_>,
    ) -> Result<Option<Self::Userdata>, HostError>;
}
