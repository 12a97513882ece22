//! Static type descriptions for generated API documents.
//!
//! A type documents its own structure by implementing [`Describe`]:
//!
//! ```rust
//! use overmux::{Describe, ObjectShape, Shape};
//!
//! struct User {
//!     id: String,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Describe for User {
//!     fn describe() -> Shape {
//!         ObjectShape::new("User")
//!             .field_as::<String>("ID", "id")
//!             .field_as::<String>("Name", "name")
//!             .field::<Vec<String>>("tags")
//!             .into()
//!     }
//! }
//! ```
//!
//! Field shapes are resolved lazily, so self-referential types describe
//! themselves without recursing forever.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use crate::openapi::SchemaType;

/// A type that can describe its JSON structure.
pub trait Describe {
    fn describe() -> Shape;
}

/// The structural classes a documented value can fall into.
#[derive(Debug, Clone)]
pub enum Shape {
    Primitive(Primitive),
    Object(ObjectShape),
    Array(Box<Shape>),
    /// No JSON-schema counterpart; documented as a string.
    Unsupported,
}

impl Shape {
    /// Shorthand for `T::describe()`.
    pub fn of<T: Describe + ?Sized>() -> Self {
        T::describe()
    }

    pub fn array_of<T: Describe + ?Sized>() -> Self {
        Self::Array(Box::new(T::describe()))
    }
}

impl From<ObjectShape> for Shape {
    fn from(object: ObjectShape) -> Self {
        Self::Object(object)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
}

impl Primitive {
    pub(crate) fn schema_type(self) -> SchemaType {
        match self {
            Self::String => SchemaType::String,
            Self::Integer => SchemaType::Integer,
            Self::Number => SchemaType::Number,
            Self::Boolean => SchemaType::Boolean,
        }
    }
}

/// A named object with ordered fields.
#[derive(Debug, Clone)]
pub struct ObjectShape {
    pub(crate) name: String,
    pub(crate) fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub(crate) struct Field {
    name: String,
    alias: Option<String>,
    shape: fn() -> Shape,
}

impl Field {
    /// The property name in the document: the alias when one is set.
    pub(crate) fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl ObjectShape {
    /// `name` becomes the component name in the document.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field<T: Describe + ?Sized>(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field { name: name.into(), alias: None, shape: T::describe });
        self
    }

    /// A field whose serialized name differs from its declared one.
    pub fn field_as<T: Describe + ?Sized>(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.fields.push(Field { name: name.into(), alias: Some(alias.into()), shape: T::describe });
        self
    }

    /// Property names, aliases applied, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::key)
    }
}

macro_rules! describe_as {
    ($shape:expr => $($ty:ty),+ $(,)?) => {
        $(impl Describe for $ty {
            fn describe() -> Shape { $shape }
        })+
    };
}

describe_as!(Shape::Primitive(Primitive::String) => String, str, char);
describe_as!(Shape::Primitive(Primitive::Integer) => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(Shape::Primitive(Primitive::Number) => f32, f64);
describe_as!(Shape::Primitive(Primitive::Boolean) => bool);
describe_as!(Shape::Unsupported => (), serde_json::Value);

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Shape { Shape::array_of::<T>() }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> Shape { Shape::array_of::<T>() }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> Shape { Shape::array_of::<T>() }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe + ?Sized> Describe for Rc<T> {
    fn describe() -> Shape { T::describe() }
}

impl<K, V, S> Describe for HashMap<K, V, S> {
    fn describe() -> Shape { Shape::Unsupported }
}

impl<K, V> Describe for BTreeMap<K, V> {
    fn describe() -> Shape { Shape::Unsupported }
}
