//! Host object model seen by the engine.
//!
//! The engine never owns performers or targets. It only needs to know which
//! [`Kind`] a value belongs to and how to read one of its attributes, which is
//! what [`Entity`] provides.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Runtime type tag of an entity, e.g. `User` or `Product`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(Cow<'static, str>);

impl Kind {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Kind {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for Kind {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Type descriptor used on the declaring side of a rule.
///
/// Some host model systems declare a model through a wrapper whose real
/// instance type lives under an `instance` field. Such descriptors are kept
/// as [`Descriptor::Wrapped`]; the standard type check does not look inside
/// them, a custom [`Hooks::is_instance_of`](crate::Hooks::is_instance_of) can.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Descriptor {
    Type(Kind),
    Wrapped { instance: Kind },
}

impl Descriptor {
    pub fn wrap(instance: impl Into<Kind>) -> Self {
        Descriptor::Wrapped {
            instance: instance.into(),
        }
    }

    /// The kind this descriptor names, looking through a wrapper.
    pub fn kind(&self) -> &Kind {
        match self {
            Descriptor::Type(kind) => kind,
            Descriptor::Wrapped { instance } => instance,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, Descriptor::Wrapped { .. })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Type(kind) => write!(f, "{kind}"),
            Descriptor::Wrapped { instance } => write!(f, "{{instance: {instance}}}"),
        }
    }
}

impl From<Kind> for Descriptor {
    fn from(value: Kind) -> Self {
        Descriptor::Type(value)
    }
}

impl From<&'static str> for Descriptor {
    fn from(value: &'static str) -> Self {
        Descriptor::Type(value.into())
    }
}

impl From<String> for Descriptor {
    fn from(value: String) -> Self {
        Descriptor::Type(value.into())
    }
}

/// Capability the host object system exposes to the engine.
pub trait Entity {
    fn kind(&self) -> Kind;

    /// Reads a named attribute. Entities without attributes keep the default.
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Query-side target: a concrete instance, or a type itself.
#[derive(Clone)]
pub enum Target<'a> {
    Instance(&'a dyn Entity),
    Type(Descriptor),
}

impl Target<'_> {
    /// Reads an attribute of an instance target. Types carry no attributes.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Target::Instance(entity) => entity.attribute(name),
            Target::Type(_) => None,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Target::Instance(entity) => entity.kind(),
            Target::Type(descriptor) => descriptor.kind().clone(),
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Target::Type(_))
    }
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Instance(entity) => f.debug_tuple("Instance").field(&entity.kind()).finish(),
            Target::Type(descriptor) => f.debug_tuple("Type").field(descriptor).finish(),
        }
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Instance(entity) => write!(f, "{}", entity.kind()),
            Target::Type(descriptor) => write!(f, "type {descriptor}"),
        }
    }
}

impl<'a, T: Entity> From<&'a T> for Target<'a> {
    fn from(value: &'a T) -> Self {
        Target::Instance(value)
    }
}

impl From<Descriptor> for Target<'_> {
    fn from(value: Descriptor) -> Self {
        Target::Type(value)
    }
}

impl From<Kind> for Target<'_> {
    fn from(value: Kind) -> Self {
        Target::Type(value.into())
    }
}

/// Dynamically typed entity: a kind plus a JSON attribute object.
///
/// Useful when performers or targets arrive as payloads rather than typed
/// host models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    kind: Kind,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl Record {
    pub fn new(kind: impl Into<Kind>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Map::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl Entity for Record {
    fn kind(&self) -> Kind {
        self.kind.clone()
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).cloned()
    }
}
