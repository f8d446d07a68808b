//! Rule records and their building blocks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use crate::entity::{Descriptor, Entity, Kind, Target};
use crate::error::{BoxError, Error, Result};

/// Action alias matching every action name.
pub const MANAGE: &str = "manage";

/// Target alias matching every target, instance or type.
pub const ALL: &str = "all";

/// Caller-supplied context only predicate conditions observe.
pub type Options = Map<String, Value>;

/// Attribute map a target must match key by key.
pub type Attributes = Map<String, Value>;

/// Shared predicate condition over `(performer, target, options)`.
pub type Predicate = Arc<
    dyn Fn(&dyn Entity, &Target<'_>, &Options) -> std::result::Result<bool, BoxError>
        + Send
        + Sync,
>;

/// Set of action names granted by one rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Actions(BTreeSet<String>);

impl Actions {
    pub fn contains(&self, action: &str) -> bool {
        self.0.contains(action)
    }

    /// True when `action` is listed or the set holds [`MANAGE`].
    pub fn matches(&self, action: &str) -> bool {
        self.contains(action) || self.contains(MANAGE)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Actions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Actions {
    fn from(value: &str) -> Self {
        std::iter::once(value).collect()
    }
}

impl From<String> for Actions {
    fn from(value: String) -> Self {
        std::iter::once(value).collect()
    }
}

impl<const N: usize> From<[&str; N]> for Actions {
    fn from(value: [&str; N]) -> Self {
        value.into_iter().collect()
    }
}

impl From<&[&str]> for Actions {
    fn from(value: &[&str]) -> Self {
        value.iter().copied().collect()
    }
}

impl From<Vec<&str>> for Actions {
    fn from(value: Vec<&str>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Vec<String>> for Actions {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl fmt::Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Target side of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetType {
    All,
    Type(Descriptor),
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::All => f.write_str(ALL),
            TargetType::Type(descriptor) => write!(f, "{descriptor}"),
        }
    }
}

impl From<Descriptor> for TargetType {
    fn from(value: Descriptor) -> Self {
        TargetType::Type(value)
    }
}

impl From<Kind> for TargetType {
    fn from(value: Kind) -> Self {
        TargetType::Type(value.into())
    }
}

impl From<&'static str> for TargetType {
    fn from(value: &'static str) -> Self {
        if value == ALL {
            TargetType::All
        } else {
            TargetType::Type(value.into())
        }
    }
}

impl From<String> for TargetType {
    fn from(value: String) -> Self {
        if value == ALL {
            TargetType::All
        } else {
            TargetType::Type(value.into())
        }
    }
}

/// Extra requirement a rule places on a query, decided at registration.
#[derive(Clone, Default)]
pub enum Condition {
    #[default]
    None,
    Attributes(Attributes),
    Predicate(Predicate),
}

impl Condition {
    /// Wraps an infallible predicate over `(performer, target, options)`.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&dyn Entity, &Target<'_>, &Options) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(
            move |performer: &dyn Entity, target: &Target<'_>, options: &Options| {
                Ok(predicate(performer, target, options))
            },
        ))
    }

    /// Wraps a fallible predicate. Its errors reach the caller of `can`.
    pub fn try_when<F, E>(predicate: F) -> Self
    where
        F: Fn(&dyn Entity, &Target<'_>, &Options) -> std::result::Result<bool, E>
            + Send
            + Sync
            + 'static,
        E: Into<BoxError>,
    {
        Condition::Predicate(Arc::new(
            move |performer: &dyn Entity, target: &Target<'_>, options: &Options| {
                predicate(performer, target, options).map_err(Into::into)
            },
        ))
    }

    pub fn attributes(attributes: Attributes) -> Self {
        Condition::Attributes(attributes)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Condition::None)
    }

    pub(crate) fn evaluate(
        &self,
        performer: &dyn Entity,
        target: &Target<'_>,
        options: &Options,
    ) -> Result<bool> {
        match self {
            Condition::None => Ok(true),
            Condition::Attributes(expected) => Ok(expected
                .iter()
                .all(|(name, value)| {
                    target
                        .attribute(name)
                        .is_some_and(|actual| attribute_equals(&actual, value))
                })),
            Condition::Predicate(predicate) => {
                predicate(performer, target, options).map_err(Error::Condition)
            }
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::None => f.write_str("None"),
            Condition::Attributes(attributes) => {
                f.debug_tuple("Attributes").field(attributes).finish()
            }
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Conversion of registration-time condition input into a [`Condition`].
pub trait IntoCondition {
    fn into_condition(self) -> Result<Condition>;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Result<Condition> {
        Ok(self)
    }
}

impl IntoCondition for Option<Condition> {
    fn into_condition(self) -> Result<Condition> {
        Ok(self.unwrap_or_default())
    }
}

impl IntoCondition for Attributes {
    fn into_condition(self) -> Result<Condition> {
        Ok(Condition::Attributes(self))
    }
}

impl IntoCondition for BTreeMap<String, Value> {
    fn into_condition(self) -> Result<Condition> {
        Ok(Condition::Attributes(self.into_iter().collect()))
    }
}

/// Dynamic input: `null` is no condition, an object is an attribute map,
/// anything else is rejected.
impl IntoCondition for Value {
    fn into_condition(self) -> Result<Condition> {
        match self {
            Value::Null => Ok(Condition::None),
            Value::Object(attributes) => Ok(Condition::Attributes(attributes)),
            other => Err(Error::InvalidCondition {
                received: json_type_name(&other),
            }),
        }
    }
}

/// Plain JSON equality, except numbers compare by value so `10` equals `10.0`.
fn attribute_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(actual), Value::Number(expected)) => numbers_equal(actual, expected),
        _ => actual == expected,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One registration: who may do which actions to what, under which condition.
#[derive(Clone, Debug)]
pub struct Rule {
    performer: Descriptor,
    actions: Actions,
    target: TargetType,
    condition: Condition,
}

impl Rule {
    pub(crate) fn new(
        performer: Descriptor,
        actions: Actions,
        target: TargetType,
        condition: Condition,
    ) -> Result<Self> {
        if actions.is_empty() {
            return Err(Error::NoActions);
        }
        Ok(Self {
            performer,
            actions,
            target,
            condition,
        })
    }

    pub fn performer(&self) -> &Descriptor {
        &self.performer
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    pub fn target(&self) -> &TargetType {
        &self.target
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn allows_action(&self, action: &str) -> bool {
        self.actions.matches(action)
    }
}
