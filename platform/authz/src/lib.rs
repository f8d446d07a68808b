//! Attribute based authorization engine.
//!
//! Rules are registered with [`Engine::allow`] / [`Engine::allow_when`] and
//! queried with [`Engine::can`], [`Engine::cannot`] and [`Engine::authorize`].
//! Any matching rule grants the action; there are no deny rules.
//!
//! ```
//! use serde_json::json;
//! use warden_authz::{Engine, Kind, Record};
//!
//! const USER: Kind = Kind::from_static("User");
//! const PRODUCT: Kind = Kind::from_static("Product");
//!
//! let mut engine = Engine::new();
//! engine.allow_when(USER, "read", PRODUCT, json!({ "published": true }))?;
//!
//! let user = Record::new(USER);
//! let draft = Record::new(PRODUCT);
//! let live = Record::new(PRODUCT).with("published", true);
//!
//! assert!(!engine.can(&user, "read", &draft)?);
//! assert!(engine.can(&user, "read", &live)?);
//! assert!(engine.authorize(&user, "delete", &live).is_err());
//! # Ok::<(), warden_authz::Error>(())
//! ```

mod engine;
mod entity;
mod error;
mod hooks;
mod rule;

pub use engine::Engine;
pub use entity::{Descriptor, Entity, Kind, Record, Target};
pub use error::{BoxError, Denial, Error, Result};
pub use hooks::{
    CreateError, EngineConfig, Hooks, InstanceOf, StandardHooks, standard_error,
    standard_is_instance_of,
};
pub use rule::{
    ALL, Actions, Attributes, Condition, IntoCondition, MANAGE, Options, Predicate, Rule,
    TargetType,
};
