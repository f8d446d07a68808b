//! Extension points injected into an [`Engine`](crate::Engine) at construction.

use std::fmt;
use std::sync::Arc;

use crate::entity::{Descriptor, Entity, Target};
use crate::error::Error;

/// Type identity and error construction used by the engine.
///
/// `is_instance_of` is consulted for both the performer check and the target
/// check. `build_error` produces the value `authorize` returns on denial.
pub trait Hooks {
    type Error;

    fn is_instance_of(&self, value: &Target<'_>, descriptor: &Descriptor) -> bool {
        standard_is_instance_of(value, descriptor)
    }

    fn build_error(&self, performer: &dyn Entity, action: &str, target: &Target<'_>)
    -> Self::Error;
}

/// Plain type membership. Wrapped descriptors only match an equal type target.
pub fn standard_is_instance_of(value: &Target<'_>, descriptor: &Descriptor) -> bool {
    match (value, descriptor) {
        (Target::Type(declared), _) => declared == descriptor,
        (Target::Instance(entity), Descriptor::Type(kind)) => entity.kind() == *kind,
        (Target::Instance(_), Descriptor::Wrapped { .. }) => false,
    }
}

pub fn standard_error(performer: &dyn Entity, action: &str, target: &Target<'_>) -> Error {
    Error::Unauthorized {
        performer: performer.kind(),
        action: action.to_owned(),
        target: target.to_string(),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardHooks;

impl Hooks for StandardHooks {
    type Error = Error;

    fn build_error(&self, performer: &dyn Entity, action: &str, target: &Target<'_>) -> Error {
        standard_error(performer, action, target)
    }
}

pub type InstanceOf = Arc<dyn Fn(&Target<'_>, &Descriptor) -> bool + Send + Sync>;

pub type CreateError<E> = Arc<dyn Fn(&dyn Entity, &str, &Target<'_>) -> E + Send + Sync>;

/// Closure based engine configuration.
///
/// Unset hooks fall back to [`standard_is_instance_of`] and [`standard_error`].
/// Setting `create_error` changes the error type `authorize` returns.
pub struct EngineConfig<E = Error> {
    instance_of: Option<InstanceOf>,
    create_error: CreateError<E>,
}

impl Default for EngineConfig<Error> {
    fn default() -> Self {
        Self {
            instance_of: None,
            create_error: Arc::new(standard_error),
        }
    }
}

impl EngineConfig<Error> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E> EngineConfig<E> {
    pub fn instance_of<F>(mut self, instance_of: F) -> Self
    where
        F: Fn(&Target<'_>, &Descriptor) -> bool + Send + Sync + 'static,
    {
        self.instance_of = Some(Arc::new(instance_of));
        self
    }

    pub fn create_error<F, T>(self, create_error: F) -> EngineConfig<T>
    where
        F: Fn(&dyn Entity, &str, &Target<'_>) -> T + Send + Sync + 'static,
    {
        EngineConfig {
            instance_of: self.instance_of,
            create_error: Arc::new(create_error),
        }
    }
}

impl<E> Clone for EngineConfig<E> {
    fn clone(&self) -> Self {
        Self {
            instance_of: self.instance_of.clone(),
            create_error: Arc::clone(&self.create_error),
        }
    }
}

impl<E> fmt::Debug for EngineConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("custom_instance_of", &self.instance_of.is_some())
            .finish_non_exhaustive()
    }
}

impl<E> Hooks for EngineConfig<E> {
    type Error = E;

    fn is_instance_of(&self, value: &Target<'_>, descriptor: &Descriptor) -> bool {
        match &self.instance_of {
            Some(instance_of) => instance_of(value, descriptor),
            None => standard_is_instance_of(value, descriptor),
        }
    }

    fn build_error(&self, performer: &dyn Entity, action: &str, target: &Target<'_>) -> E {
        (self.create_error)(performer, action, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Kind, Record};

    #[test]
    fn instances_match_their_own_kind() {
        let user = Record::new("User");
        let target = Target::from(&user);
        assert!(standard_is_instance_of(&target, &Descriptor::from("User")));
        assert!(!standard_is_instance_of(&target, &Descriptor::from("Product")));
    }

    #[test]
    fn type_targets_match_equal_descriptors() {
        let target = Target::from(Kind::from_static("Product"));
        assert!(standard_is_instance_of(&target, &Descriptor::from("Product")));
        assert!(!standard_is_instance_of(&target, &Descriptor::wrap("Product")));
    }

    #[test]
    fn wrapped_descriptors_need_a_custom_check() {
        let user = Record::new("User");
        let target = Target::from(&user);
        let wrapped = Descriptor::wrap("User");
        assert!(!StandardHooks.is_instance_of(&target, &wrapped));

        let config = EngineConfig::new().instance_of(|value, descriptor| {
            value.kind() == *descriptor.kind()
        });
        assert!(config.is_instance_of(&target, &wrapped));
    }

    #[test]
    fn custom_error_factory_changes_error_type() {
        let config = EngineConfig::new()
            .create_error(|performer, action, _| format!("{} may not {action}", performer.kind()));
        let user = Record::new("User");
        let product = Record::new("Product");
        let err = config.build_error(&user, "delete", &Target::from(&product));
        assert_eq!(err, "User may not delete");
    }

    #[test]
    fn default_error_describes_denial() {
        let user = Record::new("User");
        let err = StandardHooks.build_error(&user, "create", &Target::from(Kind::from_static("Product")));
        assert_eq!(
            err.to_string(),
            "Authorization error: User cannot create type Product"
        );
    }
}
