use tracing::{debug, trace};

use crate::entity::{Descriptor, Entity, Target};
use crate::error::{Denial, Result};
use crate::hooks::{EngineConfig, Hooks, StandardHooks};
use crate::rule::{Actions, Condition, IntoCondition, Options, Rule, TargetType};

/// Rule registry plus the queries resolved against it.
///
/// Rules are only added through `&mut self`, queries only read through
/// `&self`, so a shared engine is read-only. Build it first, then share it.
#[derive(Debug)]
pub struct Engine<H = StandardHooks> {
    rules: Vec<Rule>,
    hooks: H,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_hooks(StandardHooks)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Engine<EngineConfig<E>> {
    pub fn with_config(config: EngineConfig<E>) -> Self {
        Self::with_hooks(config)
    }
}

impl<H: Hooks> Engine<H> {
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            rules: Vec::new(),
            hooks,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Registers an unconditional rule.
    pub fn allow(
        &mut self,
        performer: impl Into<Descriptor>,
        actions: impl Into<Actions>,
        target: impl Into<TargetType>,
    ) -> Result<()> {
        self.allow_when(performer, actions, target, Condition::None)
    }

    /// Registers a rule guarded by `condition`.
    ///
    /// All `actions` share the one rule and its condition.
    pub fn allow_when(
        &mut self,
        performer: impl Into<Descriptor>,
        actions: impl Into<Actions>,
        target: impl Into<TargetType>,
        condition: impl IntoCondition,
    ) -> Result<()> {
        let condition = condition.into_condition()?;
        let rule = Rule::new(performer.into(), actions.into(), target.into(), condition)?;
        debug!(
            performer = %rule.performer(),
            actions = %rule.actions(),
            target = %rule.target(),
            condition = ?rule.condition(),
            "rule registered"
        );
        self.rules.push(rule);
        Ok(())
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn can<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
    ) -> Result<bool> {
        self.can_with(performer, action, target, &Options::new())
    }

    /// True when any rule grants `action` on `target` to `performer`.
    ///
    /// Predicate errors are returned as [`crate::Error::Condition`], never read as a
    /// denial.
    pub fn can_with<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
        options: &Options,
    ) -> Result<bool> {
        let target = target.into();
        for (index, rule) in self.rules.iter().enumerate() {
            if !self.rule_applies(rule, performer, action, &target) {
                continue;
            }
            if rule.condition().evaluate(performer, &target, options)? {
                trace!(index, action, target = %target, "rule matched");
                return Ok(true);
            }
        }
        debug!(performer = %performer.kind(), action, target = %target, "no rule matched");
        Ok(false)
    }

    pub fn cannot<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
    ) -> Result<bool> {
        self.cannot_with(performer, action, target, &Options::new())
    }

    pub fn cannot_with<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
        options: &Options,
    ) -> Result<bool> {
        Ok(!self.can_with(performer, action, target, options)?)
    }

    pub fn authorize<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
    ) -> std::result::Result<(), Denial<H::Error>> {
        self.authorize_with(performer, action, target, &Options::new())
    }

    /// Returns the hook-built error, unchanged, as [`Denial::Denied`] when
    /// `can_with` denies. Predicate failures come back as
    /// [`Denial::Condition`].
    pub fn authorize_with<'t>(
        &self,
        performer: &dyn Entity,
        action: &str,
        target: impl Into<Target<'t>>,
        options: &Options,
    ) -> std::result::Result<(), Denial<H::Error>> {
        let target = target.into();
        if self
            .can_with(performer, action, target.clone(), options)
            .map_err(Denial::Condition)?
        {
            return Ok(());
        }
        Err(Denial::Denied(
            self.hooks.build_error(performer, action, &target),
        ))
    }

    fn rule_applies(
        &self,
        rule: &Rule,
        performer: &dyn Entity,
        action: &str,
        target: &Target<'_>,
    ) -> bool {
        rule.allows_action(action)
            && self.target_matches(rule.target(), target)
            && self
                .hooks
                .is_instance_of(&Target::Instance(performer), rule.performer())
    }

    fn target_matches(&self, expected: &TargetType, target: &Target<'_>) -> bool {
        match expected {
            TargetType::All => true,
            TargetType::Type(descriptor) => {
                matches!(target, Target::Type(declared) if declared == descriptor)
                    || self.hooks.is_instance_of(target, descriptor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Kind, Record};
    use crate::error::Error;
    use crate::rule::{ALL, MANAGE};
    use serde_json::json;

    const USER: Kind = Kind::from_static("User");
    const PRODUCT: Kind = Kind::from_static("Product");

    fn user() -> Record {
        Record::new(USER)
    }

    fn product() -> Record {
        Record::new(PRODUCT)
    }

    #[test]
    fn unconditional_rule_ignores_attributes() {
        let mut engine = Engine::new();
        engine.allow(USER, "read", PRODUCT).unwrap();

        let draft = product().with("published", false);
        assert!(engine.can(&user(), "read", &product()).unwrap());
        assert!(engine.can(&user(), "read", &draft).unwrap());
        assert!(!engine.can(&user(), "create", &product()).unwrap());
    }

    #[test]
    fn list_registration_creates_one_rule() {
        let mut engine = Engine::new();
        engine
            .allow(USER, ["read", "create", "destroy"], PRODUCT)
            .unwrap();

        assert_eq!(engine.len(), 1);
        for action in ["read", "create", "destroy"] {
            assert!(engine.can(&user(), action, &product()).unwrap());
        }
        assert!(!engine.can(&user(), "update", &product()).unwrap());
    }

    #[test]
    fn manage_and_all_are_wildcards() {
        let mut engine = Engine::new();
        engine.allow(USER, MANAGE, ALL).unwrap();

        assert!(engine.can(&user(), "modify", &product()).unwrap());
        assert!(engine.can(&user(), "read", &user()).unwrap());
        assert!(engine.can(&user(), "read", PRODUCT).unwrap());
        assert!(engine.can(&user(), "read", USER).unwrap());
    }

    #[test]
    fn performer_type_must_match() {
        let mut engine = Engine::new();
        engine.allow("Admin", MANAGE, ALL).unwrap();

        assert!(!engine.can(&user(), "read", &product()).unwrap());
        assert!(engine.can(&Record::new("Admin"), "read", &product()).unwrap());
    }

    #[test]
    fn type_targets_match_declared_type() {
        let mut engine = Engine::new();
        engine.allow(USER, "create", PRODUCT).unwrap();

        assert!(engine.can(&user(), "create", PRODUCT).unwrap());
        assert!(!engine.can(&user(), "create", USER).unwrap());
    }

    #[test]
    fn attribute_condition_never_matches_a_type() {
        let mut engine = Engine::new();
        engine
            .allow_when(USER, "read", PRODUCT, json!({ "published": true }))
            .unwrap();

        assert!(!engine.can(&user(), "read", PRODUCT).unwrap());
    }

    #[test]
    fn rules_combine_with_or() {
        let mut engine = Engine::new();
        engine
            .allow_when(USER, "read", PRODUCT, json!({ "published": true }))
            .unwrap();
        engine
            .allow_when(USER, "read", PRODUCT, json!({ "featured": true }))
            .unwrap();

        let featured = product().with("featured", true);
        let published = product().with("published", true);
        assert!(engine.can(&user(), "read", &featured).unwrap());
        assert!(engine.can(&user(), "read", &published).unwrap());
        assert!(!engine.can(&user(), "read", &product()).unwrap());
    }

    #[test]
    fn invalid_condition_registers_nothing() {
        let mut engine = Engine::new();
        let err = engine
            .allow_when(USER, "read", PRODUCT, json!("abc"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCondition { received: "string" }));
        assert!(engine.is_empty());
    }

    #[test]
    fn rules_are_listed_in_registration_order() {
        let mut engine = Engine::new();
        engine.allow(USER, "read", PRODUCT).unwrap();
        engine.allow("Admin", MANAGE, ALL).unwrap();

        let targets: Vec<String> = engine.rules().iter().map(|r| r.target().to_string()).collect();
        assert_eq!(targets, ["Product", "all"]);
        assert!(engine.rules()[1].allows_action("anything"));
    }

    #[test]
    fn cannot_negates_can() {
        let mut engine = Engine::new();
        engine.allow(USER, "read", PRODUCT).unwrap();

        for action in ["read", "create"] {
            assert_eq!(
                engine.cannot(&user(), action, &product()).unwrap(),
                !engine.can(&user(), action, &product()).unwrap()
            );
        }
    }

    #[test]
    fn authorize_reports_denial() {
        let mut engine = Engine::new();
        engine.allow(USER, "read", PRODUCT).unwrap();

        engine.authorize(&user(), "read", &product()).unwrap();
        let err = engine.authorize(&user(), "create", &product()).unwrap_err();
        assert_eq!(err.to_string(), "Authorization error: User cannot create Product");
        assert!(Error::from(err).is_unauthorized());
    }

    #[test]
    fn authorize_works_with_any_factory_error_type() {
        let config = EngineConfig::new()
            .create_error(|performer, action, _| format!("{} may not {action}", performer.kind()));
        let mut engine = Engine::with_config(config);
        engine.allow(USER, "read", PRODUCT).unwrap();

        engine.authorize(&user(), "read", &product()).unwrap();
        let err = engine.authorize(&user(), "create", &product()).unwrap_err();
        assert_eq!(err.into_denied().as_deref(), Some("User may not create"));
    }
}
