//! Section dispatch: maps config section names to handlers.
//!
//! Handlers come in two shapes.  A singleton sees the whole config once,
//! whatever the section holds; a per-item handler is called for every
//! item of its normalized section, wrapped in the item's hook scripts.
use std::fmt;

use super::Context;
use crate::config::Item;
use crate::error::{BootError, BuildError};

/// Handler called once per BUILD.
pub type SingletonFn = fn(&mut Context<'_>) -> Result<(), BootError>;

/// Handler called once per section item.
pub type PerItemFn = fn(&mut Context<'_>, &Item<'_>) -> Result<(), BootError>;

/// How a section is turned into tasks.
#[derive(Clone, Copy)]
pub enum Handler {
    /// Invoked exactly once, even when the section is absent.
    Singleton(SingletonFn),
    /// Invoked once per item, between the item's `before` and `after` hooks.
    PerItem(PerItemFn),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton(_) => f.write_str("Singleton"),
            Self::PerItem(_) => f.write_str("PerItem"),
        }
    }
}

/// Ordered section → handler table.
///
/// Registration order is processing order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<(&'static str, Handler)>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `handler` for `section`.
    ///
    /// Re-registering a section replaces its handler but keeps its position.
    #[must_use]
    pub fn with(mut self, section: &'static str, handler: Handler) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == section) {
            entry.1 = handler;
        } else {
            self.entries.push((section, handler));
        }
        self
    }

    /// Section names in processing order.
    #[must_use]
    pub fn sections(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    /// Whether `section` has a handler.
    #[must_use]
    pub fn contains(&self, section: &str) -> bool {
        self.handler(section).is_some()
    }

    /// Handler registered for `section`.
    #[must_use]
    pub fn handler(&self, section: &str) -> Option<Handler> {
        self.entries
            .iter()
            .find(|(name, _)| *name == section)
            .map(|(_, handler)| *handler)
    }

    /// Compile one section into tasks.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownSection`] for an unregistered name and
    /// propagates handler and hook errors unchanged.
    pub fn process(&self, ctx: &mut Context<'_>, section: &str) -> Result<(), BootError> {
        let handler = self
            .handler(section)
            .ok_or_else(|| BuildError::UnknownSection(section.to_string()))?;
        match handler {
            Handler::Singleton(f) => f(ctx),
            Handler::PerItem(f) => {
                let config = ctx.config;
                for item in config.section(section).items() {
                    ctx.run_scripts(section, "before", item.get("before"))?;
                    f(ctx, &item)?;
                    ctx.run_scripts(section, "after", item.get("after"))?;
                    if ctx.is_init() {
                        ctx.run_scripts(section, "init", item.get("init"))?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Compile every registered section, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first error from [`process`](Self::process).
    pub fn process_all(&self, ctx: &mut Context<'_>) -> Result<(), BootError> {
        for (section, _) in &self.entries {
            tracing::debug!("processing section {section}");
            self.process(ctx, section)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assets::MemoryTransport;
    use crate::tasks::Mode;
    use crate::tasks::test_helpers::Fixture;
    use serde_json::json;

    fn count_call(ctx: &mut Context<'_>) -> Result<(), BootError> {
        ctx.task("singleton", || Ok(()));
        Ok(())
    }

    fn item_name(ctx: &mut Context<'_>, item: &Item<'_>) -> Result<(), BootError> {
        let name = item.require_str("name")?;
        ctx.task(format!("item {name}"), || Ok(()));
        Ok(())
    }

    fn registry() -> Registry {
        Registry::new()
            .with("things", Handler::PerItem(item_name))
            .with("once", Handler::Singleton(count_call))
    }

    fn scripts() -> MemoryTransport {
        ["pre", "post", "first"].iter().fold(MemoryTransport::new(), |t, name| {
            t.with(format!("http://cfg/foo/scripts/{name}"), "#!/bin/sh\n")
        })
    }

    #[test]
    fn singleton_runs_once_for_every_shape() {
        for value in [json!({}), json!({"once": "x"}), json!({"once": [1, 2, 3]})] {
            let fx = Fixture::new(&value, MemoryTransport::new());
            let mut ctx = fx.context(Mode::Run);
            registry().process(&mut ctx, "once").unwrap();
            assert_eq!(ctx.tasks().descriptions(), vec!["singleton"], "config {value}");
        }
    }

    #[test]
    fn per_item_wraps_hooks_around_each_item() {
        let config = json!({"things": [
            {"name": "a", "before": "pre", "after": "post"},
            {"name": "b"}
        ]});
        let fx = Fixture::new(&config, scripts());
        let mut ctx = fx.context(Mode::Run);
        registry().process(&mut ctx, "things").unwrap();
        assert_eq!(
            ctx.tasks().descriptions(),
            vec!["run script pre", "item a", "run script post", "item b"]
        );
    }

    #[test]
    fn init_hook_only_in_init_mode() {
        let config = json!({"things": {"name": "a", "init": "first"}});
        let fx = Fixture::new(&config, scripts());

        let mut run = fx.context(Mode::Run);
        registry().process(&mut run, "things").unwrap();
        assert_eq!(run.tasks().descriptions(), vec!["item a"]);

        let mut init = fx.context(Mode::Init);
        registry().process(&mut init, "things").unwrap();
        assert_eq!(init.tasks().descriptions(), vec!["item a", "run script first"]);
    }

    #[test]
    fn absent_per_item_section_does_nothing() {
        let fx = Fixture::new(&json!({}), MemoryTransport::new());
        let mut ctx = fx.context(Mode::Run);
        registry().process(&mut ctx, "things").unwrap();
        assert!(ctx.tasks().is_empty());
    }

    #[test]
    fn handler_errors_propagate() {
        let fx = Fixture::new(&json!({"things": [{"nom": "a"}]}), MemoryTransport::new());
        let mut ctx = fx.context(Mode::Run);
        let err = registry().process(&mut ctx, "things").unwrap_err();
        assert!(matches!(err, BootError::Build(BuildError::MissingField { .. })));
    }

    #[test]
    fn unknown_section_is_an_error() {
        let fx = Fixture::new(&json!({}), MemoryTransport::new());
        let mut ctx = fx.context(Mode::Run);
        let err = registry().process(&mut ctx, "widgets").unwrap_err();
        assert!(matches!(err, BootError::Build(BuildError::UnknownSection(ref s)) if s == "widgets"));
    }

    #[test]
    fn process_all_follows_registration_order() {
        let fx = Fixture::new(&json!({"things": {"name": "a"}}), MemoryTransport::new());
        let mut ctx = fx.context(Mode::Run);
        registry().process_all(&mut ctx).unwrap();
        assert_eq!(ctx.tasks().descriptions(), vec!["item a", "singleton"]);
    }

    #[test]
    fn re_registering_keeps_position() {
        let r = registry().with("things", Handler::Singleton(count_call));
        assert_eq!(r.sections(), vec!["things", "once"]);
        assert!(matches!(r.handler("things"), Some(Handler::Singleton(_))));
        assert!(!r.contains("widgets"));
    }
}
