//! Tracing setup for hosts embedding the authorization engine.

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";

/// Configuration for tracing initialization.
#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: &'static str,
    pub env_filter: Option<String>,
    pub with_target: bool,
    /// Route output through the libtest capture instead of stdout.
    pub test_writer: bool,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "warden",
            env_filter: None,
            with_target: false,
            test_writer: false,
        }
    }
}

impl ObsConfig {
    /// Reads `WARDEN_LOG` (then `RUST_LOG`) and `WARDEN_LOG_TARGETS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Verbose engine output captured per test.
    pub fn for_tests() -> Self {
        Self {
            env_filter: Some("warden_authz=trace".into()),
            with_target: true,
            test_writer: true,
            ..Self::default()
        }
    }

    /// Filter directives to install; environment lookups happen in `from_env`.
    fn filter(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(DEFAULT_FILTER)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env_filter = lookup("WARDEN_LOG").or_else(|| lookup("RUST_LOG"));
        let with_target = lookup("WARDEN_LOG_TARGETS")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            env_filter,
            with_target,
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// Concurrent callers block until the first installation finishes.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    INIT.get_or_try_init(|| install(config)).map(|_| ())
}

fn install(config: ObsConfig) -> Result<()> {
    let env_filter = EnvFilter::try_new(config.filter())?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.test_writer {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(config.with_target)
                    .with_test_writer(),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init()?;
    }

    tracing::debug!(service = config.service_name, "tracing initialized");
    Ok(())
}
