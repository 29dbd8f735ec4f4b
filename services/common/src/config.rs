//! Service configuration

use crate::errors::{ServiceError, ServiceResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Nesting separator for environment overrides (`PREFIX__SECTION__KEY`)
pub const ENV_SEPARATOR: &str = "__";

/// Default capacity of the worker request queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of queued requests before `submit` applies back-pressure
    pub channel_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Validate worker settings
    pub fn validate(&self) -> ServiceResult<()> {
        if self.channel_capacity == 0 {
            return Err(ServiceError::Config(
                "worker.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a configuration struct from layered sources.
///
/// Layers, lowest precedence first: the struct's serde defaults, the optional
/// file at `file` (format inferred from its extension), then environment
/// variables named `{env_prefix}__SECTION__KEY`.
pub fn load_layered<T: DeserializeOwned>(file: Option<&Path>, env_prefix: &str) -> ServiceResult<T> {
    let mut builder = ::config::Config::builder();

    if let Some(path) = file {
        debug!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(::config::File::from(path).required(true));
    }

    builder = builder.add_source(
        ::config::Environment::with_prefix(env_prefix)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let settings = builder.build()?;
    Ok(settings.try_deserialize::<T>()?)
}
