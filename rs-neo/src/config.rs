use std::fs::read_to_string;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EVENT_LIMIT, DEFAULT_POLLING_MESSAGE_LIMIT, MIN_EVENT_LIMIT, NEO_CONFIG_DEFAULT, NEO_CONFIG_VAR, NEO_ENV};
use crate::NeoError;

/// Library wide defaults, loaded from `neo.cfg.yaml`.
///
/// ```yaml
/// polling_message_limit: 20000
/// event_limit: 10000
/// write_blocks: true
/// enable_polling_on_open: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Getters)]
#[serde(default)]
pub struct NeoConfig {
    /// Capacity of each device's polling buffer.
    #[getter(copy)]
    polling_message_limit: usize,
    #[getter(copy)]
    event_limit: usize,
    /// Whether transmits wait for room in a full transmit buffer.
    #[getter(copy)]
    write_blocks: bool,
    #[getter(copy)]
    enable_polling_on_open: bool,
}

impl Default for NeoConfig {
    fn default() -> Self {
        Self {
            polling_message_limit: DEFAULT_POLLING_MESSAGE_LIMIT,
            event_limit: DEFAULT_EVENT_LIMIT,
            write_blocks: true,
            enable_polling_on_open: false,
        }
    }
}

impl NeoConfig {
    /// Load the configuration.
    ///
    /// `neo.env` may point `NEO_CONFIG` at the YAML file, `neo.cfg.yaml` in the
    /// working directory is used otherwise. A missing file yields the defaults.
    pub fn load() -> Result<Self, NeoError> {
        let path = match dotenvy::from_filename(NEO_ENV) {
            Ok(_) => match std::env::var(NEO_CONFIG_VAR) {
                Ok(v) => v,
                Err(_) => NEO_CONFIG_DEFAULT.into(),
            },
            Err(_) => NEO_CONFIG_DEFAULT.into(),
        };

        match read_to_string(&path) {
            Ok(data) => Self::from_yaml(&data),
            Err(e) => {
                log::debug!("RUST-NEO - using default configuration, unable to read `{}`: {}", path, e);
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self, NeoError> {
        let config: Self = serde_yaml::from_str(data)
            .map_err(|e| NeoError::config_error(format!("Error parsing YAML: {:?}", e)))?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), NeoError> {
        if self.polling_message_limit == 0 {
            return Err(NeoError::config_error("`polling_message_limit` must not be 0"));
        }
        if self.event_limit <= MIN_EVENT_LIMIT {
            return Err(NeoError::config_error("`event_limit` must be greater than 10"));
        }

        Ok(())
    }

    pub fn set_polling_message_limit(&mut self, limit: usize) -> &mut Self {
        self.polling_message_limit = limit;
        self
    }

    pub fn set_event_limit(&mut self, limit: usize) -> &mut Self {
        self.event_limit = limit;
        self
    }

    pub fn set_write_blocks(&mut self, blocks: bool) -> &mut Self {
        self.write_blocks = blocks;
        self
    }

    pub fn set_enable_polling_on_open(&mut self, enable: bool) -> &mut Self {
        self.enable_polling_on_open = enable;
        self
    }
}

/// Library version.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Version {
    #[getter(copy)]
    major: u16,
    #[getter(copy)]
    minor: u16,
    #[getter(copy)]
    patch: u16,
    metadata: String,
    build_branch: String,
    build_tag: String,
}

impl Version {
    pub fn current() -> Self {
        let pre = env!("CARGO_PKG_VERSION_PRE");
        Self {
            major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or_default(),
            minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or_default(),
            patch: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or_default(),
            metadata: pre.into(),
            build_branch: option_env!("NEO_BUILD_BRANCH").unwrap_or_default().into(),
            build_tag: option_env!("NEO_BUILD_TAG").unwrap_or(pre).into(),
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.metadata.is_empty() {
            write!(f, "-{}", self.metadata)?;
        }
        Ok(())
    }
}
