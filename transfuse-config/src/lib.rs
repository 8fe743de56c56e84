//! Shared configuration loader for the Transfuse toolchain.
//!
//! `defaults/transfuse.default.toml` is embedded into every binary so
//! that docs and runtime behavior stay in sync. Applications layer
//! user-specific files on top of those defaults via [`Loader`] before
//! deserializing into [`TransfuseConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use transfuse::{StreamVariant, TagPolicy};

const DEFAULT_TOML: &str = include_str!("../defaults/transfuse.default.toml");

/// Top-level configuration consumed by Transfuse applications.
#[derive(Debug, Clone, Deserialize)]
pub struct TransfuseConfig {
    pub stream: StreamConfig,
    pub profiles: HashMap<String, ProfileConfig>,
}

impl TransfuseConfig {
    /// The configured stream variant, if its name is recognized.
    pub fn stream_variant(&self) -> Option<StreamVariant> {
        StreamVariant::from_name(&self.stream.variant)
    }

    /// Builds the tag policy for a named format profile.
    pub fn profile(&self, name: &str) -> Option<TagPolicy> {
        self.profiles.get(name).map(TagPolicy::from)
    }
}

/// Stream-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub variant: String,
}

/// Mirrors the tag policy tables the engine is driven by.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub inline: Vec<String>,
    #[serde(default)]
    pub prot: Vec<String>,
    #[serde(default)]
    pub prot_inline: Vec<String>,
    #[serde(default)]
    pub raw: Vec<String>,
    #[serde(default)]
    pub parents_allow: Vec<String>,
    #[serde(default)]
    pub parents_direct: Vec<String>,
    #[serde(default)]
    pub text_attrs: Vec<String>,
}

impl From<ProfileConfig> for TagPolicy {
    fn from(config: ProfileConfig) -> Self {
        TagPolicy::from(&config)
    }
}

impl From<&ProfileConfig> for TagPolicy {
    fn from(config: &ProfileConfig) -> Self {
        TagPolicy {
            inline_tags: config.inline.iter().collect(),
            prot: config.prot.iter().collect(),
            prot_inline: config.prot_inline.iter().collect(),
            raw: config.raw.iter().collect(),
            parents_allow: config.parents_allow.iter().collect(),
            parents_direct: config.parents_direct.iter().collect(),
            text_attrs: config.text_attrs.iter().collect(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<TransfuseConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TransfuseConfig, ConfigError> {
    Loader::new().build()
}
