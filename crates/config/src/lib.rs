//! Configuration loading, env substitution, environment overrides and validation.
//!
//! Config files: `digitbot.toml`, `digitbot.yaml`, or `digitbot.json`
//! Searched in `./` then `~/.config/digitbot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw
//! file text. The LINE credentials are usually supplied through
//! `LINE_CHANNEL_ACCESS_TOKEN` and `LINE_CHANNEL_SECRET`.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{LoadedConfig, apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        DigitbotConfig, LineConfig, ModelConfig, PreprocessConfig, RepliesConfig, ResizeFilter,
        ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
