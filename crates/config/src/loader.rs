use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::DigitbotConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "digitbot.toml",
    "digitbot.yaml",
    "digitbot.yml",
    "digitbot.json",
];

/// A loaded configuration together with the file it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: DigitbotConfig,
    /// `None` when no config file was found and defaults were used.
    pub path: Option<PathBuf>,
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<DigitbotConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Load `explicit` if given, otherwise discover a config file in standard
/// locations, then apply environment overrides.
///
/// Search order:
/// 1. `./digitbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/digitbot/digitbot.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to [`DigitbotConfig::default()`] when nothing is found; the
/// credentials can still come from the environment.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let mut config = match &path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            load_config(p)?
        },
        None => {
            debug!("no config file found, using defaults");
            DigitbotConfig::default()
        },
    };

    apply_env_overrides(&mut config);
    Ok(LoadedConfig { config, path })
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .chain(
            config_dir()
                .into_iter()
                .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name))),
        )
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/digitbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "digitbot").map(|d| d.config_dir().to_path_buf())
}

/// Apply the process environment on top of file values.
///
/// | variable | field |
/// |---|---|
/// | `LINE_CHANNEL_ACCESS_TOKEN` | `line.channel_access_token` |
/// | `LINE_CHANNEL_SECRET` | `line.channel_secret` |
/// | `PORT` | `server.port` |
/// | `DIGITBOT_BIND` | `server.bind` |
/// | `DIGITBOT_MODEL_PATH` | `model.path` |
pub fn apply_env_overrides(config: &mut DigitbotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

pub(crate) fn apply_env_overrides_with(
    config: &mut DigitbotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("LINE_CHANNEL_ACCESS_TOKEN") {
        config.line.channel_access_token = Some(Secret::new(token));
    }
    if let Some(secret) = get("LINE_CHANNEL_SECRET") {
        config.line.channel_secret = Some(Secret::new(secret));
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    if let Some(bind) = get("DIGITBOT_BIND") {
        config.server.bind = bind;
    }
    if let Some(path) = get("DIGITBOT_MODEL_PATH") {
        config.model.path = PathBuf::from(path);
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<DigitbotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
