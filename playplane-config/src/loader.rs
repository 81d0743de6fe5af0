use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::PlayplaneConfig;
use crate::util::{parse_bool, split_csv};
use crate::validation::ConfigWarnings;

pub const CONFIG_PATH_VAR: &str = "PLAYPLANE_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "PLAYPLANE_CONFIG_JSON";
pub const AUTO_SKIP_VAR: &str = "PLAYPLANE_AUTO_SKIP";
pub const BLOCKED_KEYWORDS_VAR: &str = "PLAYPLANE_BLOCKED_KEYWORDS";
pub const DEFAULT_CONFIG_FILE: &str = "playplane.toml";

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// A resolved configuration plus where it came from and what was adjusted.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: PlayplaneConfig,
    pub source: ConfigSource,
    pub warnings: ConfigWarnings,
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves [`PlayplaneConfig`].
///
/// Evaluation order:
/// 1) `$PLAYPLANE_CONFIG_PATH` (TOML or JSON file),
/// 2) `$PLAYPLANE_CONFIG_JSON` (inline JSON),
/// 3) `playplane.toml` in the default directory,
/// 4) defaults.
///
/// Single-knob overrides (`$PLAYPLANE_AUTO_SKIP`,
/// `$PLAYPLANE_BLOCKED_KEYWORDS`) are applied on top of whichever source won.
#[derive(Clone)]
pub struct ConfigLoader {
    env: EnvLookup,
    default_dir: PathBuf,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("default_dir", &self.default_dir)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader backed by the process environment and the working directory.
    pub fn new() -> Self {
        Self {
            env: Arc::new(|name| std::env::var(name).ok()),
            default_dir: PathBuf::from("."),
        }
    }

    /// Replace the environment lookup, mainly for tests.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn with_default_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_dir = dir.into();
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigError> {
        let (mut config, source) = self.resolve()?;
        self.apply_env_overrides(&mut config);
        let warnings = config.normalize();

        info!(?source, warnings = warnings.len(), "playplane config loaded");
        Ok(ConfigLoad {
            config,
            source,
            warnings,
        })
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|raw| !raw.trim().is_empty())
    }

    fn resolve(&self) -> Result<(PlayplaneConfig, ConfigSource), ConfigError> {
        if let Some(path_str) = self.var(CONFIG_PATH_VAR) {
            let path = PathBuf::from(path_str);
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = self.var(CONFIG_JSON_VAR) {
            let config = parse_json(&raw, CONFIG_JSON_VAR)?;
            return Ok((config, ConfigSource::EnvInline));
        }

        let default_path = self.default_dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            let config = load_from_file(&default_path)?;
            return Ok((config, ConfigSource::File(default_path)));
        }

        Ok((PlayplaneConfig::default(), ConfigSource::Default))
    }

    fn apply_env_overrides(&self, config: &mut PlayplaneConfig) {
        if let Some(raw) = self.var(AUTO_SKIP_VAR) {
            match parse_bool(&raw) {
                Some(value) => config.skip.auto_skip = value,
                None => debug!(value = %raw, "ignoring unparsable {AUTO_SKIP_VAR}"),
            }
        }

        if let Some(raw) = self.var(BLOCKED_KEYWORDS_VAR) {
            config.filters.blocked_keywords = split_csv(&raw).join(",");
        }
    }
}

pub fn load_from_file(path: &Path) -> Result<PlayplaneConfig, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let origin = path.display().to_string();

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents, &origin),
        Some("toml") | Some("tml") => parse_toml(&contents, &origin),
        _ => parse_from_str(&contents, &origin),
    }
}

pub fn parse_json(raw: &str, origin: &str) -> Result<PlayplaneConfig, ConfigError> {
    serde_json::from_str(raw).map_err(|source| ConfigError::Json {
        origin: origin.to_string(),
        source,
    })
}

pub fn parse_toml(raw: &str, origin: &str) -> Result<PlayplaneConfig, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Toml {
        origin: origin.to_string(),
        source,
    })
}

/// Try JSON first, then TOML, for sources without a telling extension.
pub fn parse_from_str(raw: &str, origin: &str) -> Result<PlayplaneConfig, ConfigError> {
    if let Ok(config) = serde_json::from_str(raw) {
        return Ok(config);
    }
    toml::from_str(raw).map_err(|_| ConfigError::UnknownFormat {
        origin: origin.to_string(),
    })
}
