use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config ({origin}): {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML config ({origin}): {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config from {origin} is neither valid JSON nor TOML")]
    UnknownFormat { origin: String },
}
