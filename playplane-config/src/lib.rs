//! Shared configuration library for Playplane.
//!
//! This crate centralizes the typed configuration consumed by the playback
//! control plane, the loader that resolves it from the environment or a file,
//! and the validation rules that clamp out-of-range values. Hosts load one
//! [`PlayplaneConfig`] at startup and hand its sections to the core engines.
#![allow(missing_docs)]

pub mod error;
pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use error::ConfigError;
pub use loader::{ConfigLoad, ConfigLoader, ConfigSource};
pub use models::filters::FilterConfig;
pub use models::overlay::{LaneLimit, OverlayConfig};
pub use models::progress::ProgressConfig;
pub use models::skip::SkipConfig;
pub use models::PlayplaneConfig;
pub use validation::{ConfigWarning, ConfigWarnings};
