pub mod filters;
pub mod overlay;
pub mod progress;
pub mod skip;

use serde::{Deserialize, Serialize};

use filters::FilterConfig;
use overlay::OverlayConfig;
use progress::ProgressConfig;
use skip::SkipConfig;

/// Top-level configuration for every engine in the control plane. Each
/// section falls back to its defaults when absent from the source document.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayplaneConfig {
    pub overlay: OverlayConfig,
    pub filters: FilterConfig,
    pub skip: SkipConfig,
    pub progress: ProgressConfig,
}
