use std::fmt;

use tracing::warn;

use crate::models::PlayplaneConfig;
use crate::models::overlay::OverlayConfig;

const MIN_TICK_INTERVAL_MS: u64 = 16;
const DEFAULT_TICK_INTERVAL_MS: u64 = 200;

/// A value that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    DisplayRatioClamped { given: f32, used: f32 },
    TickIntervalReplaced { given: u64, used: u64 },
    MergeWindowDisabledMerging,
    ZeroVisibleDuration { field: &'static str, used: u64 },
    EmptyProgressNamespace,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DisplayRatioClamped { given, used } => write!(
                f,
                "overlay.display_area_ratio {given} is outside 0.0..=1.0; using {used}"
            ),
            ConfigWarning::TickIntervalReplaced { given, used } => write!(
                f,
                "overlay.tick_interval_ms {given} is below {MIN_TICK_INTERVAL_MS}; using {used}"
            ),
            ConfigWarning::MergeWindowDisabledMerging => f.write_str(
                "overlay.merge_duplicates is on but merge_window_ms is 0; merging disabled",
            ),
            ConfigWarning::ZeroVisibleDuration { field, used } => {
                write!(f, "overlay.{field} is 0; using {used}")
            }
            ConfigWarning::EmptyProgressNamespace => f.write_str(
                "progress.namespace is empty; using the default namespace",
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigWarnings(Vec<ConfigWarning>);

impl ConfigWarnings {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.0.iter()
    }

    fn push(&mut self, warning: ConfigWarning) {
        warn!(%warning, "config value adjusted");
        self.0.push(warning);
    }
}

impl PlayplaneConfig {
    /// Clamp out-of-range values in place and report every adjustment.
    pub fn normalize(&mut self) -> ConfigWarnings {
        let mut warnings = ConfigWarnings::default();
        normalize_overlay(&mut self.overlay, &mut warnings);

        if self.progress.namespace.trim().is_empty() {
            self.progress.namespace =
                crate::models::progress::ProgressConfig::default().namespace;
            warnings.push(ConfigWarning::EmptyProgressNamespace);
        }

        warnings
    }
}

fn normalize_overlay(overlay: &mut OverlayConfig, warnings: &mut ConfigWarnings) {
    let defaults = OverlayConfig::default();

    let ratio = overlay.display_area_ratio;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        let used = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            defaults.display_area_ratio
        };
        overlay.display_area_ratio = used;
        warnings.push(ConfigWarning::DisplayRatioClamped { given: ratio, used });
    }

    if overlay.tick_interval_ms < MIN_TICK_INTERVAL_MS {
        let given = overlay.tick_interval_ms;
        overlay.tick_interval_ms = DEFAULT_TICK_INTERVAL_MS;
        warnings.push(ConfigWarning::TickIntervalReplaced {
            given,
            used: DEFAULT_TICK_INTERVAL_MS,
        });
    }

    if overlay.merge_duplicates && overlay.merge_window_ms == 0 {
        overlay.merge_duplicates = false;
        warnings.push(ConfigWarning::MergeWindowDisabledMerging);
    }

    if overlay.scroll_duration_ms == 0 {
        overlay.scroll_duration_ms = defaults.scroll_duration_ms;
        warnings.push(ConfigWarning::ZeroVisibleDuration {
            field: "scroll_duration_ms",
            used: defaults.scroll_duration_ms,
        });
    }

    if overlay.fixed_duration_ms == 0 {
        overlay.fixed_duration_ms = defaults.fixed_duration_ms;
        warnings.push(ConfigWarning::ZeroVisibleDuration {
            field: "fixed_duration_ms",
            used: defaults.fixed_duration_ms,
        });
    }
}
