//! Quality tier descriptors and the decision variant returned by negotiation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Account-level permission a tier requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Entitlement {
    None,
    Login,
    Vip,
}

/// Hardware/codec support a tier requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceFeature {
    None,
    Hdr,
    DolbyVision,
}

impl DeviceFeature {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceFeature::None => "",
            DeviceFeature::Hdr => "HDR",
            DeviceFeature::DolbyVision => "Dolby Vision",
        }
    }
}

/// Static description of one quality id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct QualityTier {
    pub id: u32,
    pub label: &'static str,
    pub entitlement: Entitlement,
    pub device_feature: DeviceFeature,
}

/// Login/VIP state plus device support flags, as seen at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Capabilities {
    pub logged_in: bool,
    pub vip: bool,
    pub hdr: bool,
    pub dolby_vision: bool,
}

impl Capabilities {
    pub fn new(logged_in: bool, vip: bool, hdr: bool, dolby_vision: bool) -> Self {
        Self {
            logged_in,
            vip,
            hdr,
            dolby_vision,
        }
    }

    pub fn supports(&self, feature: DeviceFeature) -> bool {
        match feature {
            DeviceFeature::None => true,
            DeviceFeature::Hdr => self.hdr,
            DeviceFeature::DolbyVision => self.dolby_vision,
        }
    }
}

/// Result of a permission check for a single quality id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "decision", content = "feature", rename_all = "snake_case")
)]
pub enum QualityDecision {
    Granted,
    RequiresLogin,
    RequiresVip,
    UnsupportedByDevice(String),
}

impl QualityDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, QualityDecision::Granted)
    }

    /// Short text a host can surface when a switch is refused.
    pub fn user_message(&self) -> String {
        match self {
            QualityDecision::Granted => "Quality switched".to_string(),
            QualityDecision::RequiresLogin => {
                "Log in to watch in this quality".to_string()
            }
            QualityDecision::RequiresVip => {
                "This quality is available to VIP members".to_string()
            }
            QualityDecision::UnsupportedByDevice(feature) => {
                format!("This device does not support {feature}")
            }
        }
    }
}

impl fmt::Display for QualityDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityDecision::Granted => f.write_str("granted"),
            QualityDecision::RequiresLogin => f.write_str("requires login"),
            QualityDecision::RequiresVip => f.write_str("requires vip"),
            QualityDecision::UnsupportedByDevice(feature) => {
                write!(f, "unsupported by device ({feature})")
            }
        }
    }
}
