//! Quality negotiation.
//!
//! Pure decision functions over a requested quality id, the account's
//! entitlements and the device's capabilities. Device gates outrank
//! entitlement gates: a Dolby Vision tier on a device without Dolby Vision is
//! `UnsupportedByDevice` even for a VIP account.

use playplane_model::{Capabilities, DeviceFeature, Entitlement, QualityDecision, QualityTier};
use tracing::debug;

const fn tier(
    id: u32,
    label: &'static str,
    entitlement: Entitlement,
    device_feature: DeviceFeature,
) -> QualityTier {
    QualityTier {
        id,
        label,
        entitlement,
        device_feature,
    }
}

/// Known quality ids, highest first.
pub const QUALITY_TIERS: [QualityTier; 12] = [
    tier(127, "8K", Entitlement::Vip, DeviceFeature::None),
    tier(126, "Dolby Vision", Entitlement::Vip, DeviceFeature::DolbyVision),
    tier(125, "HDR Vivid", Entitlement::Vip, DeviceFeature::Hdr),
    tier(120, "4K", Entitlement::Vip, DeviceFeature::None),
    tier(116, "1080P60", Entitlement::Vip, DeviceFeature::None),
    tier(112, "1080P+", Entitlement::Vip, DeviceFeature::None),
    tier(80, "1080P", Entitlement::Login, DeviceFeature::None),
    tier(74, "720P60", Entitlement::Login, DeviceFeature::None),
    tier(64, "720P", Entitlement::Login, DeviceFeature::None),
    tier(32, "480P", Entitlement::None, DeviceFeature::None),
    tier(16, "360P", Entitlement::None, DeviceFeature::None),
    tier(6, "240P", Entitlement::None, DeviceFeature::None),
];

pub fn find_tier(quality_id: u32) -> Option<&'static QualityTier> {
    QUALITY_TIERS.iter().find(|tier| tier.id == quality_id)
}

/// Decide whether `quality_id` may be played. Unknown ids are ungated.
pub fn check(quality_id: u32, caps: &Capabilities) -> QualityDecision {
    let Some(tier) = find_tier(quality_id) else {
        return QualityDecision::Granted;
    };

    if !caps.supports(tier.device_feature) {
        return QualityDecision::UnsupportedByDevice(tier.device_feature.label().to_string());
    }

    match tier.entitlement {
        Entitlement::Vip if !caps.vip => QualityDecision::RequiresVip,
        Entitlement::Login if !caps.logged_in => QualityDecision::RequiresLogin,
        _ => QualityDecision::Granted,
    }
}

pub fn check_permission(
    quality_id: u32,
    is_logged_in: bool,
    is_vip: bool,
    is_hdr_supported: bool,
    is_dolby_vision_supported: bool,
) -> QualityDecision {
    check(
        quality_id,
        &Capabilities::new(is_logged_in, is_vip, is_hdr_supported, is_dolby_vision_supported),
    )
}

/// Highest candidate that would be granted.
pub fn best_available(candidates: &[u32], caps: &Capabilities) -> Option<u32> {
    let mut ordered = candidates.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    ordered
        .into_iter()
        .find(|&id| check(id, caps).is_granted())
}

pub fn max_available(
    candidates: &[u32],
    is_logged_in: bool,
    is_vip: bool,
    is_hdr_supported: bool,
    is_dolby_vision_supported: bool,
) -> Option<u32> {
    best_available(
        candidates,
        &Capabilities::new(is_logged_in, is_vip, is_hdr_supported, is_dolby_vision_supported),
    )
}

/// "Requested X, granted Y."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub requested: u32,
    /// Quality to actually play; `None` when nothing at or below the request
    /// is allowed.
    pub granted: Option<u32>,
    /// Decision for the requested id.
    pub decision: QualityDecision,
}

impl Negotiation {
    pub fn is_fallback(&self) -> bool {
        self.granted.is_some_and(|granted| granted != self.requested)
    }

    pub fn user_message(&self) -> String {
        if self.decision.is_granted() {
            return self.decision.user_message();
        }
        match self.granted.and_then(find_tier) {
            Some(fallback) => {
                format!("{}; playing {} instead", self.decision.user_message(), fallback.label)
            }
            None => self.decision.user_message(),
        }
    }
}

/// Check the requested quality and fall back to the best granted candidate
/// that does not exceed it.
pub fn negotiate(requested: u32, candidates: &[u32], caps: &Capabilities) -> Negotiation {
    let decision = check(requested, caps);
    let granted = if decision.is_granted() {
        Some(requested)
    } else {
        let lower: Vec<u32> = candidates
            .iter()
            .copied()
            .filter(|&id| id <= requested)
            .collect();
        best_available(&lower, caps)
    };

    debug!(
        quality_id = requested,
        ?granted,
        decision = %decision,
        "quality negotiated"
    );
    Negotiation {
        requested,
        granted,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_gate_outranks_entitlement() {
        for (logged_in, vip) in [(false, false), (true, false), (true, true)] {
            assert_eq!(
                check_permission(126, logged_in, vip, true, false),
                QualityDecision::UnsupportedByDevice("Dolby Vision".into())
            );
        }
        assert_eq!(
            check_permission(125, true, true, false, true),
            QualityDecision::UnsupportedByDevice("HDR".into())
        );
    }

    #[test]
    fn entitlement_gates() {
        assert_eq!(check_permission(120, true, false, true, true), QualityDecision::RequiresVip);
        assert_eq!(check_permission(80, false, false, true, true), QualityDecision::RequiresLogin);
        assert_eq!(check_permission(80, true, false, false, false), QualityDecision::Granted);
        assert_eq!(check_permission(32, false, false, false, false), QualityDecision::Granted);
        assert_eq!(check_permission(126, true, true, false, true), QualityDecision::Granted);
    }

    #[test]
    fn unknown_ids_are_granted() {
        assert_eq!(check_permission(999, false, false, false, false), QualityDecision::Granted);
    }

    #[test]
    fn max_available_skips_unsupported_tiers() {
        assert_eq!(max_available(&[126, 125, 120, 80], true, true, false, false), Some(120));
        assert_eq!(max_available(&[80, 126, 120, 125], true, false, true, true), Some(80));
        assert_eq!(max_available(&[120, 80], false, false, false, false), None);
        assert_eq!(max_available(&[], true, true, true, true), None);
    }

    #[test]
    fn negotiation_falls_back_below_request() {
        let caps = Capabilities::new(true, true, false, false);
        let negotiation = negotiate(126, &[127, 126, 120, 80], &caps);

        assert_eq!(negotiation.granted, Some(120));
        assert!(negotiation.is_fallback());
        assert_eq!(
            negotiation.decision,
            QualityDecision::UnsupportedByDevice("Dolby Vision".into())
        );
        assert!(negotiation.user_message().contains("4K"));

        let direct = negotiate(80, &[80, 64], &caps);
        assert_eq!(direct.granted, Some(80));
        assert!(!direct.is_fallback());
    }
}
