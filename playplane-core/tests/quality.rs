use playplane_core::model::{Capabilities, DeviceFeature, Entitlement, QualityDecision};
use playplane_core::quality::{QUALITY_TIERS, best_available, check, negotiate};

fn every_capability_set() -> Vec<Capabilities> {
    let mut all = Vec::with_capacity(16);
    for bits in 0u8..16 {
        all.push(Capabilities::new(
            bits & 1 != 0,
            bits & 2 != 0,
            bits & 4 != 0,
            bits & 8 != 0,
        ));
    }
    all
}

#[test]
fn device_gates_win_for_every_account() {
    for caps in every_capability_set() {
        for tier in &QUALITY_TIERS {
            let decision = check(tier.id, &caps);
            if !caps.supports(tier.device_feature) {
                assert!(
                    matches!(decision, QualityDecision::UnsupportedByDevice(_)),
                    "{} on {caps:?} gave {decision:?}",
                    tier.label
                );
            }
        }
    }
}

#[test]
fn granted_tiers_satisfy_their_requirements() {
    for caps in every_capability_set() {
        for tier in &QUALITY_TIERS {
            if !check(tier.id, &caps).is_granted() {
                continue;
            }
            assert!(caps.supports(tier.device_feature));
            match tier.entitlement {
                Entitlement::Vip => assert!(caps.vip),
                Entitlement::Login => assert!(caps.logged_in),
                Entitlement::None => {}
            }
        }
    }
}

#[test]
fn best_available_is_the_highest_granted_candidate() {
    let candidates: Vec<u32> = QUALITY_TIERS.iter().map(|tier| tier.id).collect();
    for caps in every_capability_set() {
        let best = best_available(&candidates, &caps);
        let expected = candidates
            .iter()
            .copied()
            .filter(|&id| check(id, &caps).is_granted())
            .max();
        assert_eq!(best, expected, "{caps:?}");
        // 480P and below are open to everyone.
        assert!(best.is_some_and(|id| id >= 32));
    }
}

#[test]
fn fallback_never_exceeds_the_request() {
    let candidates: Vec<u32> = QUALITY_TIERS.iter().map(|tier| tier.id).collect();
    let guest = Capabilities::new(false, false, false, false);
    for tier in &QUALITY_TIERS {
        let negotiation = negotiate(tier.id, &candidates, &guest);
        let granted = negotiation.granted.expect("open tiers are always reachable");
        assert!(granted <= tier.id);
        assert!(check(granted, &guest).is_granted());
    }
}

#[test]
fn dolby_vision_message_names_the_feature() {
    let caps = Capabilities::new(true, true, true, false);
    let decision = check(126, &caps);
    assert_eq!(
        decision,
        QualityDecision::UnsupportedByDevice(DeviceFeature::DolbyVision.label().to_string())
    );
    assert!(decision.user_message().contains("Dolby Vision"));
}
