//! End-to-end walks over the campaign and attack state machines, plus
//! cross-subsystem event-bus flows.

use ob_core::events::EventBus;
use ob_core::state_machine::{AttackStateMachine, CampaignStateMachine};
use ob_core::types::{AttackState, CampaignState};

#[test]
fn campaign_full_lifecycle_walk() {
    // draft -> active -> paused -> active -> archived -> draft
    let mut state = CampaignState::Draft;
    for (action, expected) in [
        ("start", CampaignState::Active),
        ("pause", CampaignState::Paused),
        ("resume", CampaignState::Active),
        ("archive", CampaignState::Archived),
        ("unarchive", CampaignState::Draft),
    ] {
        state = CampaignStateMachine::validate_action(state, action).unwrap();
        assert_eq!(state, expected, "after {action}");
    }
}

#[test]
fn campaign_stop_returns_to_draft() {
    let active = CampaignStateMachine::validate_action(CampaignState::Draft, "start").unwrap();
    let draft = CampaignStateMachine::validate_action(active, "stop").unwrap();
    assert_eq!(draft, CampaignState::Draft);
}

#[test]
fn campaign_error_recovery_via_reset() {
    let state = CampaignStateMachine::validate_action(CampaignState::Error, "reset").unwrap();
    assert_eq!(state, CampaignState::Draft);
    // From draft the campaign can start again.
    assert!(CampaignStateMachine::validate_action(state, "start").is_ok());
}

#[test]
fn attack_retry_and_reactivate_paths() {
    // failed -> pending -> running
    let pending = AttackStateMachine::validate_action(AttackState::Failed, "retry").unwrap();
    assert_eq!(pending, AttackState::Pending);
    let running = AttackStateMachine::validate_action(pending, "start").unwrap();
    assert_eq!(running, AttackState::Running);

    // abandoned -> pending
    let reactivated =
        AttackStateMachine::validate_action(AttackState::Abandoned, "reactivate").unwrap();
    assert_eq!(reactivated, AttackState::Pending);
}

#[test]
fn attack_abort_from_running_and_paused() {
    for from in [AttackState::Running, AttackState::Paused] {
        let state = AttackStateMachine::validate_action(from, "abort").unwrap();
        assert_eq!(state, AttackState::Abandoned);
    }
}

#[test]
fn system_driven_attack_edges_have_no_action() {
    // running -> completed and running -> failed exist as transitions but no
    // user action maps onto them.
    assert!(AttackStateMachine::can_transition(
        AttackState::Running,
        AttackState::Completed
    ));
    assert!(AttackStateMachine::can_transition(
        AttackState::Running,
        AttackState::Failed
    ));
    for action in ["start", "pause", "resume", "retry", "abandon", "abort", "reactivate"] {
        if let Ok(target) = AttackStateMachine::validate_action(AttackState::Running, action) {
            assert!(
                !matches!(target, AttackState::Completed | AttackState::Failed),
                "action {action} must not complete or fail an attack"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Event bus integration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cross_subsystem_notification() {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    let bus = EventBus::new();
    let seen_campaign = Arc::new(AtomicI64::new(0));

    let recorder = seen_campaign.clone();
    bus.subscribe("campaign.created", "agent_notifier", move |payload| {
        let recorder = recorder.clone();
        async move {
            recorder.store(payload["campaign_id"].as_i64().unwrap_or(-1), Ordering::SeqCst);
            Ok(())
        }
    })
    .await;

    let failures = bus
        .publish("campaign.created", serde_json::json!({"campaign_id": 123}))
        .await;
    assert!(failures.is_empty());
    assert_eq!(seen_campaign.load(Ordering::SeqCst), 123);
}

#[tokio::test]
async fn multiple_subsystems_observe_one_publish() {
    use std::sync::Arc;
    use tokio::sync::Mutex;

    let bus = EventBus::new();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    for name in ["scheduler", "notifier", "audit"] {
        let log = log.clone();
        bus.subscribe("hash.cracked", name, move |_| {
            let log = log.clone();
            async move {
                log.lock().await.push(name);
                Ok(())
            }
        })
        .await;
    }

    bus.publish(
        "hash.cracked",
        serde_json::json!({"hash_list_id": 7, "plain_text": "hunter2"}),
    )
    .await;
    assert_eq!(*log.lock().await, vec!["scheduler", "notifier", "audit"]);
}
