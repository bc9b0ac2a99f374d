//! Declarative state machines for campaign and attack lifecycles.
//!
//! Both machines share the same shape: a `TRANSITIONS` table mapping each
//! state to its valid successors, and an `ACTIONS` table mapping user actions
//! (`start`, `pause`, …) to `{from → to}` pairs. Edges present in
//! `TRANSITIONS` but absent from every action are system-driven only
//! (campaign `active → completed`, attack `running → {completed, failed}`).

use crate::types::{AttackState, CampaignState};

// ---------------------------------------------------------------------------
// InvalidTransition
// ---------------------------------------------------------------------------

/// Raised when a transition or action is not allowed from the current state.
///
/// Carries state names as strings so both machines share one error type; the
/// HTTP layer re-wraps this into the RFC 9457 conflict problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidTransition {
    pub from_state: String,
    pub to_state: String,
    pub action: Option<String>,
    message: String,
}

impl InvalidTransition {
    fn new(from_state: &str, to_state: &str, action: Option<&str>) -> Self {
        let message = match action {
            Some(a) => format!(
                "Cannot perform action '{a}': transition from '{from_state}' to '{to_state}' is not allowed"
            ),
            None => format!("Invalid state transition from '{from_state}' to '{to_state}'"),
        };
        Self {
            from_state: from_state.to_string(),
            to_state: to_state.to_string(),
            action: action.map(str::to_string),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// CampaignStateMachine
// ---------------------------------------------------------------------------

/// Valid successor states per campaign state.
pub const CAMPAIGN_TRANSITIONS: &[(CampaignState, &[CampaignState])] = &[
    (
        CampaignState::Draft,
        &[CampaignState::Active, CampaignState::Archived],
    ),
    (
        CampaignState::Active,
        &[
            CampaignState::Paused,
            CampaignState::Draft,
            CampaignState::Archived,
            CampaignState::Completed,
        ],
    ),
    (
        CampaignState::Paused,
        &[CampaignState::Active, CampaignState::Archived],
    ),
    (CampaignState::Completed, &[CampaignState::Archived]),
    (CampaignState::Archived, &[CampaignState::Draft]),
    (CampaignState::Error, &[CampaignState::Draft]),
];

/// User actions over campaigns. `active → completed` has no action on
/// purpose; only the system completes a campaign.
pub const CAMPAIGN_ACTIONS: &[(&str, &[(CampaignState, CampaignState)])] = &[
    ("start", &[(CampaignState::Draft, CampaignState::Active)]),
    ("stop", &[(CampaignState::Active, CampaignState::Draft)]),
    ("pause", &[(CampaignState::Active, CampaignState::Paused)]),
    ("resume", &[(CampaignState::Paused, CampaignState::Active)]),
    (
        "archive",
        &[
            (CampaignState::Draft, CampaignState::Archived),
            (CampaignState::Active, CampaignState::Archived),
            (CampaignState::Paused, CampaignState::Archived),
            (CampaignState::Completed, CampaignState::Archived),
        ],
    ),
    ("unarchive", &[(CampaignState::Archived, CampaignState::Draft)]),
    ("reset", &[(CampaignState::Error, CampaignState::Draft)]),
];

/// State machine over [`CampaignState`].
pub struct CampaignStateMachine;

impl CampaignStateMachine {
    /// Whether `from → to` is a valid transition (user or system driven).
    pub fn can_transition(from: CampaignState, to: CampaignState) -> bool {
        Self::get_valid_transitions(from).contains(&to)
    }

    /// Validate a transition, failing with [`InvalidTransition`] otherwise.
    pub fn validate_transition(
        from: CampaignState,
        to: CampaignState,
        action: Option<&str>,
    ) -> Result<(), InvalidTransition> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(InvalidTransition::new(from.as_str(), to.as_str(), action))
        }
    }

    /// Resolve a user action against the current state, returning the target
    /// state. Unknown actions report `to_state == current`; known actions
    /// invalid for the current state report the action's canonical target.
    pub fn validate_action(
        current: CampaignState,
        action: &str,
    ) -> Result<CampaignState, InvalidTransition> {
        let Some((_, pairs)) = CAMPAIGN_ACTIONS.iter().find(|(name, _)| *name == action) else {
            return Err(InvalidTransition::new(
                current.as_str(),
                current.as_str(),
                Some(action),
            ));
        };
        match pairs.iter().find(|(from, _)| *from == current) {
            Some((_, to)) => Ok(*to),
            None => {
                // Representative target for diagnostics.
                let target = pairs.first().map(|(_, to)| *to).unwrap_or(current);
                Err(InvalidTransition::new(
                    current.as_str(),
                    target.as_str(),
                    Some(action),
                ))
            }
        }
    }

    /// The action's canonical target state, if the action exists. Every
    /// campaign action maps all of its source states to a single target.
    pub fn action_target(action: &str) -> Option<CampaignState> {
        CAMPAIGN_ACTIONS
            .iter()
            .find(|(name, _)| *name == action)
            .and_then(|(_, pairs)| pairs.first())
            .map(|(_, to)| *to)
    }

    /// All valid successor states from `from`.
    pub fn get_valid_transitions(from: CampaignState) -> &'static [CampaignState] {
        CAMPAIGN_TRANSITIONS
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// AttackStateMachine
// ---------------------------------------------------------------------------

/// Valid successor states per attack state. `completed` is terminal.
pub const ATTACK_TRANSITIONS: &[(AttackState, &[AttackState])] = &[
    (
        AttackState::Pending,
        &[AttackState::Running, AttackState::Abandoned],
    ),
    (
        AttackState::Running,
        &[
            AttackState::Paused,
            AttackState::Completed,
            AttackState::Failed,
            AttackState::Abandoned,
        ],
    ),
    (
        AttackState::Paused,
        &[AttackState::Running, AttackState::Abandoned],
    ),
    (AttackState::Completed, &[]),
    (AttackState::Failed, &[AttackState::Pending]),
    (AttackState::Abandoned, &[AttackState::Pending]),
];

/// User actions over attacks. `running → completed` and `running → failed`
/// are system-driven only.
pub const ATTACK_ACTIONS: &[(&str, &[(AttackState, AttackState)])] = &[
    ("start", &[(AttackState::Pending, AttackState::Running)]),
    ("pause", &[(AttackState::Running, AttackState::Paused)]),
    ("resume", &[(AttackState::Paused, AttackState::Running)]),
    ("retry", &[(AttackState::Failed, AttackState::Pending)]),
    ("abandon", &[(AttackState::Pending, AttackState::Abandoned)]),
    (
        "abort",
        &[
            (AttackState::Running, AttackState::Abandoned),
            (AttackState::Paused, AttackState::Abandoned),
        ],
    ),
    ("reactivate", &[(AttackState::Abandoned, AttackState::Pending)]),
];

/// State machine over [`AttackState`].
pub struct AttackStateMachine;

impl AttackStateMachine {
    /// Whether `from → to` is a valid transition (user or system driven).
    pub fn can_transition(from: AttackState, to: AttackState) -> bool {
        Self::get_valid_transitions(from).contains(&to)
    }

    /// Validate a transition, failing with [`InvalidTransition`] otherwise.
    pub fn validate_transition(
        from: AttackState,
        to: AttackState,
        action: Option<&str>,
    ) -> Result<(), InvalidTransition> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(InvalidTransition::new(from.as_str(), to.as_str(), action))
        }
    }

    /// Resolve a user action against the current state, returning the target
    /// state.
    pub fn validate_action(
        current: AttackState,
        action: &str,
    ) -> Result<AttackState, InvalidTransition> {
        let Some((_, pairs)) = ATTACK_ACTIONS.iter().find(|(name, _)| *name == action) else {
            return Err(InvalidTransition::new(
                current.as_str(),
                current.as_str(),
                Some(action),
            ));
        };
        match pairs.iter().find(|(from, _)| *from == current) {
            Some((_, to)) => Ok(*to),
            None => {
                let target = pairs.first().map(|(_, to)| *to).unwrap_or(current);
                Err(InvalidTransition::new(
                    current.as_str(),
                    target.as_str(),
                    Some(action),
                ))
            }
        }
    }

    /// All valid successor states from `from`.
    pub fn get_valid_transitions(from: AttackState) -> &'static [AttackState] {
        ATTACK_TRANSITIONS
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    /// True when the state has no outgoing transitions.
    pub fn is_terminal_state(state: AttackState) -> bool {
        Self::get_valid_transitions(state).is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CAMPAIGN_STATES: [CampaignState; 6] = [
        CampaignState::Draft,
        CampaignState::Active,
        CampaignState::Paused,
        CampaignState::Completed,
        CampaignState::Archived,
        CampaignState::Error,
    ];

    const ALL_ATTACK_STATES: [AttackState; 6] = [
        AttackState::Pending,
        AttackState::Running,
        AttackState::Paused,
        AttackState::Completed,
        AttackState::Failed,
        AttackState::Abandoned,
    ];

    #[test]
    fn error_message_with_action() {
        let err = InvalidTransition::new("draft", "paused", Some("pause"));
        assert_eq!(err.from_state, "draft");
        assert_eq!(err.to_state, "paused");
        assert_eq!(err.action.as_deref(), Some("pause"));
        let msg = err.to_string();
        assert!(msg.contains("pause"));
        assert!(msg.contains("draft"));
        assert!(msg.contains("paused"));
    }

    #[test]
    fn error_message_without_action() {
        let err = InvalidTransition::new("draft", "paused", None);
        assert!(err.action.is_none());
        assert_eq!(
            err.to_string(),
            "Invalid state transition from 'draft' to 'paused'"
        );
    }

    #[test]
    fn campaign_valid_transitions() {
        use CampaignState::*;
        for (from, to) in [
            (Draft, Active),
            (Draft, Archived),
            (Active, Paused),
            (Active, Draft),
            (Active, Archived),
            (Active, Completed),
            (Paused, Active),
            (Paused, Archived),
            (Completed, Archived),
            (Archived, Draft),
            (Error, Draft),
        ] {
            assert!(
                CampaignStateMachine::can_transition(from, to),
                "{from} -> {to} should be valid"
            );
            CampaignStateMachine::validate_transition(from, to, None).unwrap();
        }
    }

    #[test]
    fn campaign_invalid_transitions() {
        use CampaignState::*;
        for (from, to) in [
            (Draft, Paused),
            (Draft, Completed),
            (Paused, Draft),
            (Paused, Completed),
            (Completed, Active),
            (Completed, Draft),
            (Archived, Active),
            (Archived, Paused),
            (Error, Active),
        ] {
            assert!(
                !CampaignStateMachine::can_transition(from, to),
                "{from} -> {to} should be invalid"
            );
            assert!(CampaignStateMachine::validate_transition(from, to, None).is_err());
        }
    }

    #[test]
    fn campaign_no_self_transitions() {
        for state in ALL_CAMPAIGN_STATES {
            assert!(!CampaignStateMachine::can_transition(state, state));
        }
    }

    #[test]
    fn campaign_actions_resolve_targets() {
        use CampaignState::*;
        assert_eq!(
            CampaignStateMachine::validate_action(Draft, "start").unwrap(),
            Active
        );
        assert_eq!(
            CampaignStateMachine::validate_action(Active, "stop").unwrap(),
            Draft
        );
        assert_eq!(
            CampaignStateMachine::validate_action(Active, "pause").unwrap(),
            Paused
        );
        assert_eq!(
            CampaignStateMachine::validate_action(Paused, "resume").unwrap(),
            Active
        );
        for from in [Draft, Active, Paused, Completed] {
            assert_eq!(
                CampaignStateMachine::validate_action(from, "archive").unwrap(),
                Archived
            );
        }
        assert_eq!(
            CampaignStateMachine::validate_action(Archived, "unarchive").unwrap(),
            Draft
        );
        assert_eq!(
            CampaignStateMachine::validate_action(Error, "reset").unwrap(),
            Draft
        );
    }

    #[test]
    fn campaign_action_targets_agree_with_transition_table() {
        for (action, pairs) in CAMPAIGN_ACTIONS {
            for (from, to) in *pairs {
                assert_eq!(
                    CampaignStateMachine::validate_action(*from, action).unwrap(),
                    *to
                );
                assert!(
                    CampaignStateMachine::can_transition(*from, *to),
                    "action {action}: {from} -> {to} missing from TRANSITIONS"
                );
            }
        }
    }

    #[test]
    fn campaign_action_invalid_for_state() {
        let err = CampaignStateMachine::validate_action(CampaignState::Archived, "start")
            .unwrap_err();
        assert_eq!(err.from_state, "archived");
        assert_eq!(err.to_state, "active");
        assert_eq!(err.action.as_deref(), Some("start"));
    }

    #[test]
    fn campaign_unknown_action() {
        let err =
            CampaignStateMachine::validate_action(CampaignState::Draft, "explode").unwrap_err();
        assert_eq!(err.from_state, "draft");
        assert_eq!(err.to_state, "draft");
        assert_eq!(err.action.as_deref(), Some("explode"));
    }

    #[test]
    fn campaign_unarchive_only_from_archived() {
        for state in ALL_CAMPAIGN_STATES {
            let result = CampaignStateMachine::validate_action(state, "unarchive");
            if state == CampaignState::Archived {
                assert_eq!(result.unwrap(), CampaignState::Draft);
            } else {
                assert!(result.is_err(), "unarchive should fail from {state}");
            }
        }
    }

    #[test]
    fn campaign_get_valid_transitions() {
        assert_eq!(
            CampaignStateMachine::get_valid_transitions(CampaignState::Archived),
            &[CampaignState::Draft]
        );
        assert_eq!(
            CampaignStateMachine::get_valid_transitions(CampaignState::Active).len(),
            4
        );
    }

    #[test]
    fn campaign_action_target_lookup() {
        assert_eq!(
            CampaignStateMachine::action_target("archive"),
            Some(CampaignState::Archived)
        );
        assert_eq!(CampaignStateMachine::action_target("explode"), None);
    }

    #[test]
    fn attack_valid_transitions() {
        use AttackState::*;
        for (from, to) in [
            (Pending, Running),
            (Pending, Abandoned),
            (Running, Paused),
            (Running, Completed),
            (Running, Failed),
            (Running, Abandoned),
            (Paused, Running),
            (Paused, Abandoned),
            (Failed, Pending),
            (Abandoned, Pending),
        ] {
            assert!(
                AttackStateMachine::can_transition(from, to),
                "{from} -> {to} should be valid"
            );
        }
    }

    #[test]
    fn attack_invalid_transitions() {
        use AttackState::*;
        for (from, to) in [
            (Pending, Completed),
            (Pending, Failed),
            (Pending, Paused),
            (Paused, Completed),
            (Paused, Failed),
            (Failed, Running),
            (Abandoned, Running),
        ] {
            assert!(
                !AttackStateMachine::can_transition(from, to),
                "{from} -> {to} should be invalid"
            );
        }
    }

    #[test]
    fn attack_completed_is_only_terminal_state() {
        for state in ALL_ATTACK_STATES {
            assert_eq!(
                AttackStateMachine::is_terminal_state(state),
                state == AttackState::Completed,
                "terminal check for {state}"
            );
            assert_eq!(
                AttackStateMachine::is_terminal_state(state),
                AttackStateMachine::get_valid_transitions(state).is_empty()
            );
        }
    }

    #[test]
    fn attack_actions_resolve_targets() {
        use AttackState::*;
        assert_eq!(
            AttackStateMachine::validate_action(Pending, "start").unwrap(),
            Running
        );
        assert_eq!(
            AttackStateMachine::validate_action(Running, "pause").unwrap(),
            Paused
        );
        assert_eq!(
            AttackStateMachine::validate_action(Paused, "resume").unwrap(),
            Running
        );
        assert_eq!(
            AttackStateMachine::validate_action(Failed, "retry").unwrap(),
            Pending
        );
        assert_eq!(
            AttackStateMachine::validate_action(Pending, "abandon").unwrap(),
            Abandoned
        );
        assert_eq!(
            AttackStateMachine::validate_action(Running, "abort").unwrap(),
            Abandoned
        );
        assert_eq!(
            AttackStateMachine::validate_action(Paused, "abort").unwrap(),
            Abandoned
        );
        assert_eq!(
            AttackStateMachine::validate_action(Abandoned, "reactivate").unwrap(),
            Pending
        );
    }

    #[test]
    fn attack_action_targets_agree_with_transition_table() {
        for (action, pairs) in ATTACK_ACTIONS {
            for (from, to) in *pairs {
                assert_eq!(
                    AttackStateMachine::validate_action(*from, action).unwrap(),
                    *to
                );
                assert!(
                    AttackStateMachine::can_transition(*from, *to),
                    "action {action}: {from} -> {to} missing from TRANSITIONS"
                );
            }
        }
    }

    #[test]
    fn attack_start_invalid_when_running() {
        let err = AttackStateMachine::validate_action(AttackState::Running, "start").unwrap_err();
        assert_eq!(err.from_state, "running");
        assert_eq!(err.to_state, "running");
        assert_eq!(err.action.as_deref(), Some("start"));
    }

    #[test]
    fn attack_no_action_escapes_completed() {
        for (action, _) in ATTACK_ACTIONS {
            assert!(
                AttackStateMachine::validate_action(AttackState::Completed, action).is_err(),
                "action {action} should not apply to completed"
            );
        }
    }

    #[test]
    fn round_trip_pause_resume_returns_running() {
        let paused = AttackStateMachine::validate_action(AttackState::Running, "pause").unwrap();
        let running = AttackStateMachine::validate_action(paused, "resume").unwrap();
        assert_eq!(running, AttackState::Running);
    }

    #[test]
    fn round_trip_archive_unarchive_returns_draft() {
        let archived =
            CampaignStateMachine::validate_action(CampaignState::Draft, "archive").unwrap();
        let draft = CampaignStateMachine::validate_action(archived, "unarchive").unwrap();
        assert_eq!(draft, CampaignState::Draft);
    }
}
