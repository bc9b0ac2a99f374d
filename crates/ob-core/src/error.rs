//! The closed Control API error taxonomy.
//!
//! Every variant carries a human-readable `detail` and maps to a stable
//! kebab-case type tag, a title, and an HTTP status. The HTTP layer renders
//! these as RFC 9457 problem documents; nothing here depends on the web
//! framework.

use crate::state_machine::InvalidTransition;

/// Typed control-plane error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    CampaignNotFound(String),
    #[error("{0}")]
    AttackNotFound(String),
    #[error("{0}")]
    AgentNotFound(String),
    #[error("{0}")]
    HashListNotFound(String),
    #[error("{0}")]
    HashItemNotFound(String),
    #[error("{0}")]
    ResourceNotFound(String),
    #[error("{0}")]
    UserNotFound(String),
    #[error("{0}")]
    ProjectNotFound(String),
    #[error("{0}")]
    TaskNotFound(String),

    #[error("{0}")]
    InvalidAttackConfig(String),
    #[error("{0}")]
    InvalidHashFormat(String),
    #[error("{0}")]
    InvalidResourceFormat(String),
    #[error("{0}")]
    InvalidResourceState(String),

    #[error("{0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    ProjectAccessDenied(String),

    #[error("{0}")]
    UserConflict(String),

    /// Lifecycle conflict with the full extension payload. `detail` follows
    /// the documented format; `valid_transitions` lists the successors of
    /// `current_state`.
    #[error("{detail}")]
    InvalidStateTransition {
        detail: String,
        current_state: String,
        attempted_state: String,
        action: Option<String>,
        entity_type: String,
        valid_transitions: Vec<String>,
    },

    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    /// Build the lifecycle conflict from a state-machine rejection.
    pub fn invalid_transition(
        entity_type: &str,
        err: &InvalidTransition,
        valid_transitions: Vec<String>,
    ) -> Self {
        let detail = match &err.action {
            Some(action) => format!(
                "Cannot perform action '{action}' on {entity_type}: transition from '{}' to '{}' is not allowed.",
                err.from_state, err.to_state
            ),
            None => format!(
                "Invalid {entity_type} state transition from '{}' to '{}'.",
                err.from_state, err.to_state
            ),
        };
        CoreError::InvalidStateTransition {
            detail,
            current_state: err.from_state.clone(),
            attempted_state: err.to_state.clone(),
            action: err.action.clone(),
            entity_type: entity_type.to_string(),
            valid_transitions,
        }
    }

    /// Stable kebab-case type tag, used as the problem `type` member.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::CampaignNotFound(_) => "campaign-not-found",
            CoreError::AttackNotFound(_) => "attack-not-found",
            CoreError::AgentNotFound(_) => "agent-not-found",
            CoreError::HashListNotFound(_) => "hash-list-not-found",
            CoreError::HashItemNotFound(_) => "hash-item-not-found",
            CoreError::ResourceNotFound(_) => "resource-not-found",
            CoreError::UserNotFound(_) => "user-not-found",
            CoreError::ProjectNotFound(_) => "project-not-found",
            CoreError::TaskNotFound(_) => "task-not-found",
            CoreError::InvalidAttackConfig(_) => "invalid-attack-config",
            CoreError::InvalidHashFormat(_) => "invalid-hash-format",
            CoreError::InvalidResourceFormat(_) => "invalid-resource-format",
            CoreError::InvalidResourceState(_) => "invalid-resource-state",
            CoreError::InsufficientPermissions(_) => "insufficient-permissions",
            CoreError::ProjectAccessDenied(_) => "project-access-denied",
            CoreError::UserConflict(_) => "user-conflict",
            CoreError::InvalidStateTransition { .. } => "invalid-state-transition",
            CoreError::Internal(_) => "internal-server-error",
        }
    }

    /// Human-readable title, stable per kind.
    pub fn title(&self) -> &'static str {
        match self {
            CoreError::CampaignNotFound(_) => "Campaign Not Found",
            CoreError::AttackNotFound(_) => "Attack Not Found",
            CoreError::AgentNotFound(_) => "Agent Not Found",
            CoreError::HashListNotFound(_) => "Hash List Not Found",
            CoreError::HashItemNotFound(_) => "Hash Item Not Found",
            CoreError::ResourceNotFound(_) => "Resource Not Found",
            CoreError::UserNotFound(_) => "User Not Found",
            CoreError::ProjectNotFound(_) => "Project Not Found",
            CoreError::TaskNotFound(_) => "Task Not Found",
            CoreError::InvalidAttackConfig(_) => "Invalid Attack Configuration",
            CoreError::InvalidHashFormat(_) => "Invalid Hash Format",
            CoreError::InvalidResourceFormat(_) => "Invalid Resource Format",
            CoreError::InvalidResourceState(_) => "Invalid Resource State",
            CoreError::InsufficientPermissions(_) => "Insufficient Permissions",
            CoreError::ProjectAccessDenied(_) => "Project Access Denied",
            CoreError::UserConflict(_) => "User Already Exists",
            CoreError::InvalidStateTransition { .. } => "Invalid State Transition",
            CoreError::Internal(_) => "Internal Server Error",
        }
    }

    /// HTTP status code for this kind.
    pub fn status(&self) -> u16 {
        match self {
            CoreError::CampaignNotFound(_)
            | CoreError::AttackNotFound(_)
            | CoreError::AgentNotFound(_)
            | CoreError::HashListNotFound(_)
            | CoreError::HashItemNotFound(_)
            | CoreError::ResourceNotFound(_)
            | CoreError::UserNotFound(_)
            | CoreError::ProjectNotFound(_)
            | CoreError::TaskNotFound(_) => 404,
            CoreError::InvalidAttackConfig(_)
            | CoreError::InvalidHashFormat(_)
            | CoreError::InvalidResourceFormat(_)
            | CoreError::InvalidResourceState(_) => 400,
            CoreError::InsufficientPermissions(_) | CoreError::ProjectAccessDenied(_) => 403,
            CoreError::UserConflict(_) | CoreError::InvalidStateTransition { .. } => 409,
            CoreError::Internal(_) => 500,
        }
    }

    /// The free-form detail string.
    pub fn detail(&self) -> &str {
        match self {
            CoreError::CampaignNotFound(d)
            | CoreError::AttackNotFound(d)
            | CoreError::AgentNotFound(d)
            | CoreError::HashListNotFound(d)
            | CoreError::HashItemNotFound(d)
            | CoreError::ResourceNotFound(d)
            | CoreError::UserNotFound(d)
            | CoreError::ProjectNotFound(d)
            | CoreError::TaskNotFound(d)
            | CoreError::InvalidAttackConfig(d)
            | CoreError::InvalidHashFormat(d)
            | CoreError::InvalidResourceFormat(d)
            | CoreError::InvalidResourceState(d)
            | CoreError::InsufficientPermissions(d)
            | CoreError::ProjectAccessDenied(d)
            | CoreError::UserConflict(d)
            | CoreError::Internal(d) => d,
            CoreError::InvalidStateTransition { detail, .. } => detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{AttackStateMachine, CampaignStateMachine};
    use crate::types::{AttackState, CampaignState};

    #[test]
    fn not_found_kinds_are_404() {
        let err = CoreError::CampaignNotFound("Campaign with ID 7 not found".into());
        assert_eq!(err.status(), 404);
        assert_eq!(err.kind(), "campaign-not-found");
        assert_eq!(err.title(), "Campaign Not Found");
        assert_eq!(err.detail(), "Campaign with ID 7 not found");
    }

    #[test]
    fn conflict_kinds_are_409() {
        let err = CoreError::UserConflict("user exists".into());
        assert_eq!(err.status(), 409);
        assert_eq!(err.title(), "User Already Exists");
    }

    #[test]
    fn forbidden_kinds_are_403() {
        assert_eq!(CoreError::ProjectAccessDenied("no".into()).status(), 403);
        assert_eq!(
            CoreError::InsufficientPermissions("no".into()).status(),
            403
        );
    }

    #[test]
    fn kind_tags_are_kebab_case() {
        let samples = [
            CoreError::CampaignNotFound(String::new()),
            CoreError::InvalidResourceState(String::new()),
            CoreError::ProjectAccessDenied(String::new()),
            CoreError::Internal(String::new()),
        ];
        for err in samples {
            let tag = err.kind();
            assert!(tag.contains('-'));
            assert_eq!(tag, tag.to_lowercase());
            assert!(!tag.contains(' '));
        }
    }

    #[test]
    fn invalid_transition_detail_with_action() {
        let cause = CampaignStateMachine::validate_action(CampaignState::Archived, "start")
            .unwrap_err();
        let valid = CampaignStateMachine::get_valid_transitions(CampaignState::Archived)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let err = CoreError::invalid_transition("campaign", &cause, valid);
        assert_eq!(err.status(), 409);
        assert_eq!(
            err.detail(),
            "Cannot perform action 'start' on campaign: transition from 'archived' to 'active' is not allowed."
        );
        match err {
            CoreError::InvalidStateTransition {
                current_state,
                attempted_state,
                action,
                entity_type,
                valid_transitions,
                ..
            } => {
                assert_eq!(current_state, "archived");
                assert_eq!(attempted_state, "active");
                assert_eq!(action.as_deref(), Some("start"));
                assert_eq!(entity_type, "campaign");
                assert_eq!(valid_transitions, vec!["draft".to_string()]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn invalid_transition_detail_without_action() {
        let cause = AttackStateMachine::validate_transition(
            AttackState::Completed,
            AttackState::Running,
            None,
        )
        .unwrap_err();
        let err = CoreError::invalid_transition("attack", &cause, vec![]);
        assert_eq!(
            err.detail(),
            "Invalid attack state transition from 'completed' to 'running'."
        );
    }
}
