use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CampaignState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "campaign_state", rename_all = "snake_case")]
pub enum CampaignState {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
    Error,
}

impl CampaignState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignState::Draft => "draft",
            CampaignState::Active => "active",
            CampaignState::Paused => "paused",
            CampaignState::Completed => "completed",
            CampaignState::Archived => "archived",
            CampaignState::Error => "error",
        }
    }
}

impl std::fmt::Display for CampaignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CampaignState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignState::Draft),
            "active" => Ok(CampaignState::Active),
            "paused" => Ok(CampaignState::Paused),
            "completed" => Ok(CampaignState::Completed),
            "archived" => Ok(CampaignState::Archived),
            "error" => Ok(CampaignState::Error),
            other => Err(format!("unknown campaign state '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// AttackState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attack_state", rename_all = "snake_case")]
pub enum AttackState {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Abandoned,
}

impl AttackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackState::Pending => "pending",
            AttackState::Running => "running",
            AttackState::Paused => "paused",
            AttackState::Completed => "completed",
            AttackState::Failed => "failed",
            AttackState::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for AttackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttackState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AttackState::Pending),
            "running" => Ok(AttackState::Running),
            "paused" => Ok(AttackState::Paused),
            "completed" => Ok(AttackState::Completed),
            "failed" => Ok(AttackState::Failed),
            "abandoned" => Ok(AttackState::Abandoned),
            other => Err(format!("unknown attack state '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// AttackMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attack_mode", rename_all = "snake_case")]
pub enum AttackMode {
    Dictionary,
    Mask,
    HybridDictMask,
    HybridMaskDict,
}

impl AttackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackMode::Dictionary => "dictionary",
            AttackMode::Mask => "mask",
            AttackMode::HybridDictMask => "hybrid_dict_mask",
            AttackMode::HybridMaskDict => "hybrid_mask_dict",
        }
    }
}

impl std::fmt::Display for AttackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TaskStatus / AgentState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Abandoned,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "agent_state", rename_all = "snake_case")]
pub enum AgentState {
    Active,
    Idle,
    Offline,
    Error,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Active => "active",
            AgentState::Idle => "idle",
            AgentState::Offline => "offline",
            AgentState::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ResourceType
// ---------------------------------------------------------------------------

/// Kind of an attack resource file.
///
/// The `Ephemeral*` variants never reach object storage; their content lives
/// inline in the database row and they are excluded from resource listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
pub enum ResourceType {
    WordList,
    RuleList,
    MaskList,
    Charset,
    EphemeralWordList,
    EphemeralRuleList,
    EphemeralMaskList,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::WordList => "word_list",
            ResourceType::RuleList => "rule_list",
            ResourceType::MaskList => "mask_list",
            ResourceType::Charset => "charset",
            ResourceType::EphemeralWordList => "ephemeral_word_list",
            ResourceType::EphemeralRuleList => "ephemeral_rule_list",
            ResourceType::EphemeralMaskList => "ephemeral_mask_list",
        }
    }

    /// True for resource types whose content lives inline in the database.
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            ResourceType::EphemeralWordList
                | ResourceType::EphemeralRuleList
                | ResourceType::EphemeralMaskList
        )
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Project / membership
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
pub enum ProjectRole {
    Member,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMembership {
    pub project_id: i64,
    pub user_id: i64,
    pub role: ProjectRole,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authenticated caller of a Control API request: the user row joined
/// with the project ids of their memberships.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub project_ids: Vec<i64>,
}

impl CurrentUser {
    /// Project ids this user may touch. Empty means "no access" for every
    /// project-gated operation.
    pub fn accessible_projects(&self) -> &[i64] {
        &self.project_ids
    }

    pub fn is_superuser(&self) -> bool {
        self.user.is_superuser
    }
}

// ---------------------------------------------------------------------------
// HashList / HashItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HashList {
    pub id: i64,
    /// `None` = global hash list, usable by campaigns in any project.
    pub project_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// Hash algorithm tag (hashcat mode number).
    pub hash_type_id: i32,
    /// While true, campaigns referencing this list cannot go active.
    pub is_unavailable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HashItem {
    pub id: i64,
    pub hash: String,
    pub salt: Option<String>,
    pub plain_text: Option<String>,
}

impl HashItem {
    pub fn is_cracked(&self) -> bool {
        self.plain_text.is_some()
    }
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: i64,
    pub project_id: i64,
    pub hash_list_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Lower value = higher scheduling priority.
    pub priority: i32,
    pub state: CampaignState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Attack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attack {
    pub id: i64,
    pub campaign_id: i64,
    pub name: String,
    pub attack_mode: AttackMode,
    /// Ordering within the campaign, 0-based.
    pub position: i32,
    pub state: AttackState,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<String>,
    pub left_rule: Option<String>,
    pub hash_list_url: Option<String>,
    pub hash_list_checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub attack_id: i64,
    pub agent_id: Option<i64>,
    pub status: TaskStatus,
    /// 0.0–100.0 as last reported by the assigned agent.
    pub progress: f64,
    pub keyspace_total: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Reported progress clamped into [0, 100].
    pub fn progress_percent(&self) -> f64 {
        self.progress.clamp(0.0, 100.0)
    }

    /// Candidates already enumerated: `⌊keyspace_total · progress/100⌋`.
    pub fn keyspace_processed(&self) -> i64 {
        (self.keyspace_total as f64 * self.progress_percent() / 100.0).floor() as i64
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub id: i64,
    pub host_name: String,
    pub enabled: bool,
    pub state: AgentState,
    /// Projects this agent is allowed to work for. Empty = any project.
    pub project_ids: Vec<i64>,
    pub benchmarks: serde_json::Value,
    pub capabilities: serde_json::Value,
    pub error_log: serde_json::Value,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ResourceFile
// ---------------------------------------------------------------------------

/// An attack resource file (wordlist, rule list, mask list, …).
///
/// File-backed resources are keyed in object storage by `id`. While
/// `is_uploaded` is false the row is provisional: the per-upload verifier and
/// the periodic reaper may remove it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResourceFile {
    pub id: Uuid,
    /// `None` = unrestricted, readable by any authenticated user.
    pub project_id: Option<i64>,
    pub file_name: String,
    pub file_label: Option<String>,
    pub resource_type: ResourceType,
    pub line_format: Option<String>,
    pub line_encoding: Option<String>,
    pub used_for_modes: Vec<String>,
    pub source: Option<String>,
    pub line_count: i64,
    pub byte_size: i64,
    pub checksum: Option<String>,
    pub guid: Uuid,
    pub is_uploaded: bool,
    pub tags: Vec<String>,
    /// Inline content for ephemeral or not-yet-uploaded resources:
    /// `{"lines": ["…", …]}`.
    pub content: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceFile {
    /// Inline content lines, when present and well-formed.
    pub fn content_lines(&self) -> Option<Vec<String>> {
        let lines = self.content.as_ref()?.get("lines")?.as_array()?;
        Some(
            lines
                .iter()
                .map(|v| match v.as_str() {
                    Some(s) => s.to_string(),
                    None => v.to_string(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_state_round_trips_through_str() {
        for state in [
            CampaignState::Draft,
            CampaignState::Active,
            CampaignState::Paused,
            CampaignState::Completed,
            CampaignState::Archived,
            CampaignState::Error,
        ] {
            assert_eq!(state.as_str().parse::<CampaignState>().unwrap(), state);
        }
    }

    #[test]
    fn attack_state_round_trips_through_str() {
        for state in [
            AttackState::Pending,
            AttackState::Running,
            AttackState::Paused,
            AttackState::Completed,
            AttackState::Failed,
            AttackState::Abandoned,
        ] {
            assert_eq!(state.as_str().parse::<AttackState>().unwrap(), state);
        }
    }

    #[test]
    fn task_keyspace_processed_floors() {
        let task = Task {
            id: 1,
            attack_id: 1,
            agent_id: None,
            status: TaskStatus::Running,
            progress: 33.3,
            keyspace_total: 1000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(task.keyspace_processed(), 333);
    }

    #[test]
    fn task_progress_is_clamped() {
        let mut task = Task {
            id: 1,
            attack_id: 1,
            agent_id: None,
            status: TaskStatus::Running,
            progress: 180.0,
            keyspace_total: 100,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(task.progress_percent(), 100.0);
        assert_eq!(task.keyspace_processed(), 100);
        task.progress = -5.0;
        assert_eq!(task.progress_percent(), 0.0);
    }

    #[test]
    fn ephemeral_types_are_flagged() {
        assert!(ResourceType::EphemeralWordList.is_ephemeral());
        assert!(ResourceType::EphemeralRuleList.is_ephemeral());
        assert!(!ResourceType::WordList.is_ephemeral());
        assert!(!ResourceType::Charset.is_ephemeral());
    }

    #[test]
    fn content_lines_reads_inline_payload() {
        let resource = ResourceFile {
            id: Uuid::new_v4(),
            project_id: None,
            file_name: "inline.txt".into(),
            file_label: None,
            resource_type: ResourceType::EphemeralWordList,
            line_format: None,
            line_encoding: None,
            used_for_modes: vec![],
            source: None,
            line_count: 2,
            byte_size: 12,
            checksum: None,
            guid: Uuid::new_v4(),
            is_uploaded: false,
            tags: vec![],
            content: Some(serde_json::json!({"lines": ["alpha", "beta"]})),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            resource.content_lines(),
            Some(vec!["alpha".to_string(), "beta".to_string()])
        );
    }
}
