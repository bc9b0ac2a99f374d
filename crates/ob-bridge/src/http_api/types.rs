//! Request and response schemas for the Control API.
//!
//! Request bodies forbid unknown fields; enums are closed. Entity outputs
//! reuse the core types' `Serialize` impls where nothing is derived, and get
//! dedicated output structs where the wire shape adds computed fields.

use chrono::{DateTime, Utc};
use ob_core::types::{
    AgentState, Attack, AttackMode, AttackState, ResourceFile, ResourceType, Task, TaskStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: i32,
    pub project_id: i64,
    pub hash_list_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub name: Option<String>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CampaignValidateResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignProgress {
    pub active_agents: i64,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub running_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
}

#[derive(Debug, Serialize)]
pub struct CampaignMetrics {
    pub total_hashes: i64,
    pub cracked_hashes: i64,
    pub uncracked_hashes: i64,
    /// Share of hashes cracked, 0–100.
    pub percent_cracked: f64,
    /// Share of tasks completed, 0–100.
    pub progress_percent: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub attack_order: Vec<AttackOrderEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackOrderEntry {
    pub attack_id: i64,
    pub priority: i32,
}

// ---------------------------------------------------------------------------
// Attacks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackCreate {
    pub campaign_id: i64,
    pub name: String,
    pub attack_mode: AttackMode,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<String>,
    pub left_rule: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackUpdate {
    pub name: Option<String>,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<String>,
    pub left_rule: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub campaign_id: Option<i64>,
    pub state: Option<AttackState>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackValidateRequest {
    pub campaign_id: Option<i64>,
    pub attack_mode: AttackMode,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    NotFound,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct ResourceAvailability {
    pub resource_id: Uuid,
    pub status: AvailabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttackValidateResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub resource_availability: Vec<ResourceAvailability>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateAttackRequest {
    pub attack_mode: AttackMode,
    pub mask: Option<String>,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AttackPerformanceSummary {
    pub attack_id: i64,
    pub hashes_per_sec: f64,
    pub total_hashes: i64,
    pub agent_count: i64,
    pub progress_percent: f64,
}

// ---------------------------------------------------------------------------
// Hash lists
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashListCreate {
    pub name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub hash_type_id: i32,
    #[serde(default)]
    pub is_unavailable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashListUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_unavailable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashListListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub name: Option<String>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashItemStatus {
    Cracked,
    Uncracked,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashItemListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub status: Option<HashItemStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashItemsCreate {
    pub items: Vec<HashItemCreate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashItemCreate {
    pub hash: String,
    pub salt: Option<String>,
}

/// Envelope shared by the three export formats.
#[derive(Debug, Serialize)]
pub struct HashListExport {
    pub hash_list_id: i64,
    pub hash_list_name: String,
    pub format: &'static str,
    pub total_items: i64,
    pub cracked_count: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvExportQuery {
    pub include_uncracked: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub resource_type: Option<ResourceType>,
    pub project_id: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitiateUploadRequest {
    pub file_name: String,
    pub resource_type: ResourceType,
    pub project_id: Option<i64>,
    pub file_label: Option<String>,
    pub tags: Option<Vec<String>>,
    pub line_format: Option<String>,
    pub line_encoding: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiateUploadResponse {
    pub resource_id: Uuid,
    pub upload_url: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceUpdateRequest {
    pub file_name: Option<String>,
    pub file_label: Option<String>,
    pub line_format: Option<String>,
    pub line_encoding: Option<String>,
    pub tags: Option<Vec<String>>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewQuery {
    pub lines: Option<i64>,
}

/// Resource as listed: row fields plus the computed usage count.
#[derive(Debug, Serialize)]
pub struct ResourceOut {
    pub id: Uuid,
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
    pub project_id: Option<i64>,
    pub unrestricted: bool,
    pub is_uploaded: bool,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub usage_count: i64,
}

impl ResourceOut {
    pub fn from_resource(resource: ResourceFile, usage_count: i64) -> Self {
        Self {
            id: resource.id,
            file_name: resource.file_name,
            file_label: resource.file_label,
            resource_type: resource.resource_type,
            line_format: resource.line_format,
            line_encoding: resource.line_encoding,
            used_for_modes: resource.used_for_modes,
            source: resource.source,
            line_count: resource.line_count,
            byte_size: resource.byte_size,
            checksum: resource.checksum,
            unrestricted: resource.project_id.is_none(),
            project_id: resource.project_id,
            is_uploaded: resource.is_uploaded,
            tags: resource.tags,
            updated_at: resource.updated_at,
            usage_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttackBasic {
    pub id: i64,
    pub name: String,
}

impl From<&Attack> for AttackBasic {
    fn from(attack: &Attack) -> Self {
        Self {
            id: attack.id,
            name: attack.name.clone(),
        }
    }
}

/// Resource detail: row fields plus the deduplicated referencing attacks.
#[derive(Debug, Serialize)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub resource: ResourceOutBase,
    pub attacks: Vec<AttackBasic>,
}

/// Resource preview: row fields plus preview lines or the read error.
#[derive(Debug, Serialize)]
pub struct ResourcePreview {
    #[serde(flatten)]
    pub resource: ResourceOutBase,
    pub preview_lines: Vec<String>,
    pub preview_error: Option<String>,
    pub max_preview_lines: i64,
}

/// Shared wire shape of a resource row without computed additions.
#[derive(Debug, Serialize)]
pub struct ResourceOutBase {
    pub id: Uuid,
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
    pub project_id: Option<i64>,
    pub unrestricted: bool,
    pub is_uploaded: bool,
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResourceFile> for ResourceOutBase {
    fn from(resource: ResourceFile) -> Self {
        Self {
            id: resource.id,
            file_name: resource.file_name,
            file_label: resource.file_label,
            resource_type: resource.resource_type,
            line_format: resource.line_format,
            line_encoding: resource.line_encoding,
            used_for_modes: resource.used_for_modes,
            source: resource.source,
            line_count: resource.line_count,
            byte_size: resource.byte_size,
            checksum: resource.checksum,
            unrestricted: resource.project_id.is_none(),
            project_id: resource.project_id,
            is_uploaded: resource.is_uploaded,
            tags: resource.tags,
            updated_at: resource.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks / agents / users / projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub attack_id: Option<i64>,
    pub status: Option<TaskStatus>,
}

/// Task row plus the derived progress fields.
#[derive(Debug, Serialize)]
pub struct TaskOut {
    pub id: i64,
    pub attack_id: i64,
    pub agent_id: Option<i64>,
    pub status: TaskStatus,
    pub progress: f64,
    pub progress_percent: f64,
    pub keyspace_total: i64,
    pub keyspace_processed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskOut {
    fn from(task: Task) -> Self {
        let progress_percent = task.progress_percent();
        let keyspace_processed = task.keyspace_processed();
        Self {
            id: task.id,
            attack_id: task.attack_id,
            agent_id: task.agent_id,
            status: task.status,
            progress: task.progress,
            progress_percent,
            keyspace_total: task.keyspace_total,
            keyspace_processed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub state: Option<AgentState>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentUpdate {
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageOnlyQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_create_rejects_unknown_fields() {
        let result: Result<CampaignCreate, _> = serde_json::from_value(serde_json::json!({
            "name": "c",
            "project_id": 1,
            "hash_list_id": 2,
            "surprise": true,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn attack_state_filter_is_closed() {
        let result: Result<AttackListQuery, _> = serde_json::from_value(serde_json::json!({
            "state": "exploded",
        }));
        assert!(result.is_err());
        let ok: AttackListQuery =
            serde_json::from_value(serde_json::json!({ "state": "running" })).unwrap();
        assert_eq!(ok.state, Some(AttackState::Running));
    }

    #[test]
    fn task_out_derives_progress_fields() {
        let task = Task {
            id: 9,
            attack_id: 3,
            agent_id: Some(2),
            status: TaskStatus::Running,
            progress: 50.0,
            keyspace_total: 10_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let out = TaskOut::from(task);
        assert_eq!(out.progress_percent, 50.0);
        assert_eq!(out.keyspace_processed, 5_000);
    }

    #[test]
    fn availability_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(AvailabilityStatus::NotFound).unwrap(),
            serde_json::json!("not_found")
        );
    }

    #[test]
    fn resource_out_marks_global_resources_unrestricted() {
        let resource = ResourceFile {
            id: Uuid::new_v4(),
            project_id: None,
            file_name: "rockyou.txt".into(),
            file_label: None,
            resource_type: ResourceType::WordList,
            line_format: None,
            line_encoding: None,
            used_for_modes: vec![],
            source: None,
            line_count: 0,
            byte_size: 0,
            checksum: None,
            guid: Uuid::new_v4(),
            is_uploaded: true,
            tags: vec![],
            content: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let out = ResourceOut::from_resource(resource, 3);
        assert!(out.unrestricted);
        assert_eq!(out.usage_count, 3);
    }
}
