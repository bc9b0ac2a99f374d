//! Project-scoped authorization for Control API operations.
//!
//! Two primitives — the caller's accessible-project set and a membership
//! check — plus entity-scoped helpers that fetch the entity (404 on miss)
//! and walk to its governing project (`attack → campaign`,
//! `task → attack → campaign`) before delegating.
//!
//! Unrestricted resources and global hash lists (`project_id = NULL`) are
//! readable by any authenticated user. Superusers bypass project scoping in
//! resource listing and resource metadata updates only; every other
//! operation goes through plain membership.

use ob_core::types::{Agent, Attack, Campaign, CurrentUser, HashList, ResourceFile, Task};
use ob_core::CoreError;
use ob_db::Db;
use uuid::Uuid;

use crate::problem::{ApiResult, Problem};

/// Membership check against one project. An empty accessible set always
/// denies.
pub fn validate_project_access(user: &CurrentUser, project_id: i64) -> ApiResult<()> {
    let accessible = user.accessible_projects();
    if accessible.is_empty() {
        return Err(CoreError::ProjectAccessDenied("User has no project access".into()).into());
    }
    if !accessible.contains(&project_id) {
        return Err(CoreError::ProjectAccessDenied(format!(
            "User does not have access to project {project_id}"
        ))
        .into());
    }
    Ok(())
}

/// Deny outright when the caller belongs to no project. Used by list
/// endpoints before any query runs.
pub fn require_any_project(user: &CurrentUser) -> ApiResult<()> {
    if user.accessible_projects().is_empty() {
        return Err(CoreError::ProjectAccessDenied("User has no project access".into()).into());
    }
    Ok(())
}

/// Fetch a campaign and check membership of its project.
pub async fn get_campaign_checked(
    db: &Db,
    user: &CurrentUser,
    campaign_id: i64,
) -> ApiResult<Campaign> {
    let campaign = db
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| CoreError::CampaignNotFound(format!(
            "Campaign with ID {campaign_id} not found"
        )))?;
    validate_project_access(user, campaign.project_id)?;
    Ok(campaign)
}

/// Fetch an attack and check membership through its campaign.
pub async fn get_attack_checked(
    db: &Db,
    user: &CurrentUser,
    attack_id: i64,
) -> ApiResult<(Attack, Campaign)> {
    let attack = db
        .get_attack(attack_id)
        .await?
        .ok_or_else(|| CoreError::AttackNotFound(format!("Attack with ID {attack_id} not found")))?;
    let campaign = db
        .get_campaign(attack.campaign_id)
        .await?
        .ok_or_else(|| CoreError::CampaignNotFound(format!(
            "Campaign with ID {} not found",
            attack.campaign_id
        )))?;
    validate_project_access(user, campaign.project_id)?;
    Ok((attack, campaign))
}

/// Fetch a hash list; global lists are readable by anyone authenticated.
pub async fn get_hash_list_checked(
    db: &Db,
    user: &CurrentUser,
    hash_list_id: i64,
) -> ApiResult<HashList> {
    let hash_list = db
        .get_hash_list(hash_list_id)
        .await?
        .ok_or_else(|| CoreError::HashListNotFound(format!(
            "Hash list with ID {hash_list_id} not found"
        )))?;
    if let Some(project_id) = hash_list.project_id {
        validate_project_access(user, project_id)?;
    }
    Ok(hash_list)
}

/// Fetch a resource; unrestricted resources are readable by anyone
/// authenticated. No superuser shortcut here.
pub async fn get_resource_checked(
    db: &Db,
    user: &CurrentUser,
    resource_id: Uuid,
) -> ApiResult<ResourceFile> {
    let resource = db
        .get_resource(resource_id)
        .await?
        .ok_or_else(|| CoreError::ResourceNotFound(format!(
            "Resource {resource_id} not found"
        )))?;
    if let Some(project_id) = resource.project_id {
        validate_project_access(user, project_id)?;
    }
    Ok(resource)
}

/// Fetch a task and check membership through its attack's campaign.
pub async fn get_task_checked(db: &Db, user: &CurrentUser, task_id: i64) -> ApiResult<Task> {
    let task = db
        .get_task(task_id)
        .await?
        .ok_or_else(|| CoreError::TaskNotFound(format!("Task with ID {task_id} not found")))?;
    let attack = db
        .get_attack(task.attack_id)
        .await?
        .ok_or_else(|| CoreError::AttackNotFound(format!(
            "Attack with ID {} not found",
            task.attack_id
        )))?;
    let campaign = db
        .get_campaign(attack.campaign_id)
        .await?
        .ok_or_else(|| CoreError::CampaignNotFound(format!(
            "Campaign with ID {} not found",
            attack.campaign_id
        )))?;
    validate_project_access(user, campaign.project_id)?;
    Ok(task)
}

/// Fetch an agent; visible when its project associations are empty or
/// overlap the caller's accessible set.
pub async fn get_agent_checked(db: &Db, user: &CurrentUser, agent_id: i64) -> ApiResult<Agent> {
    let agent = db
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| CoreError::AgentNotFound(format!("Agent with ID {agent_id} not found")))?;
    if agent.project_ids.is_empty() {
        return Ok(agent);
    }
    let accessible = user.accessible_projects();
    if agent.project_ids.iter().any(|id| accessible.contains(id)) {
        Ok(agent)
    } else {
        Err(Problem::from(CoreError::ProjectAccessDenied(format!(
            "User does not have access to agent {agent_id}"
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ob_core::types::User;

    fn user_with_projects(project_ids: Vec<i64>) -> CurrentUser {
        CurrentUser {
            user: User {
                id: 1,
                email: "op@example.com".into(),
                name: "Operator".into(),
                is_active: true,
                is_superuser: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            project_ids,
        }
    }

    #[test]
    fn empty_membership_set_denies() {
        let user = user_with_projects(vec![]);
        let err = validate_project_access(&user, 1).unwrap_err();
        assert_eq!(err.status, 403);
        assert_eq!(err.kind, "project-access-denied");
        assert!(require_any_project(&user).is_err());
    }

    #[test]
    fn membership_grants_access() {
        let user = user_with_projects(vec![3, 7]);
        assert!(validate_project_access(&user, 7).is_ok());
        assert!(require_any_project(&user).is_ok());
    }

    #[test]
    fn non_member_project_denies() {
        let user = user_with_projects(vec![3]);
        let err = validate_project_access(&user, 9).unwrap_err();
        assert_eq!(err.status, 403);
        assert!(err.detail.contains("project 9"));
    }
}
