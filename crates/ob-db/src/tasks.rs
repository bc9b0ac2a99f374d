use ob_core::types::{Task, TaskStatus};

use crate::{Db, DbResult};

/// Per-status task counts for a campaign, plus the distinct agents working
/// on it.
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct CampaignTaskCounts {
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub running_tasks: i64,
    pub completed_tasks: i64,
    pub failed_tasks: i64,
    pub active_agents: i64,
}

impl Db {
    pub async fn get_task(&self, id: i64) -> DbResult<Option<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Page of tasks scoped through attack → campaign → project.
    pub async fn list_tasks(
        &self,
        project_ids: &[i64],
        attack_id: Option<i64>,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<Task>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*)
            FROM tasks t
            JOIN attacks a ON a.id = t.attack_id
            JOIN campaigns c ON c.id = a.campaign_id
            WHERE c.project_id = ANY($1)
              AND ($2::bigint IS NULL OR t.attack_id = $2)
              AND ($3::task_status IS NULL OR t.status = $3)
            "#,
        )
        .bind(project_ids)
        .bind(attack_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.*
            FROM tasks t
            JOIN attacks a ON a.id = t.attack_id
            JOIN campaigns c ON c.id = a.campaign_id
            WHERE c.project_id = ANY($1)
              AND ($2::bigint IS NULL OR t.attack_id = $2)
              AND ($3::task_status IS NULL OR t.status = $3)
            ORDER BY t.id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(project_ids)
        .bind(attack_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Aggregate task counts for a campaign's progress view.
    pub async fn campaign_task_counts(&self, campaign_id: i64) -> DbResult<CampaignTaskCounts> {
        sqlx::query_as::<_, CampaignTaskCounts>(
            r#"
            SELECT count(*)                                            AS total_tasks,
                   count(*) FILTER (WHERE t.status = 'pending')        AS pending_tasks,
                   count(*) FILTER (WHERE t.status = 'running')        AS running_tasks,
                   count(*) FILTER (WHERE t.status = 'completed')      AS completed_tasks,
                   count(*) FILTER (WHERE t.status = 'failed')         AS failed_tasks,
                   count(DISTINCT t.agent_id) FILTER (WHERE t.status = 'running') AS active_agents
            FROM tasks t
            JOIN attacks a ON a.id = t.attack_id
            WHERE a.campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Tasks of one attack, for the performance summary.
    pub async fn tasks_for_attack(&self, attack_id: i64) -> DbResult<Vec<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE attack_id = $1 ORDER BY id ASC")
            .bind(attack_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Distinct agents with a running task on the attack.
    pub async fn agent_count_for_attack(&self, attack_id: i64) -> DbResult<i64> {
        sqlx::query_scalar(
            r#"
            SELECT count(DISTINCT agent_id) FROM tasks
            WHERE attack_id = $1 AND status = 'running' AND agent_id IS NOT NULL
            "#,
        )
        .bind(attack_id)
        .fetch_one(&self.pool)
        .await
    }
}
