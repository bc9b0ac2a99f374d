use ob_core::types::{Agent, AgentState};

use crate::{Db, DbResult};

impl Db {
    pub async fn get_agent(&self, id: i64) -> DbResult<Option<Agent>> {
        sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Page of agents visible to the caller: agents whose project
    /// associations overlap the accessible set, or agents bound to no
    /// project at all.
    pub async fn list_agents(
        &self,
        project_ids: &[i64],
        state: Option<AgentState>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<Agent>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*) FROM agents
            WHERE (project_ids = '{}' OR project_ids && $1)
              AND ($2::agent_state IS NULL OR state = $2)
            "#,
        )
        .bind(project_ids)
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Agent>(
            r#"
            SELECT * FROM agents
            WHERE (project_ids = '{}' OR project_ids && $1)
              AND ($2::agent_state IS NULL OR state = $2)
            ORDER BY host_name ASC, id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(project_ids)
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn set_agent_enabled(&self, id: i64, enabled: bool) -> DbResult<Agent> {
        sqlx::query_as::<_, Agent>(
            "UPDATE agents SET enabled = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await
    }

    /// Agents currently in the `active` state, across all projects. Feeds
    /// campaign pre-flight validation.
    pub async fn count_active_agents(&self) -> DbResult<i64> {
        sqlx::query_scalar("SELECT count(*) FROM agents WHERE state = 'active' AND enabled")
            .fetch_one(&self.pool)
            .await
    }
}
