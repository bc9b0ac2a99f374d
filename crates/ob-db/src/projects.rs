use ob_core::types::Project;

use crate::{Db, DbResult};

impl Db {
    pub async fn get_project(&self, id: i64) -> DbResult<Option<Project>> {
        sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Page of the caller's projects.
    pub async fn list_projects(
        &self,
        project_ids: &[i64],
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<Project>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM projects WHERE id = ANY($1)")
            .bind(project_ids)
            .fetch_one(&self.pool)
            .await?;
        let items = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE id = ANY($1) ORDER BY id ASC LIMIT $2 OFFSET $3",
        )
        .bind(project_ids)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((items, total))
    }
}
