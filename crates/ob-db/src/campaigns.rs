use ob_core::types::{Campaign, CampaignState};

use crate::{Db, DbResult};

/// Filters for campaign listing. `project_ids` is the caller's accessible
/// set; `project_id` narrows to one project the caller already proved
/// membership of.
#[derive(Debug, Default)]
pub struct CampaignFilter<'a> {
    pub project_ids: &'a [i64],
    pub project_id: Option<i64>,
    pub name: Option<&'a str>,
}

impl Db {
    pub async fn create_campaign(
        &self,
        project_id: i64,
        hash_list_id: i64,
        name: &str,
        description: Option<&str>,
        priority: i32,
    ) -> DbResult<Campaign> {
        sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (project_id, hash_list_id, name, description, priority, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'draft', now(), now())
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(hash_list_id)
        .bind(name)
        .bind(description)
        .bind(priority)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_campaign(&self, id: i64) -> DbResult<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Scoped, filtered page plus the total count for the same predicate.
    pub async fn list_campaigns(
        &self,
        filter: &CampaignFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<Campaign>, i64)> {
        let name_pattern = filter.name.map(|n| format!("%{n}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*) FROM campaigns
            WHERE project_id = ANY($1)
              AND ($2::bigint IS NULL OR project_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
            "#,
        )
        .bind(filter.project_ids)
        .bind(filter.project_id)
        .bind(name_pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE project_id = ANY($1)
              AND ($2::bigint IS NULL OR project_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
            ORDER BY project_id, updated_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.project_ids)
        .bind(filter.project_id)
        .bind(name_pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Patch name/description/priority; untouched fields keep their values.
    pub async fn update_campaign(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        priority: Option<i32>,
    ) -> DbResult<Campaign> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(priority)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_campaign_state(&self, id: i64, state: CampaignState) -> DbResult<Campaign> {
        sqlx::query_as::<_, Campaign>(
            "UPDATE campaigns SET state = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(state)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_campaign(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// First campaign referencing the hash list, if any. Used to block
    /// hash-list deletion.
    pub async fn campaign_referencing_hash_list(
        &self,
        hash_list_id: i64,
    ) -> DbResult<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE hash_list_id = $1 LIMIT 1",
        )
        .bind(hash_list_id)
        .fetch_optional(&self.pool)
        .await
    }
}
