use chrono::{DateTime, Utc};
use ob_core::types::{ResourceFile, ResourceType};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{Db, DbResult};

/// Fields accepted at initiate-upload time. Everything else starts empty and
/// is filled at confirmation.
#[derive(Debug)]
pub struct NewResource<'a> {
    pub id: Uuid,
    pub project_id: Option<i64>,
    pub file_name: &'a str,
    pub file_label: Option<&'a str>,
    pub resource_type: ResourceType,
    pub line_format: Option<&'a str>,
    pub line_encoding: Option<&'a str>,
    pub tags: &'a [String],
}

/// Metadata fields accepted on update. Unset fields keep their current
/// values; moving a resource back to global (`project_id = NULL`) is not
/// expressible here.
#[derive(Debug, Default)]
pub struct ResourcePatch<'a> {
    pub file_name: Option<&'a str>,
    pub file_label: Option<&'a str>,
    pub line_format: Option<&'a str>,
    pub line_encoding: Option<&'a str>,
    pub tags: Option<&'a [String]>,
    pub project_id: Option<i64>,
}

/// Listing scope: superusers see everything, everyone else sees their
/// projects plus unrestricted resources.
#[derive(Debug)]
pub enum ResourceScope<'a> {
    All,
    Projects(&'a [i64]),
}

impl Db {
    pub async fn create_resource(&self, new: &NewResource<'_>) -> DbResult<ResourceFile> {
        sqlx::query_as::<_, ResourceFile>(
            r#"
            INSERT INTO resources (id, project_id, file_name, file_label, resource_type,
                                   line_format, line_encoding, used_for_modes, source,
                                   line_count, byte_size, checksum, guid, is_uploaded,
                                   tags, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, '{}', NULL, 0, 0, NULL, $8, false, $9, NULL, now(), now())
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(new.project_id)
        .bind(new.file_name)
        .bind(new.file_label)
        .bind(new.resource_type)
        .bind(new.line_format)
        .bind(new.line_encoding)
        .bind(Uuid::new_v4())
        .bind(new.tags)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_resource(&self, id: Uuid) -> DbResult<Option<ResourceFile>> {
        sqlx::query_as::<_, ResourceFile>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Page of non-ephemeral resources under the given scope, newest first.
    pub async fn list_resources(
        &self,
        scope: &ResourceScope<'_>,
        project_id: Option<i64>,
        resource_type: Option<ResourceType>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<ResourceFile>, i64)> {
        let search_pattern = search.map(|s| format!("%{s}%"));
        let (scope_all, scope_projects): (bool, &[i64]) = match scope {
            ResourceScope::All => (true, &[]),
            ResourceScope::Projects(ids) => (false, *ids),
        };

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*) FROM resources
            WHERE resource_type NOT IN ('ephemeral_word_list', 'ephemeral_rule_list', 'ephemeral_mask_list')
              AND ($1 OR project_id IS NULL OR project_id = ANY($2))
              AND ($3::bigint IS NULL OR project_id = $3)
              AND ($4::resource_type IS NULL OR resource_type = $4)
              AND ($5::text IS NULL OR file_name ILIKE $5)
            "#,
        )
        .bind(scope_all)
        .bind(scope_projects)
        .bind(project_id)
        .bind(resource_type)
        .bind(search_pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, ResourceFile>(
            r#"
            SELECT * FROM resources
            WHERE resource_type NOT IN ('ephemeral_word_list', 'ephemeral_rule_list', 'ephemeral_mask_list')
              AND ($1 OR project_id IS NULL OR project_id = ANY($2))
              AND ($3::bigint IS NULL OR project_id = $3)
              AND ($4::resource_type IS NULL OR resource_type = $4)
              AND ($5::text IS NULL OR file_name ILIKE $5)
            ORDER BY updated_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(scope_all)
        .bind(scope_projects)
        .bind(project_id)
        .bind(resource_type)
        .bind(search_pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn update_resource_metadata(
        &self,
        id: Uuid,
        patch: &ResourcePatch<'_>,
    ) -> DbResult<ResourceFile> {
        sqlx::query_as::<_, ResourceFile>(
            r#"
            UPDATE resources
            SET file_name = COALESCE($2, file_name),
                file_label = COALESCE($3, file_label),
                line_format = COALESCE($4, line_format),
                line_encoding = COALESCE($5, line_encoding),
                tags = COALESCE($6, tags),
                project_id = COALESCE($7, project_id),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.file_name)
        .bind(patch.file_label)
        .bind(patch.line_format)
        .bind(patch.line_encoding)
        .bind(patch.tags)
        .bind(patch.project_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Flip a resource to uploaded with the observed object size and
    /// checksum.
    pub async fn mark_resource_uploaded(
        &self,
        id: Uuid,
        byte_size: i64,
        checksum: Option<&str>,
    ) -> DbResult<ResourceFile> {
        sqlx::query_as::<_, ResourceFile>(
            r#"
            UPDATE resources
            SET is_uploaded = true,
                byte_size = $2,
                checksum = COALESCE($3, checksum),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(byte_size)
        .bind(checksum)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_resource(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- cleanup worker support --------------------------------------------

    /// Ids of pending resources older than `cutoff`. No locks taken here;
    /// each id is re-fetched under a row lock before any destructive step.
    pub async fn stale_pending_resource_ids(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<Uuid>> {
        sqlx::query_scalar(
            "SELECT id FROM resources WHERE is_uploaded = false AND created_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Locked fetch for one cleanup candidate. Skips rows another worker
    /// already holds; returns `None` when the row is gone or locked.
    pub async fn lock_pending_resource(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
    ) -> DbResult<Option<ResourceFile>> {
        sqlx::query_as::<_, ResourceFile>(
            "SELECT * FROM resources WHERE id = $1 FOR UPDATE SKIP LOCKED",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Row delete inside the caller's transaction.
    pub async fn delete_resource_in_tx(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
