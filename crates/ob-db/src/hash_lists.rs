use ob_core::types::{HashItem, HashList};

use crate::{Db, DbResult};

/// Cracked/uncracked filter for hash-item listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatusFilter {
    Cracked,
    Uncracked,
}

impl Db {
    pub async fn create_hash_list(
        &self,
        project_id: Option<i64>,
        name: &str,
        description: Option<&str>,
        hash_type_id: i32,
        is_unavailable: bool,
    ) -> DbResult<HashList> {
        sqlx::query_as::<_, HashList>(
            r#"
            INSERT INTO hash_lists (project_id, name, description, hash_type_id, is_unavailable, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now(), now())
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(hash_type_id)
        .bind(is_unavailable)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_hash_list(&self, id: i64) -> DbResult<Option<HashList>> {
        sqlx::query_as::<_, HashList>("SELECT * FROM hash_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Lists visible to the caller: their projects plus global lists
    /// (`project_id IS NULL`). `project_id` narrows to one proven project.
    pub async fn list_hash_lists(
        &self,
        project_ids: &[i64],
        project_id: Option<i64>,
        name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<HashList>, i64)> {
        let name_pattern = name.map(|n| format!("%{n}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*) FROM hash_lists
            WHERE (project_id = ANY($1) OR project_id IS NULL)
              AND ($2::bigint IS NULL OR project_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
            "#,
        )
        .bind(project_ids)
        .bind(project_id)
        .bind(name_pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, HashList>(
            r#"
            SELECT * FROM hash_lists
            WHERE (project_id = ANY($1) OR project_id IS NULL)
              AND ($2::bigint IS NULL OR project_id = $2)
              AND ($3::text IS NULL OR name ILIKE $3)
            ORDER BY updated_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(project_ids)
        .bind(project_id)
        .bind(name_pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn update_hash_list(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_unavailable: Option<bool>,
    ) -> DbResult<HashList> {
        sqlx::query_as::<_, HashList>(
            r#"
            UPDATE hash_lists
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_unavailable = COALESCE($4, is_unavailable),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(is_unavailable)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_hash_list(&self, id: i64) -> DbResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM hash_list_items WHERE hash_list_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM hash_lists WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // -- hash items ---------------------------------------------------------

    /// Page of items in a hash list. `search` matches hash or plaintext;
    /// cracked ⇔ `plain_text IS NOT NULL`.
    pub async fn list_hash_items(
        &self,
        hash_list_id: i64,
        search: Option<&str>,
        status: Option<ItemStatusFilter>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<HashItem>, i64)> {
        let search_pattern = search.map(|s| format!("%{s}%"));
        let cracked = status.map(|s| s == ItemStatusFilter::Cracked);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*)
            FROM hash_items i
            JOIN hash_list_items li ON li.hash_item_id = i.id
            WHERE li.hash_list_id = $1
              AND ($2::text IS NULL OR i.hash ILIKE $2 OR i.plain_text ILIKE $2)
              AND ($3::boolean IS NULL OR (i.plain_text IS NOT NULL) = $3)
            "#,
        )
        .bind(hash_list_id)
        .bind(search_pattern.as_deref())
        .bind(cracked)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, HashItem>(
            r#"
            SELECT i.id, i.hash, i.salt, i.plain_text
            FROM hash_items i
            JOIN hash_list_items li ON li.hash_item_id = i.id
            WHERE li.hash_list_id = $1
              AND ($2::text IS NULL OR i.hash ILIKE $2 OR i.plain_text ILIKE $2)
              AND ($3::boolean IS NULL OR (i.plain_text IS NOT NULL) = $3)
            ORDER BY i.id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(hash_list_id)
        .bind(search_pattern.as_deref())
        .bind(cracked)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn get_hash_item(&self, hash_list_id: i64, item_id: i64) -> DbResult<Option<HashItem>> {
        sqlx::query_as::<_, HashItem>(
            r#"
            SELECT i.id, i.hash, i.salt, i.plain_text
            FROM hash_items i
            JOIN hash_list_items li ON li.hash_item_id = i.id
            WHERE li.hash_list_id = $1 AND i.id = $2
            "#,
        )
        .bind(hash_list_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Append items to a hash list in one transaction.
    pub async fn add_hash_items(
        &self,
        hash_list_id: i64,
        items: &[(String, Option<String>)],
    ) -> DbResult<Vec<HashItem>> {
        let mut tx = self.begin().await?;
        let mut created = Vec::with_capacity(items.len());
        for (hash, salt) in items {
            let item = sqlx::query_as::<_, HashItem>(
                "INSERT INTO hash_items (hash, salt) VALUES ($1, $2) RETURNING id, hash, salt, plain_text",
            )
            .bind(hash)
            .bind(salt.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            sqlx::query(
                "INSERT INTO hash_list_items (hash_list_id, hash_item_id) VALUES ($1, $2)",
            )
            .bind(hash_list_id)
            .bind(item.id)
            .execute(&mut *tx)
            .await?;
            created.push(item);
        }
        sqlx::query("UPDATE hash_lists SET updated_at = now() WHERE id = $1")
            .bind(hash_list_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Every item of the list, for exports.
    pub async fn all_hash_items(&self, hash_list_id: i64) -> DbResult<Vec<HashItem>> {
        sqlx::query_as::<_, HashItem>(
            r#"
            SELECT i.id, i.hash, i.salt, i.plain_text
            FROM hash_items i
            JOIN hash_list_items li ON li.hash_item_id = i.id
            WHERE li.hash_list_id = $1
            ORDER BY i.id ASC
            "#,
        )
        .bind(hash_list_id)
        .fetch_all(&self.pool)
        .await
    }

    /// `(total, cracked)` counts for a hash list.
    pub async fn hash_list_counts(&self, hash_list_id: i64) -> DbResult<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT count(*), count(i.plain_text)
            FROM hash_items i
            JOIN hash_list_items li ON li.hash_item_id = i.id
            WHERE li.hash_list_id = $1
            "#,
        )
        .bind(hash_list_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
