use ob_core::types::{CurrentUser, User};

use crate::{Db, DbResult};

impl Db {
    /// Resolve the bearer API key to its active user, with membership
    /// project ids attached. `None` = unknown or inactive key.
    pub async fn find_user_by_api_key(&self, api_key: &str) -> DbResult<Option<CurrentUser>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE api_key = $1 AND is_active
            "#,
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };
        let project_ids = self.project_ids_for_user(user.id).await?;
        Ok(Some(CurrentUser { user, project_ids }))
    }

    pub async fn project_ids_for_user(&self, user_id: i64) -> DbResult<Vec<i64>> {
        sqlx::query_scalar(
            "SELECT project_id FROM project_memberships WHERE user_id = $1 ORDER BY project_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_user(&self, id: i64) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, is_active, is_superuser, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, is_active, is_superuser, created_at, updated_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_users(&self, limit: i64, offset: i64) -> DbResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let items = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, is_active, is_superuser, created_at, updated_at
            FROM users ORDER BY id ASC LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((items, total))
    }

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        api_key: &str,
        is_superuser: bool,
    ) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, api_key, is_active, is_superuser, created_at, updated_at)
            VALUES ($1, $2, $3, true, $4, now(), now())
            RETURNING id, email, name, is_active, is_superuser, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(api_key)
        .bind(is_superuser)
        .fetch_one(&self.pool)
        .await
    }
}
