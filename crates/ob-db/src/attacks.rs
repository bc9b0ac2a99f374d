use ob_core::types::{Attack, AttackMode, AttackState};
use uuid::Uuid;

use crate::{Db, DbResult};

/// Fields accepted when creating an attack. Position is assigned at the end
/// of the campaign's current ordering.
#[derive(Debug)]
pub struct NewAttack<'a> {
    pub campaign_id: i64,
    pub name: &'a str,
    pub attack_mode: AttackMode,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<&'a str>,
    pub left_rule: Option<&'a str>,
}

/// Metadata fields accepted on update.
#[derive(Debug, Default)]
pub struct AttackPatch<'a> {
    pub name: Option<&'a str>,
    pub word_list_id: Option<Uuid>,
    pub rule_list_id: Option<Uuid>,
    pub mask_list_id: Option<Uuid>,
    pub mask: Option<&'a str>,
    pub left_rule: Option<&'a str>,
}

/// Outcome of an atomic reorder.
#[derive(Debug, PartialEq, Eq)]
pub enum ReorderOutcome {
    Done,
    /// The given attack id does not exist in the campaign; nothing was
    /// written.
    UnknownAttack(i64),
}

impl Db {
    pub async fn create_attack(&self, new: &NewAttack<'_>) -> DbResult<Attack> {
        sqlx::query_as::<_, Attack>(
            r#"
            INSERT INTO attacks (campaign_id, name, attack_mode, position, state,
                                 word_list_id, rule_list_id, mask_list_id, mask, left_rule,
                                 created_at, updated_at)
            SELECT $1, $2, $3, COALESCE(MAX(position) + 1, 0), 'pending',
                   $4, $5, $6, $7, $8, now(), now()
            FROM attacks WHERE campaign_id = $1
            RETURNING *
            "#,
        )
        .bind(new.campaign_id)
        .bind(new.name)
        .bind(new.attack_mode)
        .bind(new.word_list_id)
        .bind(new.rule_list_id)
        .bind(new.mask_list_id)
        .bind(new.mask)
        .bind(new.left_rule)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_attack(&self, id: i64) -> DbResult<Option<Attack>> {
        sqlx::query_as::<_, Attack>("SELECT * FROM attacks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Page of attacks joined against campaigns for project scoping,
    /// ordered by `(position, id)`.
    pub async fn list_attacks(
        &self,
        project_ids: &[i64],
        campaign_id: Option<i64>,
        state: Option<AttackState>,
        limit: i64,
        offset: i64,
    ) -> DbResult<(Vec<Attack>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT count(*)
            FROM attacks a
            JOIN campaigns c ON c.id = a.campaign_id
            WHERE c.project_id = ANY($1)
              AND ($2::bigint IS NULL OR a.campaign_id = $2)
              AND ($3::attack_state IS NULL OR a.state = $3)
            "#,
        )
        .bind(project_ids)
        .bind(campaign_id)
        .bind(state)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Attack>(
            r#"
            SELECT a.*
            FROM attacks a
            JOIN campaigns c ON c.id = a.campaign_id
            WHERE c.project_id = ANY($1)
              AND ($2::bigint IS NULL OR a.campaign_id = $2)
              AND ($3::attack_state IS NULL OR a.state = $3)
            ORDER BY a.position ASC, a.id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(project_ids)
        .bind(campaign_id)
        .bind(state)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn attacks_for_campaign(&self, campaign_id: i64) -> DbResult<Vec<Attack>> {
        sqlx::query_as::<_, Attack>(
            "SELECT * FROM attacks WHERE campaign_id = $1 ORDER BY position ASC, id ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_attacks_for_campaign(&self, campaign_id: i64) -> DbResult<i64> {
        sqlx::query_scalar("SELECT count(*) FROM attacks WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn update_attack(&self, id: i64, patch: &AttackPatch<'_>) -> DbResult<Attack> {
        sqlx::query_as::<_, Attack>(
            r#"
            UPDATE attacks
            SET name = COALESCE($2, name),
                word_list_id = COALESCE($3, word_list_id),
                rule_list_id = COALESCE($4, rule_list_id),
                mask_list_id = COALESCE($5, mask_list_id),
                mask = COALESCE($6, mask),
                left_rule = COALESCE($7, left_rule),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.word_list_id)
        .bind(patch.rule_list_id)
        .bind(patch.mask_list_id)
        .bind(patch.mask)
        .bind(patch.left_rule)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_attack_state(&self, id: i64, state: AttackState) -> DbResult<Attack> {
        sqlx::query_as::<_, Attack>(
            "UPDATE attacks SET state = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(state)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_attack(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM attacks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write all positions in one transaction. Either every attack in
    /// `order` belongs to the campaign and all positions land, or nothing
    /// is written.
    pub async fn reorder_attacks(
        &self,
        campaign_id: i64,
        order: &[(i64, i32)],
    ) -> DbResult<ReorderOutcome> {
        let mut tx = self.begin().await?;
        for (attack_id, position) in order {
            let result = sqlx::query(
                "UPDATE attacks SET position = $3, updated_at = now() WHERE id = $1 AND campaign_id = $2",
            )
            .bind(attack_id)
            .bind(campaign_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(ReorderOutcome::UnknownAttack(*attack_id));
            }
        }
        tx.commit().await?;
        Ok(ReorderOutcome::Done)
    }

    /// Attacks referencing the resource, by either linkage predicate:
    /// `word_list_id` equality or `left_rule` textual match on the guid.
    pub async fn attacks_using_resource(
        &self,
        resource_id: Uuid,
        guid: Uuid,
    ) -> DbResult<Vec<Attack>> {
        sqlx::query_as::<_, Attack>(
            r#"
            SELECT * FROM attacks
            WHERE word_list_id = $1 OR left_rule = $2
            ORDER BY id ASC
            "#,
        )
        .bind(resource_id)
        .bind(guid.to_string())
        .fetch_all(&self.pool)
        .await
    }

    /// Usage count as the sum of the two linkage predicates. A row matching
    /// both predicates counts twice; the detail view deduplicates instead.
    pub async fn resource_usage_count(&self, resource_id: Uuid, guid: Uuid) -> DbResult<i64> {
        let word_list_count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM attacks WHERE word_list_id = $1")
                .bind(resource_id)
                .fetch_one(&self.pool)
                .await?;
        let left_rule_count: i64 =
            sqlx::query_scalar("SELECT count(*) FROM attacks WHERE left_rule = $1")
                .bind(guid.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(word_list_count + left_rule_count)
    }
}
