use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dreddi_core::{
    ContactKey, Notification, Profile, Promise, PromiseStore, PromiseVersion, ReputationCounts,
};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

const PROMISE_COLUMNS: &str = r#"
    id, title, details, status, mode, visibility, executor, due_at, completed_at,
    creator_id, counterparty_id, counterparty_contact, promisor_id, promisee_id,
    confirmed_at, disputed_at, dispute_reason, condition_text, condition_met_at,
    condition_met_by, invite_token, invite_status, invited_at, accepted_at, declined_at,
    created_at
"#;

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// `PromiseStore` over the hosted Postgres schema (`promises`, `profiles`, `notifications`).
#[derive(Clone)]
pub struct PgPromiseStore {
    pool: PgPool,
}

impl PgPromiseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(connect_database(database_url).await?))
    }

    async fn fetch_profile(&self, statement: &str, value: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(statement)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }
}

#[async_trait]
impl PromiseStore for PgPromiseStore {
    async fn insert_promise(&self, promise: &Promise) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO promises ({PROMISE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26)
            "#
        ))
        .bind(promise.id)
        .bind(&promise.title)
        .bind(&promise.details)
        .bind(promise.status.as_str())
        .bind(promise.mode.as_str())
        .bind(promise.visibility.as_str())
        .bind(promise.executor.as_str())
        .bind(promise.due_at)
        .bind(promise.completed_at)
        .bind(promise.creator_id)
        .bind(promise.counterparty_id)
        .bind(&promise.counterparty_contact)
        .bind(promise.promisor_id)
        .bind(promise.promisee_id)
        .bind(promise.confirmed_at)
        .bind(promise.disputed_at)
        .bind(&promise.dispute_reason)
        .bind(&promise.condition_text)
        .bind(promise.condition_met_at)
        .bind(promise.condition_met_by)
        .bind(&promise.invite_token)
        .bind(promise.invite_status.as_str())
        .bind(promise.invited_at)
        .bind(promise.accepted_at)
        .bind(promise.declined_at)
        .bind(promise.created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert promise")?;

        Ok(())
    }

    async fn get_promise(&self, promise_id: Uuid) -> Result<Option<Promise>> {
        let row = sqlx::query(&format!(
            "SELECT {PROMISE_COLUMNS} FROM promises WHERE id = $1"
        ))
        .bind(promise_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(promise_from_row).transpose()
    }

    async fn find_by_invite_token(&self, token: &str) -> Result<Option<Promise>> {
        let row = sqlx::query(&format!(
            "SELECT {PROMISE_COLUMNS} FROM promises WHERE invite_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(promise_from_row).transpose()
    }

    async fn update_promise(
        &self,
        promise: &Promise,
        expected: PromiseVersion,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE promises
            SET status = $2,
                completed_at = $3,
                counterparty_id = $4,
                promisor_id = $5,
                promisee_id = $6,
                confirmed_at = $7,
                disputed_at = $8,
                dispute_reason = $9,
                condition_met_at = $10,
                condition_met_by = $11,
                invite_status = $12,
                accepted_at = $13,
                declined_at = $14
            WHERE id = $1
              AND status = $15
              AND invite_status = $16
              AND (condition_met_at IS NOT NULL) = $17
            "#,
        )
        .bind(promise.id)
        .bind(promise.status.as_str())
        .bind(promise.completed_at)
        .bind(promise.counterparty_id)
        .bind(promise.promisor_id)
        .bind(promise.promisee_id)
        .bind(promise.confirmed_at)
        .bind(promise.disputed_at)
        .bind(&promise.dispute_reason)
        .bind(promise.condition_met_at)
        .bind(promise.condition_met_by)
        .bind(promise.invite_status.as_str())
        .bind(promise.accepted_at)
        .bind(promise.declined_at)
        .bind(expected.status.as_str())
        .bind(expected.invite_status.as_str())
        .bind(expected.condition_met)
        .execute(&self.pool)
        .await
        .context("failed to update promise")?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT id, display_name, handle, email FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_profile_by_handle(&self, handle: &str) -> Result<Option<Profile>> {
        self.fetch_profile(
            "SELECT id, display_name, handle, email FROM profiles WHERE lower(handle) = lower($1)",
            handle.trim().trim_start_matches('@'),
        )
        .await
    }

    async fn resolve_contact(&self, contact: &str) -> Result<Option<Profile>> {
        match ContactKey::parse(contact) {
            Some(ContactKey::Handle(handle)) => self.find_profile_by_handle(handle).await,
            Some(ContactKey::Email(email)) => {
                self.fetch_profile(
                    "SELECT id, display_name, handle, email FROM profiles WHERE lower(email) = lower($1)",
                    email,
                )
                .await
            }
            None => Ok(None),
        }
    }

    async fn reputation_counts(&self, user_id: Uuid) -> Result<ReputationCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'confirmed' AND promisee_id = $1)::BIGINT AS confirmed,
                COUNT(*) FILTER (WHERE status = 'confirmed' AND promisor_id = $1)::BIGINT AS completed,
                COUNT(*) FILTER (WHERE status = 'disputed' AND promisor_id = $1)::BIGINT AS disputed
            FROM promises
            WHERE promisor_id = $1 OR promisee_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to load reputation counts")?;

        Ok(ReputationCounts::new(
            count_column(row.try_get("confirmed")?)?,
            count_column(row.try_get("completed")?)?,
            count_column(row.try_get("disputed")?)?,
        ))
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, promise_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.kind)
        .bind(notification.promise_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert notification")?;

        Ok(())
    }
}

fn promise_from_row(row: &PgRow) -> Result<Promise> {
    Ok(Promise {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        details: row.try_get("details")?,
        status: enum_column(row, "status")?,
        mode: enum_column(row, "mode")?,
        visibility: enum_column(row, "visibility")?,
        executor: enum_column(row, "executor")?,
        due_at: row.try_get("due_at")?,
        completed_at: row.try_get("completed_at")?,
        creator_id: row.try_get("creator_id")?,
        counterparty_id: row.try_get("counterparty_id")?,
        counterparty_contact: row.try_get("counterparty_contact")?,
        promisor_id: row.try_get("promisor_id")?,
        promisee_id: row.try_get("promisee_id")?,
        confirmed_at: row.try_get("confirmed_at")?,
        disputed_at: row.try_get("disputed_at")?,
        dispute_reason: row.try_get("dispute_reason")?,
        condition_text: row.try_get("condition_text")?,
        condition_met_at: row.try_get("condition_met_at")?,
        condition_met_by: row.try_get("condition_met_by")?,
        invite_token: row.try_get("invite_token")?,
        invite_status: enum_column(row, "invite_status")?,
        invited_at: row.try_get("invited_at")?,
        accepted_at: row.try_get("accepted_at")?,
        declined_at: row.try_get("declined_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        display_name: row.try_get("display_name")?,
        handle: row.try_get("handle")?,
        email: row.try_get("email")?,
    })
}

fn enum_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr<Err = dreddi_core::ParseError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .with_context(|| format!("promises.{column} holds an unexpected value"))
}

fn count_column(value: i64) -> Result<u32> {
    u32::try_from(value).with_context(|| format!("count {value} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_must_fit_non_negative_range() {
        assert_eq!(count_column(3).unwrap(), 3);
        assert!(count_column(-1).is_err());
        assert!(count_column(i64::from(u32::MAX) + 1).is_err());
    }
}
