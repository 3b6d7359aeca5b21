// Repository layer for database operations
// Events are append-only; notifications only ever flip is_read to true.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ripple_core::{CreateEvent, CreateNotification};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        Ok(Self { pool })
    }

    /// Apply pending SQL migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations up to date");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Events
    // ============================================

    pub async fn insert_event(&self, input: CreateEvent) -> Result<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (id, actor_id, verb, object_type, object_id, target_user_ids, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, actor_id, verb, object_type, object_id, target_user_ids, metadata, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.actor_id)
        .bind(&input.verb)
        .bind(&input.object_type)
        .bind(&input.object_id)
        .bind(&input.target_user_ids)
        .bind(&input.metadata)
        .bind(input.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Feed page: events where the user is actor or target, strictly before the cursor
    pub async fn list_feed(
        &self,
        user_id: &str,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, actor_id, verb, object_type, object_id, target_user_ids, metadata, created_at
            FROM events
            WHERE (actor_id = $1 OR target_user_ids @> ARRAY[$1::text])
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, actor_id, verb, object_type, object_id, target_user_ids, metadata, created_at
            FROM events
            WHERE created_at >= $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Notifications
    // ============================================

    pub async fn create_notification(&self, input: CreateNotification) -> Result<NotificationRow> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, user_id, event_id, is_read)
            VALUES ($1, $2, $3, false)
            RETURNING id, user_id, event_id, is_read, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.user_id)
        .bind(input.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<NotificationWithEventRow>> {
        let rows = sqlx::query_as::<_, NotificationWithEventRow>(
            r#"
            SELECT
                n.id, n.user_id, n.event_id, n.is_read, n.created_at,
                e.actor_id AS event_actor_id,
                e.verb AS event_verb,
                e.object_type AS event_object_type,
                e.object_id AS event_object_id,
                e.target_user_ids AS event_target_user_ids,
                e.metadata AS event_metadata,
                e.created_at AS event_created_at
            FROM notifications n
            LEFT JOIN events e ON e.id = n.event_id
            WHERE n.user_id = $1
              AND ($2::timestamptz IS NULL OR n.created_at > $2)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_unread(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE user_id = $1 AND is_read = false
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<Option<NotificationRow>> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications
            SET is_read = true
            WHERE id = $1
            RETURNING id, user_id, event_id, is_read, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
