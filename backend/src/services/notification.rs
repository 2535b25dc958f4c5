//! In-app notifications
//!
//! Notifications are stored per recipient. Fan-out helpers insert one row per
//! user of the given roles and can run inside another operation's
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{NotificationType, Page, Role};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::Paginated;

/// Notification service for managing in-app notifications
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Message to deliver
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Broadcast request, addressed to roles, users or both
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,
    #[serde(rename = "type", default)]
    pub notification_type: NotificationType,
    #[validate(length(max = 500))]
    pub link: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    pub unread_only: Option<bool>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub recipients: u64,
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, type AS notification_type, link, is_read, created_at";

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Notifications of `user_id`, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: &NotificationFilter,
        page: Page,
    ) -> AppResult<Paginated<Notification>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications");
        push_filters(&mut count, user_id, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM notifications",
            NOTIFICATION_COLUMNS
        ));
        push_filters(&mut query, user_id, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<Notification>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Notification"));
        }
        Ok(())
    }

    /// Deliver a notification to every user of the listed roles and to the
    /// listed users
    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn broadcast(&self, input: CreateNotificationInput) -> AppResult<Delivery> {
        input.validate()?;
        if input.roles.is_empty() && input.user_ids.is_empty() {
            return Err(AppError::validation(
                "roles",
                "At least one role or user must be addressed",
            ));
        }

        let message = NewNotification {
            title: input.title,
            message: input.message,
            notification_type: input.notification_type,
            link: input.link,
        };

        let mut tx = self.db.begin().await?;
        let mut recipients = notify_roles(&mut tx, &input.roles, &message).await?;
        recipients += notify_users(&mut tx, &input.user_ids, &message).await?;
        tx.commit().await?;

        tracing::info!(recipients, "Notification broadcast");
        Ok(Delivery { recipients })
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &NotificationFilter) {
    query.push(" WHERE user_id = ").push_bind(user_id);
    if filter.unread_only.unwrap_or(false) {
        query.push(" AND is_read = FALSE");
    }
    if let Some(kind) = filter.notification_type {
        query.push(" AND type = ").push_bind(kind);
    }
}

/// Insert `message` for every active user holding one of `roles`
pub(crate) async fn notify_roles(
    conn: &mut PgConnection,
    roles: &[Role],
    message: &NewNotification,
) -> AppResult<u64> {
    if roles.is_empty() {
        return Ok(0);
    }
    let roles: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, type, link)
        SELECT id, $2, $3, $4, $5 FROM users
        WHERE role = ANY($1) AND is_active = TRUE
        "#,
    )
    .bind(&roles)
    .bind(&message.title)
    .bind(&message.message)
    .bind(message.notification_type)
    .bind(&message.link)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Insert `message` for each of `user_ids` that exists
pub(crate) async fn notify_users(
    conn: &mut PgConnection,
    user_ids: &[Uuid],
    message: &NewNotification,
) -> AppResult<u64> {
    if user_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, type, link)
        SELECT id, $2, $3, $4, $5 FROM users WHERE id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .bind(&message.title)
    .bind(&message.message)
    .bind(message.notification_type)
    .bind(&message.link)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
