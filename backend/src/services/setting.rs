//! Key/value application settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::validate_list;

/// Settings service
#[derive(Clone)]
pub struct SettingService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub key: String,
    pub value: Json<Value>,
    pub category: String,
    pub description: Option<String>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingValueInput {
    pub value: Value,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingEntryInput {
    #[validate(custom = "shared::setting_key")]
    pub key: String,
    pub value: Value,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkSettingsInput {
    pub settings: Vec<SettingEntryInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingFilter {
    pub category: Option<String>,
}

const DEFAULT_CATEGORY: &str = "general";

const SETTING_COLUMNS: &str = "key, value, category, description, updated_by, updated_at";

impl SettingService {
    /// Create a new SettingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &SettingFilter) -> AppResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(&format!(
            "SELECT {} FROM settings WHERE ($1::VARCHAR IS NULL OR category = $1) \
             ORDER BY category, key",
            SETTING_COLUMNS
        ))
        .bind(filter.category.as_deref())
        .fetch_all(&self.db)
        .await?;
        Ok(settings)
    }

    pub async fn get(&self, key: &str) -> AppResult<Setting> {
        sqlx::query_as::<_, Setting>(&format!(
            "SELECT {} FROM settings WHERE key = $1",
            SETTING_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Setting '{}'", key)))
    }

    /// Create or replace one setting
    #[tracing::instrument(skip(self, input))]
    pub async fn put(&self, key: &str, input: SettingValueInput, user_id: Uuid) -> AppResult<Setting> {
        shared::setting_key(key).map_err(|e| {
            let message = e.message.map(|m| m.to_string()).unwrap_or_default();
            AppError::validation("key", message)
        })?;
        input.validate()?;

        let mut conn = self.db.acquire().await?;
        let setting = upsert(
            &mut conn,
            key,
            &input.value,
            input.category.as_deref(),
            input.description.as_deref(),
            user_id,
        )
        .await?;
        tracing::info!(%key, "Setting saved");
        Ok(setting)
    }

    /// Upsert several settings atomically
    #[tracing::instrument(skip(self, input), fields(count = input.settings.len()))]
    pub async fn put_many(&self, input: BulkSettingsInput, user_id: Uuid) -> AppResult<Vec<Setting>> {
        if input.settings.is_empty() {
            return Err(AppError::validation("settings", "At least one setting is required"));
        }
        validate_list("settings", &input.settings)?;

        let mut tx = self.db.begin().await?;
        let mut saved = Vec::with_capacity(input.settings.len());
        for entry in &input.settings {
            saved.push(
                upsert(
                    &mut tx,
                    &entry.key,
                    &entry.value,
                    entry.category.as_deref(),
                    entry.description.as_deref(),
                    user_id,
                )
                .await?,
            );
        }
        tx.commit().await?;

        tracing::info!(count = saved.len(), "Settings saved");
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM settings WHERE key = $1")
            .bind(key)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Setting '{}'", key)));
        }
        Ok(())
    }
}

async fn upsert(
    conn: &mut PgConnection,
    key: &str,
    value: &Value,
    category: Option<&str>,
    description: Option<&str>,
    user_id: Uuid,
) -> AppResult<Setting> {
    let setting = sqlx::query_as::<_, Setting>(&format!(
        r#"
        INSERT INTO settings (key, value, category, description, updated_by)
        VALUES ($1, $2, COALESCE($3, $6), $4, $5)
        ON CONFLICT (key) DO UPDATE SET
            value = EXCLUDED.value,
            category = COALESCE($3, settings.category),
            description = COALESCE($4, settings.description),
            updated_by = EXCLUDED.updated_by,
            updated_at = NOW()
        RETURNING {}
        "#,
        SETTING_COLUMNS
    ))
    .bind(key)
    .bind(Json(value))
    .bind(category)
    .bind(description)
    .bind(user_id)
    .bind(DEFAULT_CATEGORY)
    .fetch_one(conn)
    .await?;
    Ok(setting)
}
