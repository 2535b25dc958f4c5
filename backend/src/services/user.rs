//! User account administration

use serde::Deserialize;
use shared::{Page, Role};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::auth::{hash_password, UserProfile, PROFILE_COLUMNS};
use crate::services::{like_pattern, search_term, Paginated};

/// User service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &UserFilter, page: Page) -> AppResult<Paginated<UserProfile>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM users WHERE TRUE",
            PROFILE_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<UserProfile>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    #[tracing::instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create(&self, input: CreateUserInput) -> AppResult<UserProfile> {
        input.validate()?;
        let password_hash = hash_password(&input.password)?;

        let user = sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO users (email, password_hash, name, role) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(input.email.trim().to_lowercase())
        .bind(&password_hash)
        .bind(input.name.trim())
        .bind(input.role)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateUserInput) -> AppResult<UserProfile> {
        input.validate()?;
        let password_hash = input.password.as_deref().map(hash_password).transpose()?;

        sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                name = COALESCE($4, name),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(id)
        .bind(input.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(password_hash)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.role)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    /// Delete another user's account
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, acting_user: Uuid) -> AppResult<()> {
        if id == acting_user {
            return Err(AppError::ValidationError(
                "You cannot delete your own account".to_string(),
            ));
        }
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
}
