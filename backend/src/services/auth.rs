//! Authentication service for login, token issuing and password changes

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use shared::Role;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    expiry_seconds: i64,
}

/// JWT claims structure: `{id, email, role}` plus timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// User row including credentials
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    password_hash: String,
    is_active: bool,
}

/// Columns selected for `UserProfile`
pub(crate) const PROFILE_COLUMNS: &str =
    "id, email, name, role, is_active, last_login_at, created_at, updated_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, jwt: &JwtConfig) -> Self {
        Self {
            db,
            jwt_secret: jwt.secret.clone(),
            expiry_seconds: jwt.expiry_seconds,
        }
    }

    /// Authenticate user with email and password
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthToken> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, password_hash, is_active FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;

        let token = self.issue_token(profile.id, &profile.email, profile.role)?;
        tracing::info!(user_id = %profile.id, "User logged in");

        Ok(AuthToken {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.expiry_seconds,
            user: profile,
        })
    }

    /// Profile of the authenticated user
    pub async fn me(&self, user_id: Uuid) -> AppResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    /// Change the password of the authenticated user
    #[tracing::instrument(skip(self, input))]
    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordInput) -> AppResult<()> {
        input.validate()?;

        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::not_found("User"))?;

        let valid = verify(&input.current_password, &current_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::validation(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let new_hash = hash_password(&input.new_password)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(%user_id, "Password changed");
        Ok(())
    }

    /// Sign an access token for a user
    pub fn issue_token(&self, id: Uuid, email: &str, role: Role) -> AppResult<String> {
        encode_token(&self.jwt_secret, id, email, role, self.expiry_seconds)
    }
}

/// Hash a password with bcrypt
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Sign `{id, email, role}` with `secret`, valid for `expiry_seconds`
pub fn encode_token(
    secret: &str,
    id: Uuid,
    email: &str,
    role: Role,
    expiry_seconds: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        id,
        email: email.to_string(),
        role,
        exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a token signed with `secret`
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let id = Uuid::new_v4();
        let token = encode_token(SECRET, id, "a@b.co", Role::Accountant, 60).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "a@b.co");
        assert_eq!(claims.role, Role::Accountant);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = encode_token(SECRET, Uuid::new_v4(), "a@b.co", Role::Admin, 60).unwrap();
        assert!(matches!(
            decode_token(&token, "other-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_expired() {
        // Beyond the default 60s leeway
        let token = encode_token(SECRET, Uuid::new_v4(), "a@b.co", Role::Admin, -120).unwrap();
        assert!(matches!(
            decode_token(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            decode_token("not.a.token", SECRET),
            Err(AppError::InvalidToken)
        ));
    }
}
