use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::Row;
use uuid::Uuid;

use crate::app::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::domain::user::User;
use crate::infra::db::Db;

pub const DEFAULT_ROLE: &str = "role_user";

/// Identity resolved from a verified token.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    token_key: [u8; 32],
    token_ttl_days: u64,
}

impl AuthService {
    pub fn new(db: Db, token_key: [u8; 32], token_ttl_days: u64) -> Self {
        Self {
            db,
            token_key,
            token_ttl_days,
        }
    }

    pub async fn register(
        &self,
        name: String,
        last_name: Option<String>,
        nick: String,
        email: String,
        password: String,
        bio: Option<String>,
    ) -> ServiceResult<User> {
        let name = name.trim().to_string();
        let nick = nick.trim().to_lowercase();
        let email = email.trim().to_lowercase();
        if name.is_empty() || nick.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation(
                "name, nick, email and password are required".to_string(),
            ));
        }

        let password_hash = hash_password(&password)?;
        let row = sqlx::query(
            "INSERT INTO users (name, last_name, nick, email, password_hash, bio) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, last_name, nick, email, role, bio, image, created_at",
        )
        .bind(&name)
        .bind(&last_name)
        .bind(&nick)
        .bind(&email)
        .bind(&password_hash)
        .bind(&bio)
        .fetch_one(self.db.pool())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::AlreadyExists(
                    "a user with this nick or email already exists".to_string(),
                )
            } else {
                ServiceError::from(err)
            }
        })?;

        Ok(user_from_row(&row))
    }

    /// Verifies credentials and issues an access token. Unknown emails and
    /// wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, String)> {
        let row = sqlx::query(
            "SELECT id, name, last_name, nick, email, role, bio, image, created_at, password_hash \
             FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Err(ServiceError::Unauthenticated),
        };

        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Err(ServiceError::Unauthenticated);
        }

        let user = user_from_row(&row);
        let token = create_token(&self.token_key, self.token_ttl_days, user.id, &user.role)?;
        Ok((user, token))
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        last_name: row.get("last_name"),
        nick: row.get("nick"),
        email: row.get("email"),
        role: row.get("role"),
        bio: row.get("bio"),
        image: row.get("image"),
        created_at: row.get("created_at"),
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(
    key_bytes: &[u8; 32],
    ttl_days: u64,
    user_id: Uuid,
    role: &str,
) -> Result<String> {
    let duration = std::time::Duration::from_secs(ttl_days * 24 * 60 * 60);
    let mut claims = Claims::new_expires_in(&duration)?;
    claims.issuer("lazo")?;
    claims.audience("lazo")?;
    claims.subject(&user_id.to_string())?;
    claims.add_additional("role", role)?;

    let key = SymmetricKey::<V4>::from(key_bytes)?;
    Ok(local::encrypt(&key, &claims, None, None)?)
}

/// Decrypts and validates a token. `Ok(None)` means the token is invalid,
/// expired or malformed; `Err` is reserved for key setup failures.
pub fn verify_token(key_bytes: &[u8; 32], token: &str) -> Result<Option<AuthIdentity>> {
    let key = SymmetricKey::<V4>::from(key_bytes)?;
    let mut rules = ClaimsValidationRules::new();
    rules.validate_issuer_with("lazo");
    rules.validate_audience_with("lazo");

    let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };
    let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };
    let claims = match trusted.payload_claims() {
        Some(claims) => claims,
        None => return Ok(None),
    };

    let user_id = claims
        .get_claim("sub")
        .and_then(|value| value.as_str())
        .and_then(|value| Uuid::parse_str(value).ok());
    let user_id = match user_id {
        Some(user_id) => user_id,
        None => return Ok(None),
    };
    let role = claims
        .get_claim("role")
        .and_then(|value| value.as_str())
        .unwrap_or(DEFAULT_ROLE)
        .to_string();

    Ok(Some(AuthIdentity { user_id, role }))
}
