use rusqlite::Connection;

use crate::db::users::{self, Roles, UserFields};
use crate::error::AppError;

pub fn hash(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Constant-time via bcrypt. A malformed stored hash never matches.
pub fn verify(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}

/// Check a username/password pair. Returns the account id when it matches an
/// active account.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    let Some(creds) = users::credentials(conn, username)? else {
        return Ok(None);
    };
    if creds.is_active && verify(password, &creds.password_hash) {
        Ok(Some(creds.id))
    } else {
        Ok(None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Username already taken: {0}")]
    Taken(String),
}

impl From<CreateUserError> for AppError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::Database(e) => AppError::Database(e),
            CreateUserError::Hash(e) => AppError::Hash(e),
            // Validation checks the name first, so this is a lost race
            CreateUserError::Taken(name) => AppError::Internal(format!("username taken: {name}")),
        }
    }
}

/// Create an account with a hashed password.
pub fn create_user(
    conn: &Connection,
    fields: &UserFields,
    password: &str,
    roles: Roles,
) -> Result<i64, CreateUserError> {
    if users::username_taken(conn, &fields.username, None)? {
        return Err(CreateUserError::Taken(fields.username.clone()));
    }
    let hashed = hash(password)?;
    Ok(users::insert(conn, fields, &hashed, roles)?)
}
