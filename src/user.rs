use std::{fmt, str::FromStr};

use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Instructor => "INSTRUCTOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STUDENT" => Ok(Role::Student),
            "INSTRUCTOR" => Ok(Role::Instructor),
            other => Err(Error::validation(format!("unknown role {other}"))),
        }
    }
}

/// Public view of an account, never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
}

impl TryFrom<UserRow> for UserInfo {
    type Error = Error;
    fn try_from(row: UserRow) -> Result<Self> {
        Ok(UserInfo {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role.parse()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub role: Role,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

pub async fn create_user(database: &SqlitePool, user: NewUser) -> Result<UserInfo> {
    user.validate()?;
    let password_hash = hash_password(&user.password)?;
    let id = sqlx::query(
        "INSERT INTO user (username, email, password, first_name, last_name, role) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.role.as_str())
    .execute(database)
    .await
    .map_err(|e| Error::from_write(e, "Username or email is already registered", "user"))?
    .last_insert_rowid();
    info!("registered {} {} ({})", user.role, user.username, id);
    Ok(UserInfo {
        id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
    })
}

pub async fn login(database: &SqlitePool, username: &str, password: &str) -> Result<UserInfo> {
    let record: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password FROM user WHERE username = ?")
            .bind(username)
            .fetch_optional(database)
            .await?;
    let Some((id, stored)) = record else {
        return Err(Error::InvalidCredentials);
    };
    let parsed_hash = PasswordHash::new(&stored)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| Error::InvalidCredentials)?;
    get_user(database, id).await
}

pub async fn get_user(database: &SqlitePool, id: i64) -> Result<UserInfo> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, first_name, last_name, role FROM user WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(database)
    .await?
    .ok_or(Error::NotFound("user"))?;
    row.try_into()
}

pub async fn get_user_list(database: &SqlitePool) -> Result<Vec<UserInfo>> {
    sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, first_name, last_name, role FROM user ORDER BY id",
    )
    .fetch_all(database)
    .await?
    .into_iter()
    .map(UserInfo::try_from)
    .collect()
}
