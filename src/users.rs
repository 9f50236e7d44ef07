use anyhow::Result;
use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::password::generate;
use crate::password::hash;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::utils::env_var_or_else;

const DEFAULT_INITIAL_USERNAME: &str = "admin";

/// User roles
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// The administrative account, sees every user
    Admin,
    /// Regular calendar user
    Member,
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub session_id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Is this the administrative account?
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Credentials for the administrative account created on first start
pub struct InitialUser {
    /// Username of the account
    pub username: String,

    /// Plain password of the account
    pub password: String,
}

impl InitialUser {
    /// Read the initial credentials from the environment
    ///
    /// Falls back to a default username and a generated password
    pub fn from_env() -> Self {
        let username = env_var_or_else("INITIAL_USERNAME", || {
            tracing::info!(
                "`INITIAL_USERNAME` not set, using default username: {DEFAULT_INITIAL_USERNAME}"
            );
            DEFAULT_INITIAL_USERNAME.to_string()
        });

        let password = env_var_or_else("INITIAL_PASSWORD", || {
            let initial_password = generate();
            tracing::info!(
                "`INITIAL_PASSWORD` not set, generating new password: {initial_password}"
            );
            initial_password
        });

        Self { username, password }
    }
}

/// Make sure there is an administrative account to manage the calendar with
pub async fn ensure_initial_user<S: Storage>(
    storage: &S,
    initial_user: &InitialUser,
) -> Result<()> {
    let user = storage.find_any_admin_user().await?;

    if user.is_none() {
        let hashed_password = hash(&initial_user.password)?;

        let values = CreateUserValues {
            session_id: &Uuid::new_v4(),
            role: Role::Admin,
            username: &initial_user.username,
            email: "",
            hashed_password: &hashed_password,
        };

        let user = storage.create_user(&values).await?;

        tracing::info!("Created initial user {} ({})", user.username, user.id);
    }

    Ok(())
}
