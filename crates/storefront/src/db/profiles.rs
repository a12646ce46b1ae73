//! Profile repository and the `PostgreSQL` profile store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use shopdrop_core::{AccountId, Role};

use super::RepositoryError;
use crate::models::{ProfileRecord, RegistrantProfile};
use crate::ports::{ProfileStore, StoreError};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    account_id: String,
    role: Role,
    profile: Json<RegistrantProfile>,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            account_id: AccountId::new(row.account_id),
            role: row.role,
            profile: row.profile.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a profile. The database assigns `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the account already has a profile.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        account_id: &AccountId,
        profile: &RegistrantProfile,
    ) -> Result<ProfileRecord, RepositoryError> {
        let row: ProfileRow = sqlx::query_as(
            r"
            INSERT INTO storefront.profile (account_id, role, profile)
            VALUES ($1, $2, $3)
            RETURNING account_id, role, profile, created_at
            ",
        )
        .bind(account_id.as_str())
        .bind(profile.role())
        .bind(Json(profile))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "profile already exists"))?;

        Ok(row.into())
    }

    /// Get the profile stored for an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails or the stored
    /// JSON does not match the profile shape.
    pub async fn get(&self, account_id: &AccountId) -> Result<Option<ProfileRecord>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r"
            SELECT account_id, role, profile, created_at
            FROM storefront.profile
            WHERE account_id = $1
            ",
        )
        .bind(account_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// Profile store backed by the storefront database.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn save(
        &self,
        account_id: &AccountId,
        profile: &RegistrantProfile,
    ) -> Result<ProfileRecord, StoreError> {
        ProfileRepository::new(&self.pool)
            .create(account_id, profile)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => StoreError::Conflict(account_id.clone()),
                other => StoreError::Backend(other.to_string()),
            })
    }

    async fn load(&self, account_id: &AccountId) -> Result<Option<ProfileRecord>, StoreError> {
        ProfileRepository::new(&self.pool)
            .get(account_id)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
