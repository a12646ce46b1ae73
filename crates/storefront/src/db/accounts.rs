//! Account repository and the `PostgreSQL` identity provider.
//!
//! Queries are checked at runtime (`sqlx::query_as`) so the crate builds
//! without a live database.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use uuid::Uuid;

use shopdrop_core::{AccountId, Email, Phone, Role};

use super::RepositoryError;
use crate::forms::MIN_PASSWORD_LENGTH;
use crate::models::AccountRecord;
use crate::ports::password::{hash_password, verify_password};
use crate::ports::{IdentityError, IdentityProvider};
use crate::services::email::EmailService;

/// How long an email-verification token stays valid, in hours.
const EMAIL_TOKEN_TTL_HOURS: i32 = 24;

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: String,
    role: Role,
    email_verified: bool,
    phone_verified: bool,
}

impl AccountRow {
    fn into_record(self) -> Result<AccountRecord, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(AccountRecord {
            id: AccountId::new(self.id),
            email,
            role: self.role,
            email_verified: self.email_verified,
            phone_verified: self.phone_verified,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        id: &AccountId,
        email: &Email,
        password_hash: &str,
        role: Role,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.account (id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .bind(role)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email already exists"))?;

        Ok(())
    }

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: &AccountId) -> Result<Option<AccountRecord>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r"
            SELECT id, email, role, email_verified, phone_verified
            FROM storefront.account
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_record).transpose()
    }

    /// Get an account and its password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AccountRecord, String)>, RepositoryError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            r"
            SELECT id, email, role, email_verified, phone_verified, password_hash
            FROM storefront.account
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.account.into_record()?, r.password_hash)))
            .transpose()
    }

    /// Store a new email-verification token for an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_email_token(&self, id: &AccountId) -> Result<Uuid, RepositoryError> {
        let token = Uuid::new_v4();

        let result = sqlx::query(
            r"
            INSERT INTO storefront.email_verification_token (token, account_id, expires_at)
            SELECT $1, id, now() + make_interval(hours => $3)
            FROM storefront.account
            WHERE id = $2
            ",
        )
        .bind(token)
        .bind(id.as_str())
        .bind(EMAIL_TOKEN_TTL_HOURS)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(token)
    }

    /// Consume an unexpired email-verification token and mark its account's
    /// email as verified.
    ///
    /// Returns the account id, or `None` if the token is unknown, expired or
    /// already used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_email_token(&self, token: Uuid) -> Result<Option<AccountId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let account_id: Option<String> = sqlx::query_scalar(
            r"
            UPDATE storefront.email_verification_token
            SET consumed_at = now()
            WHERE token = $1 AND consumed_at IS NULL AND expires_at > now()
            RETURNING account_id
            ",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(account_id) = account_id else {
            return Ok(None);
        };

        sqlx::query(
            r"
            UPDATE storefront.account
            SET email_verified = TRUE, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(&account_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(AccountId::new(account_id)))
    }

    /// Mark the account's phone as verified. Never clears the flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_phone_verified(
        &self,
        id: &AccountId,
        phone: &Phone,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.account
            SET phone_verified = TRUE, verified_phone = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(phone.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Identity provider backed by the storefront database.
///
/// Email verification stores a token and mails its link. Without a mailer
/// every dispatch fails and no token is issued.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
    mailer: Option<EmailService>,
}

impl PgIdentityProvider {
    #[must_use]
    pub const fn new(pool: PgPool, mailer: Option<EmailService>) -> Self {
        Self { pool, mailer }
    }

    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(&self.pool)
    }
}

fn provider_error(err: RepositoryError) -> IdentityError {
    IdentityError::Provider(err.to_string())
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<AccountId, IdentityError> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakCredential(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let password_hash = hash_password(password)?;
        let id = AccountId::new(Uuid::new_v4().simple().to_string());

        self.accounts()
            .create(&id, email, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => IdentityError::CredentialConflict,
                other => provider_error(other),
            })?;

        Ok(id)
    }

    async fn send_email_verification(&self, account_id: &AccountId) -> Result<(), IdentityError> {
        let Some(mailer) = &self.mailer else {
            return Err(IdentityError::Provider(
                "outbound email is not configured".to_owned(),
            ));
        };

        let account = self
            .accounts()
            .get_by_id(account_id)
            .await
            .map_err(provider_error)?
            .ok_or_else(|| IdentityError::Provider(format!("unknown account {account_id}")))?;
        let token = self
            .accounts()
            .create_email_token(account_id)
            .await
            .map_err(provider_error)?;

        mailer
            .send_email_verification(&account.email, token)
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        tracing::info!(%account_id, "email verification sent");
        Ok(())
    }

    async fn confirm_email(&self, token: Uuid) -> Result<AccountId, IdentityError> {
        self.accounts()
            .consume_email_token(token)
            .await
            .map_err(provider_error)?
            .ok_or(IdentityError::InvalidToken)
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AccountRecord, IdentityError> {
        let (account, password_hash) = self
            .accounts()
            .get_with_password_hash(email)
            .await
            .map_err(provider_error)?
            .ok_or(IdentityError::InvalidCredential)?;

        verify_password(password, &password_hash)?;
        Ok(account)
    }

    async fn account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountRecord>, IdentityError> {
        self.accounts()
            .get_by_id(account_id)
            .await
            .map_err(provider_error)
    }

    async fn record_phone_verified(
        &self,
        account_id: &AccountId,
        phone: &Phone,
    ) -> Result<(), IdentityError> {
        self.accounts()
            .mark_phone_verified(account_id, phone)
            .await
            .map_err(provider_error)
    }
}
