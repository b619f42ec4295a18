//! PostgreSQL ledger repository.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    Account, AppError, CurrencyLookup, DatabaseError, InnerTransferActions, InnerTransferCallback,
    LedgerRepository, Transfer, TransferInfo, TransferPart,
};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// PostgreSQL ledger client with connection pooling
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client with custom configuration
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, AppError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client with default configuration
    pub async fn with_defaults(database_url: &str) -> Result<Self, AppError> {
        Self::new(database_url, PostgresConfig::default()).await
    }

    /// Connect, retrying up to `attempts` times with a fixed pause in between
    pub async fn connect_with_retry(
        database_url: &str,
        config: PostgresConfig,
        attempts: u32,
        pause: Duration,
    ) -> Result<Self, AppError> {
        let attempts = attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match Self::new(database_url, config.clone()).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!(
                        attempt,
                        retries_left = attempts - attempt,
                        pause_secs = pause.as_secs_f64(),
                        error = %e,
                        "PostgreSQL connection failed"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Database(DatabaseError::Connection("no attempts made".to_string()))
        }))
    }

    /// Wrap an existing pool
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations using sqlx migrate
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Migration(e.to_string())))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying connection pool (for testing)
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account, AppError> {
        Ok(Account {
            id: row.try_get("id").map_err(DatabaseError::from)?,
            currency_code: row.try_get("currency_code").map_err(DatabaseError::from)?,
            balance: row.try_get("balance").map_err(DatabaseError::from)?,
            created_at: row.try_get("created_at").map_err(DatabaseError::from)?,
            updated_at: row.try_get("updated_at").map_err(DatabaseError::from)?,
        })
    }

    fn row_to_transfer_info(row: &sqlx::postgres::PgRow) -> Result<TransferInfo, AppError> {
        let transfer_type: String = row.try_get("type").map_err(DatabaseError::from)?;
        let direction: String = row.try_get("direction").map_err(DatabaseError::from)?;

        Ok(TransferInfo {
            id: row.try_get("id").map_err(DatabaseError::from)?,
            account_id: row.try_get("account_id").map_err(DatabaseError::from)?,
            corresponding_account_id: row
                .try_get("corresponding_account_id")
                .map_err(DatabaseError::from)?,
            transfer_type: transfer_type.parse().map_err(DatabaseError::Corrupted)?,
            direction: direction.parse().map_err(DatabaseError::Corrupted)?,
            amount: row.try_get("amount").map_err(DatabaseError::from)?,
            currency_code: row.try_get("currency_code").map_err(DatabaseError::from)?,
            created_at: row.try_get("created_at").map_err(DatabaseError::from)?,
        })
    }

    async fn rollback(tx: Transaction<'static, Postgres>) {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Transaction rollback failed");
        }
    }
}

fn validate_affected(rows_affected: u64) -> Result<(), AppError> {
    if rows_affected == 0 {
        return Err(AppError::Database(DatabaseError::NoRowsAffected));
    }
    Ok(())
}

/// Mutations bound to the open transaction holding both account locks
struct PgInnerTransferActions {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InnerTransferActions for PgInnerTransferActions {
    async fn create_transfer(&mut self, transfer: &Transfer) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transfers (id, type, amount, currency_code, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transfer.id)
        .bind(transfer.transfer_type.as_str())
        .bind(transfer.amount)
        .bind(&transfer.currency_code)
        .bind(transfer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::from)?;

        validate_affected(result.rows_affected())
    }

    async fn update_balance(
        &mut self,
        account_id: Uuid,
        balance: Decimal,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(balance)
        .bind(chrono::Utc::now())
        .bind(account_id)
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::from)?;

        validate_affected(result.rows_affected())
    }

    async fn create_transfer_part(&mut self, part: &TransferPart) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transfer_parts (transfer_id, account_id, corresponding_account_id, direction)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(part.transfer_id)
        .bind(part.account_id)
        .bind(part.corresponding_account_id)
        .bind(part.direction.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::from)?;

        validate_affected(result.rows_affected())
    }
}

#[async_trait]
impl CurrencyLookup for PostgresClient {
    #[instrument(skip(self))]
    async fn get_precision(&self, currency_code: &str) -> Result<Option<u32>, AppError> {
        let precision: Option<i32> =
            sqlx::query_scalar("SELECT precision FROM currencies WHERE code = $1")
                .bind(currency_code)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        precision
            .map(|p| {
                u32::try_from(p).map_err(|_| {
                    AppError::Database(DatabaseError::Corrupted(format!(
                        "negative precision {} for currency {}",
                        p, currency_code
                    )))
                })
            })
            .transpose()
    }
}

#[async_trait]
impl LedgerRepository for PostgresClient {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(DatabaseError::Connection(e.to_string())))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_accounts(&self, limit: i64) -> Result<Vec<Account>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, currency_code, balance, created_at, updated_at
            FROM accounts
            ORDER BY updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.iter().map(Self::row_to_account).collect()
    }

    #[instrument(skip(self))]
    async fn get_transfer_infos(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransferInfo>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, tp.account_id, tp.corresponding_account_id, t.type, tp.direction,
                   t.currency_code, t.amount, t.created_at
            FROM transfer_parts AS tp
            INNER JOIN transfers AS t ON tp.transfer_id = t.id
            WHERE tp.account_id = $1
            ORDER BY t.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.iter().map(Self::row_to_transfer_info).collect()
    }

    #[instrument(skip(self, callback))]
    async fn create_inner_transfer_with_lock(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        callback: &dyn InnerTransferCallback,
    ) -> Result<(), AppError> {
        // Dropping an uncommitted transaction (panic, cancelled future) rolls it back.
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        // Locks are taken in id order so that A->B and B->A cannot deadlock.
        let rows = sqlx::query(
            r#"
            SELECT id, currency_code, balance, created_at, updated_at
            FROM accounts
            WHERE id IN ($1, $2)
            ORDER BY id
            FOR NO KEY UPDATE
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(&mut *tx)
        .await;

        let accounts = match rows {
            Ok(rows) => match rows
                .iter()
                .map(Self::row_to_account)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(accounts) => accounts,
                Err(e) => {
                    Self::rollback(tx).await;
                    return Err(e);
                }
            },
            Err(e) => {
                Self::rollback(tx).await;
                return Err(DatabaseError::from(e).into());
            }
        };

        let find = |id: Uuid| accounts.iter().find(|a| a.id == id).cloned();
        let (sender, receiver) = match (find(sender_id), find(receiver_id)) {
            (Some(sender), Some(receiver)) => (sender, receiver),
            (None, _) => {
                Self::rollback(tx).await;
                return Err(DatabaseError::EntityNotFound(sender_id).into());
            }
            (_, None) => {
                Self::rollback(tx).await;
                return Err(DatabaseError::EntityNotFound(receiver_id).into());
            }
        };
        debug!(sender = %sender.id, receiver = %receiver.id, "Accounts locked");

        let mut actions = PgInnerTransferActions { tx };
        let result = callback.apply(&sender, &receiver, &mut actions).await;
        let tx = actions.tx;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(DatabaseError::from)?;
                Ok(())
            }
            Err(e) => {
                Self::rollback(tx).await;
                Err(e)
            }
        }
    }
}
