//! Domain traits defining contracts for the persistence layer.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::AppError;
use super::types::{Account, Transfer, TransferInfo, TransferPart};

/// Reference data lookup for currency precision
#[async_trait]
pub trait CurrencyLookup: Send + Sync {
    /// Number of decimal places for `currency_code`, `None` if unsupported
    async fn get_precision(&self, currency_code: &str) -> Result<Option<u32>, AppError>;
}

/// Mutations available to a callback while both accounts are locked.
///
/// Each call affects exactly one row; zero affected rows is reported as
/// `DatabaseError::NoRowsAffected`.
#[async_trait]
pub trait InnerTransferActions: Send {
    /// Insert the transfer header. A reused id fails with `DatabaseError::TransferIdUsed`.
    async fn create_transfer(&mut self, transfer: &Transfer) -> Result<(), AppError>;

    /// Set an account balance to an absolute value and refresh `updated_at`
    async fn update_balance(&mut self, account_id: Uuid, balance: Decimal)
    -> Result<(), AppError>;

    /// Insert one leg of a transfer
    async fn create_transfer_part(&mut self, part: &TransferPart) -> Result<(), AppError>;
}

/// Logic executed inside the locked unit of work
#[async_trait]
pub trait InnerTransferCallback: Send + Sync {
    async fn apply(
        &self,
        sender: &Account,
        receiver: &Account,
        actions: &mut dyn InnerTransferActions,
    ) -> Result<(), AppError>;
}

/// Persistence gateway owning accounts, transfers and transfer parts
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Check database connectivity
    async fn health_check(&self) -> Result<(), AppError>;

    /// Accounts ordered by `updated_at` ascending
    async fn get_accounts(&self, limit: i64) -> Result<Vec<Account>, AppError>;

    /// Transfers touching `account_id`, newest first
    async fn get_transfer_infos(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransferInfo>, AppError>;

    /// Lock sender and receiver and run `callback` in a single transaction.
    ///
    /// Fails with `DatabaseError::EntityNotFound` for the first missing account
    /// (sender checked first) without invoking the callback. Any error from the
    /// callback rolls back every mutation it made.
    async fn create_inner_transfer_with_lock(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        callback: &dyn InnerTransferCallback,
    ) -> Result<(), AppError>;
}
