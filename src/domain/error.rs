//! Error taxonomy for the ledger.

use thiserror::Error;
use uuid::Uuid;

/// Unique constraint guarding transfer ids; idempotency relies on it
pub const TRANSFERS_PKEY: &str = "transfers_pkey";

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True iff the failure is a uniqueness violation on the transfer id
    #[must_use]
    pub fn is_transfer_id_used(&self) -> bool {
        matches!(self, AppError::Database(DatabaseError::TransferIdUsed))
    }

    /// True iff the failure reports exactly `id` as missing
    #[must_use]
    pub fn is_entity_not_found(&self, id: Uuid) -> bool {
        if id.is_nil() {
            return false;
        }
        matches!(self, AppError::Database(DatabaseError::EntityNotFound(missing)) if *missing == id)
    }
}

/// Persistence failures, already classified at the gateway boundary
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("transfer id already used")]
    TransferIdUsed,

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("entity with id {0} not found")]
    EntityNotFound(Uuid),

    #[error("no rows affected")]
    NoRowsAffected,

    #[error("Corrupted row: {0}")]
    Corrupted(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                if db_err.constraint() == Some(TRANSFERS_PKEY) {
                    DatabaseError::TransferIdUsed
                } else {
                    DatabaseError::Duplicate(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Connection(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                DatabaseError::Corrupted(err.to_string())
            }
            _ => DatabaseError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(DatabaseError::from(err))
    }
}

/// Domain outcomes of a transfer order
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer id is empty")]
    EmptyTransferId,

    #[error("receiver id is empty")]
    EmptyReceiverId,

    #[error("sender id is empty")]
    EmptySenderId,

    #[error("accounts must be different")]
    AccountsMustBeDifferent,

    #[error("currency not supported")]
    UnsupportedCurrency,

    #[error("amount must be positive")]
    AmountMustBePositive,

    #[error("sender wrong currency")]
    SenderWrongCurrency,

    #[error("receiver wrong currency")]
    ReceiverWrongCurrency,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("sender does not exist")]
    SenderNotExists,

    #[error("receiver does not exist")]
    ReceiverNotExists,
}

/// Broad category of a [`TransferError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    /// Malformed input, rejected before any transaction
    Validation,
    /// Well-formed input that conflicts with ledger state
    Rejected,
    /// Referenced account is missing
    NotFound,
}

impl TransferError {
    /// Stable snake-case code exposed to API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyTransferId => "empty_transfer_id",
            Self::EmptyReceiverId => "empty_receiver_account_id",
            Self::EmptySenderId => "empty_sender_account_id",
            Self::AccountsMustBeDifferent => "accounts_must_be_different",
            Self::UnsupportedCurrency => "unsupported_currency",
            Self::AmountMustBePositive => "amount_must_be_positive",
            Self::SenderWrongCurrency => "sender_account_wrong_currency",
            Self::ReceiverWrongCurrency => "receiver_account_wrong_currency",
            Self::InsufficientFunds => "insufficient_funds",
            Self::SenderNotExists => "sender_account_not_exist",
            Self::ReceiverNotExists => "receiver_account_not_exist",
        }
    }

    pub fn kind(&self) -> TransferErrorKind {
        match self {
            Self::EmptyTransferId
            | Self::EmptyReceiverId
            | Self::EmptySenderId
            | Self::AccountsMustBeDifferent
            | Self::UnsupportedCurrency
            | Self::AmountMustBePositive => TransferErrorKind::Validation,
            Self::SenderWrongCurrency | Self::ReceiverWrongCurrency | Self::InsufficientFunds => {
                TransferErrorKind::Rejected
            }
            Self::SenderNotExists | Self::ReceiverNotExists => TransferErrorKind::NotFound,
        }
    }
}

/// Request-shape errors raised at the HTTP boundary
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    Multiple(String),
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
