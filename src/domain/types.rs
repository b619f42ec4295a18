//! Ledger entities, request DTOs and response envelopes.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of a transfer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferType {
    /// Funds entering the ledger from outside
    Deposit,
    /// Funds leaving the ledger
    Withdraw,
    /// Funds moved between two ledger accounts
    Internal,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::str::FromStr for TransferType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAW" => Ok(Self::Withdraw),
            "INTERNAL" => Ok(Self::Internal),
            _ => Err(format!("Invalid transfer type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Side of a transfer as seen from one account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "INCOMING",
            Self::Outgoing => "OUTGOING",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOMING" => Ok(Self::Incoming),
            "OUTGOING" => Ok(Self::Outgoing),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported currency and the number of decimal places accepted for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Currency {
    #[schema(example = "USD")]
    pub code: String,
    #[schema(example = 2)]
    pub precision: u32,
}

impl Currency {
    #[must_use]
    pub fn new(code: impl Into<String>, precision: u32) -> Self {
        Self {
            code: code.into(),
            precision,
        }
    }

    /// Round an amount to this currency's precision
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        round_to_precision(amount, self.precision)
    }
}

/// Round half-up (midpoint away from zero) to `precision` decimal places.
///
/// Rounding an already rounded value returns it unchanged.
#[must_use]
pub fn round_to_precision(amount: Decimal, precision: u32) -> Decimal {
    amount.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// Ledger account holding a balance in a single currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    #[schema(example = "1836981e-7bce-4356-99a5-a001073e51fe")]
    pub id: Uuid,
    #[schema(example = "USD")]
    pub currency_code: String,
    #[schema(value_type = String, example = "899.89")]
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every balance mutation
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn new(id: Uuid, currency_code: impl Into<String>, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            currency_code: currency_code.into(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Transfer header row; its id is the idempotency key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub transfer_type: TransferType,
    pub amount: Decimal,
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

/// One account-side leg of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPart {
    pub transfer_id: Uuid,
    pub account_id: Uuid,
    pub corresponding_account_id: Option<Uuid>,
    pub direction: Direction,
}

/// Order to move funds between two ledger accounts
#[derive(Debug, Clone, PartialEq)]
pub struct InnerTransferOrder {
    /// Caller-generated id, acts as idempotency key
    pub id: Uuid,
    pub sender_account_id: Uuid,
    pub receiver_account_id: Uuid,
    pub amount: Decimal,
    pub currency_code: String,
}

/// Transfer as seen from one of its accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransferInfo {
    pub id: Uuid,
    pub account_id: Uuid,
    pub corresponding_account_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    pub direction: Direction,
    #[schema(value_type = String, example = "100.11")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency_code: String,
    pub created_at: DateTime<Utc>,
}

impl TransferInfo {
    /// Amount with the sign of the direction: outgoing legs are negative
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Incoming => self.amount,
            Direction::Outgoing => -self.amount,
        }
    }
}

/// Request body for creating an internal transfer.
///
/// Missing ids deserialize to the nil UUID so that the service reports
/// which one is empty.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    #[serde(default)]
    #[schema(example = "ee795fcb-f656-4e2b-a095-4b872670d6f7")]
    pub id: Uuid,
    #[serde(default)]
    #[schema(example = "1836981e-7bce-4356-99a5-a001073e51fe")]
    pub sender_account_id: Uuid,
    #[serde(default)]
    #[schema(example = "8ff54aaa-31d7-4a04-908a-6fa375030432")]
    pub receiver_account_id: Uuid,
    #[serde(default)]
    #[schema(value_type = String, example = "100.111")]
    pub amount: Decimal,
    #[serde(default)]
    #[schema(example = "USD")]
    pub currency_code: String,
}

impl From<CreateTransferRequest> for InnerTransferOrder {
    fn from(req: CreateTransferRequest) -> Self {
        Self {
            id: req.id,
            sender_account_id: req.sender_account_id,
            receiver_account_id: req.receiver_account_id,
            amount: req.amount,
            currency_code: req.currency_code,
        }
    }
}

/// Outcome marker for write endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationResponse {
    #[schema(example = "OK")]
    pub result: String,
}

impl OperationResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            result: "OK".to_string(),
        }
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "0.1.0")]
    pub version: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database: HealthStatus) -> Self {
        Self {
            status: database,
            database,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code
    #[schema(example = "insufficient_funds")]
    pub r#type: String,
    #[schema(example = "insufficient funds")]
    pub message: String,
}
