//! Domain layer containing ledger types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AppError, ConfigError, DatabaseError, TRANSFERS_PKEY, TransferError, TransferErrorKind,
    ValidationError,
};
pub use traits::{CurrencyLookup, InnerTransferActions, InnerTransferCallback, LedgerRepository};
pub use types::{
    Account, CreateTransferRequest, Currency, Direction, ErrorDetail, ErrorResponse,
    HealthResponse, HealthStatus, InnerTransferOrder, OperationResponse, Transfer, TransferInfo,
    TransferPart, TransferType, round_to_precision,
};
