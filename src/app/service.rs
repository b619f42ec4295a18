//! Transfer orchestration: validation, precision handling and the
//! double-entry mutation run under the repository's account locks.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    Account, AppError, CurrencyLookup, Direction, HealthResponse, HealthStatus,
    InnerTransferActions, InnerTransferCallback, InnerTransferOrder, LedgerRepository, Transfer,
    TransferError, TransferInfo, TransferPart, TransferType, round_to_precision,
};

/// Maximum number of transfers returned for one account
pub const TRANSFER_LIST_LIMIT: i64 = 100;

/// Maximum number of accounts returned by a listing
pub const ACCOUNT_LIST_LIMIT: i64 = 100;

/// Application service containing the ledger business logic
pub struct TransferService {
    currencies: Arc<dyn CurrencyLookup>,
    repository: Arc<dyn LedgerRepository>,
}

impl TransferService {
    #[must_use]
    pub fn new(currencies: Arc<dyn CurrencyLookup>, repository: Arc<dyn LedgerRepository>) -> Self {
        Self {
            currencies,
            repository,
        }
    }

    /// Move funds between two accounts.
    ///
    /// Replaying an order whose id was already committed succeeds without
    /// touching any balance.
    #[instrument(
        skip(self, order),
        fields(
            transfer_id = %order.id,
            sender = %order.sender_account_id,
            receiver = %order.receiver_account_id,
            currency = %order.currency_code,
        )
    )]
    pub async fn create_transfer(&self, order: &InnerTransferOrder) -> Result<(), AppError> {
        let amount = self.validate(order).await.inspect_err(|e| {
            warn!(error = %e, "Transfer order rejected");
        })?;

        let mutation = InternalTransferMutation {
            transfer_id: order.id,
            amount,
            currency_code: order.currency_code.clone(),
        };

        let result = self
            .repository
            .create_inner_transfer_with_lock(
                order.sender_account_id,
                order.receiver_account_id,
                &mutation,
            )
            .await;

        match result {
            Ok(()) => {
                info!(amount = %amount, "Transfer committed");
                Ok(())
            }
            Err(e) if e.is_transfer_id_used() => {
                info!("Transfer id already used, treating as replay");
                Ok(())
            }
            Err(e) if e.is_entity_not_found(order.sender_account_id) => {
                warn!("Sender account not found");
                Err(TransferError::SenderNotExists.into())
            }
            Err(e) if e.is_entity_not_found(order.receiver_account_id) => {
                warn!("Receiver account not found");
                Err(TransferError::ReceiverNotExists.into())
            }
            Err(AppError::Transfer(rejection)) => {
                warn!(reason = %rejection, "Transfer rejected");
                Err(AppError::Transfer(rejection))
            }
            Err(e) => {
                error!(error = %e, "Transfer transaction failed");
                Err(e)
            }
        }
    }

    /// Checks that need no lock. Returns the amount rounded to the currency precision.
    async fn validate(&self, order: &InnerTransferOrder) -> Result<Decimal, AppError> {
        if order.id.is_nil() {
            return Err(TransferError::EmptyTransferId.into());
        }
        if order.receiver_account_id.is_nil() {
            return Err(TransferError::EmptyReceiverId.into());
        }
        if order.sender_account_id.is_nil() {
            return Err(TransferError::EmptySenderId.into());
        }
        if order.sender_account_id == order.receiver_account_id {
            return Err(TransferError::AccountsMustBeDifferent.into());
        }

        let precision = self
            .currencies
            .get_precision(&order.currency_code)
            .await?
            .ok_or(TransferError::UnsupportedCurrency)?;

        let amount = round_to_precision(order.amount, precision);
        if amount <= Decimal::ZERO {
            return Err(TransferError::AmountMustBePositive.into());
        }

        Ok(amount)
    }

    /// Latest transfers touching `account_id`
    #[instrument(skip(self))]
    pub async fn get_transfers_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TransferInfo>, AppError> {
        self.repository
            .get_transfer_infos(account_id, TRANSFER_LIST_LIMIT)
            .await
    }

    /// Accounts in `updated_at` ascending order
    #[instrument(skip(self))]
    pub async fn get_accounts(&self) -> Result<Vec<Account>, AppError> {
        self.repository.get_accounts(ACCOUNT_LIST_LIMIT).await
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let database = match self.repository.health_check().await {
            Ok(()) => HealthStatus::Healthy,
            Err(_) => HealthStatus::Unhealthy,
        };
        HealthResponse::new(database)
    }
}

/// Double-entry mutation for one internal transfer
struct InternalTransferMutation {
    transfer_id: Uuid,
    amount: Decimal,
    currency_code: String,
}

#[async_trait]
impl InnerTransferCallback for InternalTransferMutation {
    async fn apply(
        &self,
        sender: &Account,
        receiver: &Account,
        actions: &mut dyn InnerTransferActions,
    ) -> Result<(), AppError> {
        if sender.currency_code != self.currency_code {
            return Err(TransferError::SenderWrongCurrency.into());
        }
        if receiver.currency_code != self.currency_code {
            return Err(TransferError::ReceiverWrongCurrency.into());
        }
        if sender.balance < self.amount {
            return Err(TransferError::InsufficientFunds.into());
        }

        let sender_balance = sender
            .balance
            .checked_sub(self.amount)
            .ok_or_else(|| AppError::Internal("sender balance overflow".to_string()))?;
        let receiver_balance = receiver
            .balance
            .checked_add(self.amount)
            .ok_or_else(|| AppError::Internal("receiver balance overflow".to_string()))?;

        actions
            .create_transfer(&Transfer {
                id: self.transfer_id,
                transfer_type: TransferType::Internal,
                amount: self.amount,
                currency_code: self.currency_code.clone(),
                created_at: Utc::now(),
            })
            .await?;

        actions.update_balance(sender.id, sender_balance).await?;
        actions.update_balance(receiver.id, receiver_balance).await?;

        actions
            .create_transfer_part(&TransferPart {
                transfer_id: self.transfer_id,
                account_id: sender.id,
                corresponding_account_id: Some(receiver.id),
                direction: Direction::Outgoing,
            })
            .await?;
        actions
            .create_transfer_part(&TransferPart {
                transfer_id: self.transfer_id,
                account_id: receiver.id,
                corresponding_account_id: Some(sender.id),
                direction: Direction::Incoming,
            })
            .await?;

        Ok(())
    }
}
