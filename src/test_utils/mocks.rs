//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::{
    Account, AppError, CurrencyLookup, DatabaseError, InnerTransferActions, InnerTransferCallback,
    LedgerRepository, Transfer, TransferInfo, TransferPart,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    currencies: HashMap<String, u32>,
    accounts: HashMap<Uuid, Account>,
    transfers: HashMap<Uuid, Transfer>,
    parts: Vec<TransferPart>,
}

/// In-memory ledger with per-account locks and all-or-nothing commits
pub struct MockLedgerRepository {
    state: Arc<Mutex<LedgerState>>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    config: MockConfig,
    is_healthy: AtomicBool,
    callbacks_invoked: AtomicUsize,
}

impl MockLedgerRepository {
    /// Ledger with USD (2), EUR (2) and BTC (8) registered
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        let mut state = LedgerState::default();
        for (code, precision) in [("USD", 2), ("EUR", 2), ("BTC", 8)] {
            state.currencies.insert(code.to_string(), precision);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
            locks: Mutex::new(HashMap::new()),
            config,
            is_healthy: AtomicBool::new(true),
            callbacks_invoked: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.is_healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn add_currency(&self, code: &str, precision: u32) {
        self.state
            .lock()
            .unwrap()
            .currencies
            .insert(code.to_string(), precision);
    }

    /// Open an account with a starting balance and return its id
    pub fn add_account(&self, currency_code: &str, balance: Decimal) -> Uuid {
        let account = Account::new(Uuid::new_v4(), currency_code, balance);
        let id = account.id;
        self.insert_account(account);
        id
    }

    pub fn insert_account(&self, account: Account) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(account.id, account);
    }

    pub fn account(&self, id: Uuid) -> Option<Account> {
        self.state.lock().unwrap().accounts.get(&id).cloned()
    }

    pub fn balance(&self, id: Uuid) -> Option<Decimal> {
        self.account(id).map(|a| a.balance)
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.state
            .lock()
            .unwrap()
            .transfers
            .values()
            .cloned()
            .collect()
    }

    pub fn transfer_parts(&self) -> Vec<TransferPart> {
        self.state.lock().unwrap().parts.clone()
    }

    /// Number of times a transfer callback ran under lock
    pub fn callback_count(&self) -> usize {
        self.callbacks_invoked.load(Ordering::SeqCst)
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Database(DatabaseError::Query(msg)));
        }
        Ok(())
    }

    fn lock_for(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

impl Default for MockLedgerRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutations staged by a callback; applied only on commit
struct MockTransferActions {
    state: Arc<Mutex<LedgerState>>,
    transfers: Vec<Transfer>,
    balances: Vec<(Uuid, Decimal)>,
    parts: Vec<TransferPart>,
}

impl MockTransferActions {
    fn commit(self) {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        for transfer in self.transfers {
            state.transfers.insert(transfer.id, transfer);
        }
        for (id, balance) in self.balances {
            if let Some(account) = state.accounts.get_mut(&id) {
                account.balance = balance;
                account.updated_at = now;
            }
        }
        state.parts.extend(self.parts);
    }
}

#[async_trait]
impl InnerTransferActions for MockTransferActions {
    async fn create_transfer(&mut self, transfer: &Transfer) -> Result<(), AppError> {
        let committed = self.state.lock().unwrap().transfers.contains_key(&transfer.id);
        if committed || self.transfers.iter().any(|t| t.id == transfer.id) {
            return Err(AppError::Database(DatabaseError::TransferIdUsed));
        }
        self.transfers.push(transfer.clone());
        Ok(())
    }

    async fn update_balance(
        &mut self,
        account_id: Uuid,
        balance: Decimal,
    ) -> Result<(), AppError> {
        if !self.state.lock().unwrap().accounts.contains_key(&account_id) {
            return Err(AppError::Database(DatabaseError::NoRowsAffected));
        }
        if balance.is_sign_negative() && !balance.is_zero() {
            return Err(AppError::Database(DatabaseError::Query(
                "balance check constraint violated".to_string(),
            )));
        }
        self.balances.push((account_id, balance));
        Ok(())
    }

    async fn create_transfer_part(&mut self, part: &TransferPart) -> Result<(), AppError> {
        let transfer_known = self.transfers.iter().any(|t| t.id == part.transfer_id)
            || self
                .state
                .lock()
                .unwrap()
                .transfers
                .contains_key(&part.transfer_id);
        if !transfer_known {
            return Err(AppError::Database(DatabaseError::Query(
                "transfer_parts foreign key violated".to_string(),
            )));
        }
        self.parts.push(part.clone());
        Ok(())
    }
}

#[async_trait]
impl CurrencyLookup for MockLedgerRepository {
    async fn get_precision(&self, currency_code: &str) -> Result<Option<u32>, AppError> {
        self.check_should_fail()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .currencies
            .get(currency_code)
            .copied())
    }
}

#[async_trait]
impl LedgerRepository for MockLedgerRepository {
    async fn health_check(&self) -> Result<(), AppError> {
        if !self.is_healthy.load(Ordering::Relaxed) {
            return Err(AppError::Database(DatabaseError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        self.check_should_fail()
    }

    async fn get_accounts(&self, limit: i64) -> Result<Vec<Account>, AppError> {
        self.check_should_fail()?;
        let state = self.state.lock().unwrap();
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(accounts.into_iter().take(limit.max(0) as usize).collect())
    }

    async fn get_transfer_infos(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransferInfo>, AppError> {
        self.check_should_fail()?;
        let state = self.state.lock().unwrap();
        let mut infos: Vec<TransferInfo> = state
            .parts
            .iter()
            .filter(|p| p.account_id == account_id)
            .filter_map(|p| {
                state.transfers.get(&p.transfer_id).map(|t| TransferInfo {
                    id: t.id,
                    account_id: p.account_id,
                    corresponding_account_id: p.corresponding_account_id,
                    transfer_type: t.transfer_type,
                    direction: p.direction,
                    amount: t.amount,
                    currency_code: t.currency_code.clone(),
                    created_at: t.created_at,
                })
            })
            .collect();
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos.into_iter().take(limit.max(0) as usize).collect())
    }

    async fn create_inner_transfer_with_lock(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        callback: &dyn InnerTransferCallback,
    ) -> Result<(), AppError> {
        self.check_should_fail()?;

        let mut ids = vec![sender_id, receiver_id];
        ids.sort();
        ids.dedup();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock_for(id).lock_owned().await);
        }

        let (sender, receiver) = {
            let state = self.state.lock().unwrap();
            (
                state.accounts.get(&sender_id).cloned(),
                state.accounts.get(&receiver_id).cloned(),
            )
        };
        let sender = sender.ok_or(DatabaseError::EntityNotFound(sender_id))?;
        let receiver = receiver.ok_or(DatabaseError::EntityNotFound(receiver_id))?;

        self.callbacks_invoked.fetch_add(1, Ordering::SeqCst);
        let mut actions = MockTransferActions {
            state: Arc::clone(&self.state),
            transfers: Vec::new(),
            balances: Vec::new(),
            parts: Vec::new(),
        };
        callback.apply(&sender, &receiver, &mut actions).await?;
        actions.commit();
        drop(guards);
        Ok(())
    }
}
