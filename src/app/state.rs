//! Application state management.

use std::sync::Arc;

use crate::domain::{CurrencyLookup, LedgerRepository};

use super::service::TransferService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TransferService>,
    pub repository: Arc<dyn LedgerRepository>,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(
        currencies: Arc<dyn CurrencyLookup>,
        repository: Arc<dyn LedgerRepository>,
    ) -> Self {
        let service = Arc::new(TransferService::new(currencies, Arc::clone(&repository)));
        Self {
            service,
            repository,
        }
    }
}
