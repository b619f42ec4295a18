//! Application layer containing business logic and shared state.

pub mod service;
pub mod state;

pub use service::{ACCOUNT_LIST_LIMIT, TRANSFER_LIST_LIMIT, TransferService};
pub use state::AppState;
