//! Double-entry wallet ledger.
//!
//! Internal transfers move funds between two accounts of the same currency.
//! Each transfer runs in one database transaction that locks both accounts.
//! The caller-chosen transfer id makes replays harmless.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
