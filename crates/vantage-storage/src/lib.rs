//! Vantage Storage Layer
//!
//! SQLite-backed key-value persistence for the authentication session.
//! The token and serialized user record survive restarts, and removal of
//! either key by another context is observable through the change bus.

mod auth_store;
mod database;
mod error;
mod migrations;

pub use auth_store::{
    AuthStore, ChangeBus, ChangeKind, StoreChange, Watcher, TOKEN_KEY, USER_KEY,
};
pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
