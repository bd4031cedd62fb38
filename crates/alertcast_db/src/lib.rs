//! Registration store for alertcast
//!
//! Channel adapters that own external state (push device tokens) persist it
//! through the document-style [`RegistrationStore`] contract. Two backends are
//! provided: an SQL store over an `sqlx::Any` pool (SQLite by default,
//! PostgreSQL and MySQL through feature flags) and an in-memory store.
//!
//! # Example
//!
//! ```rust,no_run
//! use alertcast_config::AppConfig;
//! use alertcast_db::RegistrationStoreFactory;
//!
//! async fn setup_store() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let _store = RegistrationStoreFactory::new().from_app_config(&config).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;
pub mod repository;

pub use client::{DbBackend, DbClient};
pub use error::DbError;
pub use repository::{
    matches_filter, project, unique_key, Document, RegistrationStore, RepositoryFactory,
    UNIQUE_FIELD,
};

pub use repositories::{InMemoryRegistrationStore, RegistrationStoreFactory, SqlRegistrationStore};
