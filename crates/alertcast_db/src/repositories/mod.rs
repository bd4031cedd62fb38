//! Registration store implementations

pub mod registration_factory;
pub mod registration_memory;
pub mod registration_sql;

pub use registration_factory::RegistrationStoreFactory;
pub use registration_memory::InMemoryRegistrationStore;
pub use registration_sql::SqlRegistrationStore;
