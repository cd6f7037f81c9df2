//! Persistence for the okrfolio tracker.
//!
//! [`PortfolioStore`] keeps every entity in a single SeaORM database and
//! scopes each query by the owning account: an entity owned by someone else
//! is reported exactly like a missing one. Dashboard aggregation lives here
//! too because it is a set of read-only queries over the same tables.

pub mod entities;
pub mod error;
pub mod password;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{Result, StorageError};
pub use store::PortfolioStore;
