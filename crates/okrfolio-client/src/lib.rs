//! Client core for okrfolio: a typed HTTP client, a workspace that mirrors
//! the caller's portfolio and re-fetches it after every mutation, a local
//! session file for optimistic start-up, and the display-layer orderings.
//!
//! The server stays the source of truth. Nothing here writes entity state
//! locally except the cached snapshot of the last successful fetch.

pub mod client;
pub mod error;
pub mod session;
pub mod views;
pub mod workspace;


pub use client::{ApiClient, HealthStatus, PortfolioBackend};
pub use error::{ClientError, Result};
pub use session::Session;
pub use workspace::{Snapshot, Workspace};
