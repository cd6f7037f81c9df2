//! Shared domain model for okrfolio: entity views, canonical enums, request
//! schemas and the pure rules (progress, ranking, upcoming window) that the
//! storage, server and client crates all apply the same way.

pub mod id;
pub mod requests;
pub mod rules;
pub mod types;
