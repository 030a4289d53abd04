//! Survey fleet coordination server: REST + live channel over shared state.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod hub;
pub mod ledger;
pub mod persistence;
pub mod scheduler;
pub mod state;
