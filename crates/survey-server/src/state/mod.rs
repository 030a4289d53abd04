//! Coordination facade shared by the HTTP and WebSocket layers.

mod drones;
mod missions;
mod reports;
pub mod store;

pub use store::AppState;
