//! Survey CLI - simulation helpers for driving a mission end-to-end.

pub mod sim;

pub use sim::{square_ring, RingPath};
