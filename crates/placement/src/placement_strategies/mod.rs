//! Implementations of placement backends.

pub mod common;
pub mod dp;
pub mod exhaustive;
