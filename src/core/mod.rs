//! Core types and constants for the device tracking engine

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::*;
