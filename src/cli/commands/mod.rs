//! Command implementations.

pub mod check;
pub mod status;
