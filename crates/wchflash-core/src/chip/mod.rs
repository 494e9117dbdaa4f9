//! Chip profiles
//!
//! This module provides the static profile of every supported chip and the
//! lookup used after identification.

mod database;
mod quirks;
mod types;

pub use database::*;
pub use quirks::Quirks;
pub use types::*;
