//! CLI command implementations
//!
//! `info` and `program` run against an open session; the listing commands
//! only read compiled-in tables.

pub mod info;
mod list;
pub mod program;

pub use list::{list_chips, list_programmers};
