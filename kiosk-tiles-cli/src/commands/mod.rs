//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod download;
pub mod fetch;
pub mod status;
