//! CLI library components for the client file processor.

pub mod config;
pub mod logging;
