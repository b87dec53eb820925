//! Runtime configuration and logger bootstrap for the payments core.

pub mod config;
pub mod logging;

pub use config::Config;
