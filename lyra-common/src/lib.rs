//! # Lyra Common Library
//!
//! Shared code for the Lyra services:
//! - Error type and result alias
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Database pool creation and schema initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
