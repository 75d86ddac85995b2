//! Core utilities for varsign
//!
//! This crate provides functionality shared by the resolver and the CLI:
//!
//! - **Error handling**: Structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML build descriptor with defaults for every section
//!
//! # Example
//!
//! ```rust,no_run
//! use varsign_core::config::Config;
//!
//! let config = Config::load(None, std::path::Path::new(".")).expect("descriptor");
//! println!("building {}", config.schema.app.application_id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{Error, ErrorCode, Result, ResultExt};
