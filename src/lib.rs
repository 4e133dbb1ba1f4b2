//! pairsync - two-way item synchronization between storage pairs.
//!
//! This crate contains the status-persistence and storage-configuration
//! core of the tool:
//!
//! - [`cli`] - Command-line interface using clap, plus the error reporting
//!   boundary
//! - [`config`] - Configuration file loading (storages, pairs, status path)
//! - [`status`] - Durable per-(pair, collection) sync status: flat JSON
//!   documents and the incremental SQLite store
//! - [`storage`] - Storage abstraction: registry, factory, recovery flow
//!   and the built-in backends
//! - [`ui`] - Injected interaction ports (yes/no confirmation)
//! - [`error`] - The closed error taxonomy

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod status;
pub mod storage;
pub mod ui;

pub use error::{Error, Result};
