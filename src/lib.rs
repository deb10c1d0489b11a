//! Audino - the data layer of an audio annotation platform
//!
//! This library provides:
//! - Database connection and schema migrations
//! - Models for projects, tasks, labels, jobs, annotations and task data
//! - Repositories enforcing the workflow and label-inheritance rules
//! - Request context and the permission gate
//! - A command-line driver over all of the above
//!
//! # Example
//!
//! ```no_run
//! use audino::cli::{report_error, run};
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         std::process::exit(report_error(&e));
//!     }
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod models;
pub mod repo;
