//! # lfx-cli: Ledger Fixtures Command-Line Interface
//!
//! ## Subcommands
//!
//! - `scenario`: run catalogue scenarios against a fresh sandbox ledger
//!   and print a JSON report
//! - `config`: print the configuration resolved from the environment
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `lfx-fixtures`; no fixture logic lives here.
//! - Reports go to stdout, logs to stderr.

pub mod config;
pub mod scenario;
