//! # CLI Module
//!
//! Command-line entry points of the `anima` binary. Each command loads what
//! it needs from the environment, reports progress with the crate's colored
//! output macros and terminates the process on fatal errors.
//!
//! ## Commands
//!
//! - [`serve`] - Runs the HTTP API until a shutdown signal arrives
//! - [`migrate`] - Applies pending database migrations
//! - [`check_db`] - Verifies database connectivity
//!
//! ## Usage Patterns
//!
//! ```bash
//! anima migrate     # prepare the schema
//! anima check-db    # confirm credentials and network access
//! anima serve       # start the API (also the default without a command)
//! ```
//!
//! The server itself logs through `tracing`; the macros here are only used
//! for the short human-facing status lines of the CLI.

mod database;
mod serve;

pub use database::check_db;
pub use database::migrate;
pub use serve::serve;
