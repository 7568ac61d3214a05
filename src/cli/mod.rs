//! # CLI Module
//!
//! Command-line tooling around persisted route tables.
//!
//! ## Commands
//!
//! ### `build`
//!
//! Compile a route manifest and write the table to the route cache, so a
//! production dispatcher starts without compiling controller metadata:
//!
//! ```bash
//! restserver build --manifest routes.yaml --cache-dir /var/cache/restserver
//! ```
//!
//! ### `routes`
//!
//! List the routes of a cached table:
//!
//! ```bash
//! restserver routes --cache-dir /var/cache/restserver
//! ```
//!
//! ### `match`
//!
//! Show the handler, path parameters and bound arguments a request would
//! get. An unmatched `OPTIONS` request prints the preflight verb list:
//!
//! ```bash
//! restserver match --cache-dir /var/cache/restserver GET /api/users/42
//! ```
//!
//! `--cache-dir` can also come from `RESTSRV_CACHE_DIR`, the log level from
//! `--log-level` or `RESTSRV_LOG_LEVEL`.

mod commands;


pub use commands::{run_cli, run_command, Cli, Commands};
