//! Shared plumbing for the SerpApi workspace crates.
//!
//! At the moment this is only the [`observability`] module, which owns the
//! process-wide `tracing` setup used by the CLI and by integration tests.
//!
//! ```rust
//! use serpapi_common::observability::{LogFormat, LogSettings};
//!
//! let settings = LogSettings {
//!     format: LogFormat::Json,
//!     ..LogSettings::default()
//! };
//! assert_eq!(settings.filter, "info");
//! assert!(!settings.stderr);
//! ```

pub mod observability;
