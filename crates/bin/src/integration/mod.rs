//! Glue between the CLI and the pipeline crates.
//!
//! Store location defaults and a log writer that cooperates with the
//! progress bar.

pub(crate) mod progress;
pub(crate) mod store_manager;
