//! Telemetry initialization
//!
//! Structured logging through `tracing`. The filter comes from `RUST_LOG`; the output
//! format from `LOG_FORMAT` (`pretty` or `json`).

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat};
