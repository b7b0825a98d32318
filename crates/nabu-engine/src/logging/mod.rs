//! Logging setup.
//!
//! Library code logs through the `log` facade only. Binaries and hosts call
//! [`init_logging`] once, early, to install `env_logger`.

mod init;

pub use init::{LoggingConfig, init_logging};
