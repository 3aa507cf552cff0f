//! Command handlers, one module per subcommand

pub mod cache;
pub mod config;
pub mod diff;
pub mod export;
pub mod init;
pub mod manifests;
pub mod plan;
pub mod snapshot;
pub mod sync;
pub mod watch;
