pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod scheduler;

pub use error::{Result, SidecarError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
