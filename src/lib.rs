pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod log;
pub mod logger;
pub mod orchestrator;
pub mod path;
pub mod projects;
pub mod server;
pub mod state;
pub mod strategy;
pub mod workspace;

// Re-export commonly used types
pub use config::{Config, GlobalConfig, StrategyKind};
pub use error::{BentoError, Result};
pub use log::LogSink;
pub use orchestrator::Orchestrator;
pub use projects::{Project, ProjectRegistry};
pub use state::BuildStatus;
pub use strategy::{BuildStrategy, Session};
