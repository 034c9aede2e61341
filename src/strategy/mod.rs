//! Build strategies.
//!
//! The orchestrator drives a single [`BuildStrategy`] chosen from the
//! configuration: the built-in bundler plus static server, or an external
//! toolchain. Strategies report into a [`LogSink`] and never return build
//! errors to their caller; `build` collapses everything into a success flag.

mod builtin;
mod toolchain;

pub use builtin::BuiltinStrategy;
pub use toolchain::ToolchainStrategy;

use crate::config::{Config, StrategyKind};
use crate::error::Result;
use crate::exec::ProcessHandle;
use crate::log::LogSink;
use crate::projects::Project;
use crate::server::StaticServer;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Divider printed around build and run banners
pub(crate) const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[async_trait]
pub trait BuildStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Directory a successful build leaves its output in
    fn output_dir(&self, project: &Project) -> PathBuf;

    /// Build `project`, streaming progress into `log`
    async fn build(&self, project: &Project, log: &LogSink) -> bool;

    /// Start serving `project`. The returned session keeps running until it
    /// is stopped or dropped.
    async fn serve(&self, project: &Project, log: &LogSink) -> Result<Session>;
}

/// A live serving session
#[derive(Debug)]
pub enum Session {
    Server(StaticServer),
    Process(ProcessHandle),
}

impl Session {
    pub fn is_running(&mut self) -> bool {
        match self {
            Session::Server(server) => server.is_running(),
            Session::Process(handle) => handle.is_running(),
        }
    }

    /// Address of the static server, if this session is one
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            Session::Server(server) => server.local_addr(),
            Session::Process(_) => None,
        }
    }

    /// Tear the session down. Calling it twice is harmless.
    pub async fn stop(&mut self) -> Result<()> {
        match self {
            Session::Server(server) => {
                server.stop().await;
                Ok(())
            }
            Session::Process(handle) => handle.kill().await,
        }
    }
}

/// Strategy selected by `[build] strategy`
pub fn from_config(config: &Config) -> Result<Arc<dyn BuildStrategy>> {
    let out_dir = config.global.build.out_dir.clone();
    let strategy: Arc<dyn BuildStrategy> = match config.global.build.strategy {
        StrategyKind::Builtin => Arc::new(BuiltinStrategy::new(out_dir, config.server_addr()?)),
        StrategyKind::Toolchain => {
            Arc::new(ToolchainStrategy::new(out_dir, config.global.toolchain.clone()))
        }
    };
    tracing::debug!("using {} build strategy", strategy.kind());
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_follows_strategy_kind() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).unwrap().kind(), StrategyKind::Builtin);

        config.global.build.strategy = StrategyKind::Toolchain;
        config.global.build.out_dir = "build".to_string();
        let strategy = from_config(&config).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Toolchain);

        let project = Project::new("demo", "/tmp/demo");
        assert_eq!(strategy.output_dir(&project), PathBuf::from("/tmp/demo/build"));
    }

    #[test]
    fn test_bad_server_address_is_config_error() {
        let mut config = Config::default();
        config.global.server.host = "not an address".to_string();
        assert!(from_config(&config).is_err());
    }
}
