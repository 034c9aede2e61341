use super::{BuildStrategy, DIVIDER, Session};
use crate::config::{StrategyKind, ToolchainConfig};
use crate::error::Result;
use crate::exec::CommandBuilder;
use crate::log::LogSink;
use crate::projects::Project;
use async_trait::async_trait;
use std::path::PathBuf;

/// Delegates to an installed toolchain (`npm install && npm run build`,
/// `npm run dev` by default)
#[derive(Debug, Clone)]
pub struct ToolchainStrategy {
    out_dir: String,
    commands: ToolchainConfig,
}

impl ToolchainStrategy {
    pub fn new(out_dir: impl Into<String>, commands: ToolchainConfig) -> Self {
        Self {
            out_dir: out_dir.into(),
            commands,
        }
    }

    /// Run one step to completion. Spawn failures and non-zero exits are
    /// logged and reported as `false`.
    async fn step(&self, argv: &[String], project: &Project, log: &LogSink) -> bool {
        let command = match CommandBuilder::from_argv(argv) {
            Ok(command) => command.working_dir(project.root()),
            Err(e) => {
                log.line(format!("Error: {}", e));
                return false;
            }
        };

        log.line(format!("$ {}", command.display()));
        match command.stream(log).await {
            Ok(0) => true,
            Ok(code) => {
                log.line(format!("`{}` exited with code {}", command.display(), code));
                false
            }
            Err(e) => {
                log.line(format!("Error: {}", e));
                false
            }
        }
    }
}

#[async_trait]
impl BuildStrategy for ToolchainStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Toolchain
    }

    fn output_dir(&self, project: &Project) -> PathBuf {
        project.output_dir(&self.out_dir)
    }

    async fn build(&self, project: &Project, log: &LogSink) -> bool {
        log.line("Starting build process...");
        log.line(DIVIDER);

        if !self.step(&self.commands.install, project, log).await {
            log.line("Dependency install failed, skipping build");
            return false;
        }
        if !self.step(&self.commands.build, project, log).await {
            log.line("Build failed");
            return false;
        }

        log.line(DIVIDER);
        log.line("Build completed successfully!");
        true
    }

    async fn serve(&self, project: &Project, log: &LogSink) -> Result<Session> {
        let command = CommandBuilder::from_argv(&self.commands.dev)?.working_dir(project.root());

        log.line("Starting dev server...");
        log.line(format!("$ {}", command.display()));
        let handle = command.spawn_streaming(log.clone())?;

        if let Some(pid) = handle.id() {
            tracing::info!("dev server `{}` running as pid {}", handle.label(), pid);
        }
        log.line("Server running!");
        Ok(Session::Process(handle))
    }
}
