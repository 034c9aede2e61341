use super::{BuildStrategy, DIVIDER, Session};
use crate::bundler::Bundler;
use crate::config::StrategyKind;
use crate::error::Result;
use crate::log::LogSink;
use crate::projects::Project;
use crate::server::StaticServer;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Lexical bundler for `build`, local static server for `serve`
#[derive(Debug, Clone)]
pub struct BuiltinStrategy {
    out_dir: String,
    addr: SocketAddr,
}

impl BuiltinStrategy {
    pub fn new(out_dir: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            out_dir: out_dir.into(),
            addr,
        }
    }
}

#[async_trait]
impl BuildStrategy for BuiltinStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Builtin
    }

    fn output_dir(&self, project: &Project) -> PathBuf {
        project.output_dir(&self.out_dir)
    }

    async fn build(&self, project: &Project, log: &LogSink) -> bool {
        log.line("Starting build process...");
        log.line(DIVIDER);

        let out_dir = self.output_dir(project);
        if out_dir.exists() {
            log.line("Cleaning old build...");
        }
        log.line("Bundling JavaScript and CSS...");

        let bundler = Bundler::new(project.root(), &out_dir);
        let outcome = tokio::task::spawn_blocking(move || bundler.bundle()).await;

        match outcome {
            Ok(Ok(report)) => {
                log.line("Build completed successfully!");
                log.line(DIVIDER);
                if !report.wrote_stylesheet {
                    log.line("No stylesheets found, skipped bundle.css");
                }
                log.line(format!(
                    "Generated {} files in /{}",
                    report.files_written, self.out_dir
                ));
                log.line("Ready to run!");
                true
            }
            Ok(Err(e)) => {
                log.line(format!("Build failed: {}", e));
                log.line(DIVIDER);
                log.line("Please check your code for errors");
                false
            }
            Err(e) => {
                log.line(format!("Error: bundler task failed: {}", e));
                false
            }
        }
    }

    async fn serve(&self, project: &Project, log: &LogSink) -> Result<Session> {
        log.line("Starting local web server...");
        log.line(DIVIDER);

        let mut server = StaticServer::new(self.output_dir(project), self.addr);
        let addr = server.start().await?;

        log.line("Server running!");
        log.line(DIVIDER);
        log.line(format!("URL: http://{}", addr));
        log.line("Tip: edit code and rebuild to see changes");
        Ok(Session::Server(server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strategy() -> BuiltinStrategy {
        BuiltinStrategy::new("dist", "127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_build_writes_output_and_logs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(
            temp.path().join("src/App.tsx"),
            "function App() { return null; }\n",
        )
        .unwrap();

        let project = Project::from_dir(temp.path());
        let log = LogSink::new();
        assert!(strategy().build(&project, &log).await);

        let text = log.text();
        assert!(text.contains("Starting build process..."));
        assert!(text.contains("Build completed successfully!"));
        assert!(text.contains("Generated 2 files in /dist"));
        assert!(temp.path().join("dist/bundle.js").is_file());
    }

    #[tokio::test]
    async fn test_build_without_sources_fails() {
        let temp = TempDir::new().unwrap();
        let project = Project::from_dir(temp.path());
        let log = LogSink::new();

        assert!(!strategy().build(&project, &log).await);
        assert!(log.text().contains("Build failed"));
    }

    #[tokio::test]
    async fn test_serve_starts_static_server() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.html"), "<html></html>").unwrap();

        let project = Project::from_dir(temp.path());
        let log = LogSink::new();
        let mut session = strategy().serve(&project, &log).await.unwrap();

        assert!(session.is_running());
        let addr = session.local_addr().unwrap();
        assert!(log.text().contains(&format!("URL: http://{}", addr)));

        session.stop().await.unwrap();
        assert!(!session.is_running());
    }
}
