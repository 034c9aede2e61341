//! Build/run orchestration.
//!
//! An [`Orchestrator`] owns at most one live [`Session`] and publishes its
//! [`BuildStatus`] through a watch channel. Transitions:
//!
//! ```text
//! Idle ──build──▶ Building ──▶ Success | Error
//! Idle | Success | Error ──run──▶ Running ──stop──▶ Idle
//!                                   ├── start failure ──▶ Error
//!                                   └── session exits ──▶ Error
//! ```
//!
//! `run` is refused while Building. A session that dies on its own is
//! noticed the next time `build` or `is_running` looks at it.
//!
//! Nothing locks the output directory. A build started while a session is
//! serving the same directory would rewrite files under it; `build` refuses
//! to start while Running, but a caller that stops, builds and runs from
//! different tasks can still observe partially written output.

use crate::error::{BentoError, Result};
use crate::fs::FileNode;
use crate::log::LogSink;
use crate::projects::Project;
use crate::state::{self, BuildOutcome, BuildRecord, BuildStatus};
use crate::strategy::{BuildStrategy, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};

/// Run blocking filesystem work off the async executor
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BentoError::process(format!("Background task failed: {}", e)))?
}

pub struct Orchestrator {
    strategy: Arc<dyn BuildStrategy>,
    status: watch::Sender<BuildStatus>,
    log: LogSink,
    session: Mutex<Option<Session>>,
}

impl Orchestrator {
    pub fn new(strategy: Arc<dyn BuildStrategy>) -> Self {
        Self::with_log(strategy, LogSink::new())
    }

    /// Share an existing log, e.g. with a [`crate::workspace::Workspace`]
    pub fn with_log(strategy: Arc<dyn BuildStrategy>, log: LogSink) -> Self {
        let (status, _) = watch::channel(BuildStatus::Idle);
        Self {
            strategy,
            status,
            log,
            session: Mutex::new(None),
        }
    }

    pub fn strategy(&self) -> &Arc<dyn BuildStrategy> {
        &self.strategy
    }

    pub fn status(&self) -> BuildStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<BuildStatus> {
        self.status.subscribe()
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn log_text(&self) -> String {
        self.log.text()
    }

    pub fn subscribe_log(&self) -> broadcast::Receiver<String> {
        self.log.subscribe()
    }

    pub fn clear_log(&self) {
        self.log.clear();
    }

    /// Build `project` with the active strategy. Returns `false` without
    /// touching the status when a build or session is already in progress.
    pub async fn build(&self, project: &Project) -> bool {
        if self.status.borrow().is_running() {
            self.reap_exited_session().await;
        }

        let mut refused = None;
        self.status.send_if_modified(|status| {
            if status.is_busy() {
                refused = Some(status.clone());
                false
            } else {
                *status = BuildStatus::Building;
                true
            }
        });
        if let Some(current) = refused {
            self.log.line(format!("Build rejected: project is {}", current));
            return false;
        }

        tracing::info!("building '{}' with {} strategy", project.name, self.strategy.kind());

        let success = if project.exists() {
            let strategy = Arc::clone(&self.strategy);
            let project_for_task = project.clone();
            let log = self.log.clone();
            match tokio::spawn(async move { strategy.build(&project_for_task, &log).await }).await {
                Ok(success) => success,
                Err(e) => {
                    self.log.line(format!("Error: build task failed: {}", e));
                    false
                }
            }
        } else {
            self.log.line(format!(
                "Error: project directory not found: {}",
                project.root().display()
            ));
            false
        };

        let (status, outcome) = if success {
            (
                BuildStatus::Success("Build completed successfully".to_string()),
                BuildOutcome::Success,
            )
        } else {
            (BuildStatus::Error("Build failed".to_string()), BuildOutcome::Failed)
        };

        if project.exists() {
            self.persist_record(project, outcome, &status).await;
        }
        self.status.send_if_modified(|current| {
            if current.is_building() {
                *current = status;
                true
            } else {
                false
            }
        });
        success
    }

    async fn persist_record(&self, project: &Project, outcome: BuildOutcome, status: &BuildStatus) {
        let record = BuildRecord::now(
            outcome,
            self.strategy.kind(),
            status.message().unwrap_or_default(),
        );
        let root = project.root().to_path_buf();
        if let Err(e) = run_blocking(move || state::save_build_record(&root, &record)).await {
            tracing::warn!("failed to persist build record for '{}': {}", project.name, e);
        }
    }

    /// Serve the last build of `project`. Any previous session is stopped
    /// first. Refused while a build is in progress. Returns whether the
    /// orchestrator is now Running.
    pub async fn run(&self, project: &Project) -> bool {
        if self.status.borrow().is_building() {
            self.log.line("Run rejected: a build is in progress");
            return false;
        }

        let mut session = self.session.lock().await;
        if let Some(mut previous) = session.take() {
            self.stop_session(&mut previous).await;
            self.status.send_if_modified(|status| {
                if status.is_running() {
                    *status = BuildStatus::Idle;
                    true
                } else {
                    false
                }
            });
        }

        let out_dir = self.strategy.output_dir(project);
        let has_build = {
            let out_dir = out_dir.clone();
            run_blocking(move || Ok(crate::fs::is_non_empty_dir(&out_dir)))
                .await
                .unwrap_or(false)
        };
        if !has_build {
            tracing::debug!("no build output in {}", out_dir.display());
            self.log.line("No build found. Please run Build first.");
            return false;
        }

        match self.strategy.serve(project, &self.log).await {
            Ok(mut started) => {
                let mut building = false;
                self.status.send_if_modified(|status| {
                    if status.is_building() {
                        building = true;
                        false
                    } else {
                        *status = BuildStatus::Running;
                        true
                    }
                });
                if building {
                    // A build started while the session was coming up
                    self.stop_session(&mut started).await;
                    self.log.line("Run rejected: a build is in progress");
                    return false;
                }
                *session = Some(started);
                true
            }
            Err(e) => {
                self.log.line(format!("Error starting server: {}", e));
                self.status.send_if_modified(|status| {
                    if status.is_building() {
                        false
                    } else {
                        *status = BuildStatus::Error(e.to_string());
                        true
                    }
                });
                false
            }
        }
    }

    /// Tear down the active session, if any, and return to Idle. An
    /// in-flight build keeps its Building status.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        if let Some(mut active) = session.take() {
            self.stop_session(&mut active).await;
            self.log.line("Server stopped");
        }
        self.status.send_if_modified(|status| {
            if matches!(status, BuildStatus::Building | BuildStatus::Idle) {
                false
            } else {
                *status = BuildStatus::Idle;
                true
            }
        });
    }

    async fn stop_session(&self, session: &mut Session) {
        if let Err(e) = session.stop().await {
            tracing::warn!("failed to stop session: {}", e);
            self.log.line(format!("Error stopping server: {}", e));
        }
    }

    /// Whether a session is live. A dev-server process that exited on its
    /// own counts as stopped and moves the status to Error.
    pub async fn is_running(&self) -> bool {
        self.reap_exited_session().await;
        self.session.lock().await.is_some()
    }

    /// Drop a session that is no longer serving. Running becomes Error.
    async fn reap_exited_session(&self) {
        let mut session = self.session.lock().await;
        let exited = session.as_mut().is_some_and(|s| !s.is_running());
        if !exited {
            return;
        }
        if let Some(mut dead) = session.take() {
            self.stop_session(&mut dead).await;
        }

        tracing::warn!("session exited on its own");
        self.log.line("Error: dev server exited");
        self.status.send_if_modified(|status| {
            if status.is_running() {
                *status = BuildStatus::Error("dev server exited".to_string());
                true
            } else {
                false
            }
        });
    }

    /// Bound address of the built-in static server while it runs
    pub async fn server_addr(&self) -> Option<SocketAddr> {
        let session = self.session.lock().await;
        session.as_ref().and_then(|s| s.local_addr())
    }

    /// Current file tree of `project`; empty if the root is missing
    pub async fn file_tree(&self, project: &Project) -> Vec<FileNode> {
        let root = project.root().to_path_buf();
        match run_blocking(move || crate::fs::file_tree(&root)).await {
            Ok(tree) => tree,
            Err(e) => {
                tracing::debug!("no file tree for '{}': {}", project.name, e);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("strategy", &self.strategy.kind())
            .field("status", &*self.status.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::strategy::BuiltinStrategy;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn builtin() -> Arc<dyn BuildStrategy> {
        Arc::new(BuiltinStrategy::new("dist", "127.0.0.1:0".parse().unwrap()))
    }

    fn project_with_sources() -> (TempDir, Project) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(
            temp.path().join("src/App.tsx"),
            "function App(): Element { return null; }\n",
        )
        .unwrap();
        let project = Project::from_dir(temp.path());
        (temp, project)
    }

    /// Strategy whose build blocks until released
    struct GatedStrategy {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl BuildStrategy for GatedStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Builtin
        }

        fn output_dir(&self, project: &Project) -> PathBuf {
            project.output_dir("dist")
        }

        async fn build(&self, _project: &Project, _log: &LogSink) -> bool {
            self.entered.notify_one();
            self.release.notified().await;
            true
        }

        async fn serve(&self, _project: &Project, _log: &LogSink) -> Result<Session> {
            Err(BentoError::Server("not supported".to_string()))
        }
    }

    #[tokio::test]
    async fn test_build_success_persists_record() {
        let (temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());

        assert!(orchestrator.build(&project).await);
        assert!(matches!(orchestrator.status(), BuildStatus::Success(_)));

        let record = state::load_build_record(temp.path()).unwrap();
        assert_eq!(record.outcome, BuildOutcome::Success);
        assert_eq!(record.strategy, StrategyKind::Builtin);
    }

    #[tokio::test]
    async fn test_build_failure_sets_error() {
        let temp = TempDir::new().unwrap();
        let project = Project::from_dir(temp.path());
        let orchestrator = Orchestrator::new(builtin());

        assert!(!orchestrator.build(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Error("Build failed".to_string()));
        assert_eq!(
            state::load_build_record(temp.path()).unwrap().outcome,
            BuildOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_missing_project_directory_is_error() {
        let project = Project::new("ghost", "/definitely/not/here/bento");
        let orchestrator = Orchestrator::new(builtin());
        assert!(!orchestrator.build(&project).await);
        assert!(matches!(orchestrator.status(), BuildStatus::Error(_)));
        assert!(orchestrator.log_text().contains("project directory not found"));
    }

    #[tokio::test]
    async fn test_build_while_building_is_rejected() {
        let (_temp, project) = project_with_sources();
        let gated = Arc::new(GatedStrategy {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Arc::new(Orchestrator::new(gated.clone()));

        let first = {
            let orchestrator = Arc::clone(&orchestrator);
            let project = project.clone();
            tokio::spawn(async move { orchestrator.build(&project).await })
        };
        gated.entered.notified().await;
        assert_eq!(orchestrator.status(), BuildStatus::Building);

        assert!(!orchestrator.build(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Building);
        assert!(orchestrator.log_text().contains("Build rejected"));

        gated.release.notify_one();
        assert!(first.await.unwrap());
        assert!(matches!(orchestrator.status(), BuildStatus::Success(_)));
    }

    #[tokio::test]
    async fn test_run_while_building_is_rejected() {
        let (temp, project) = project_with_sources();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.html"), "x").unwrap();
        let gated = Arc::new(GatedStrategy {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Arc::new(Orchestrator::new(gated.clone()));

        let build = {
            let orchestrator = Arc::clone(&orchestrator);
            let project = project.clone();
            tokio::spawn(async move { orchestrator.build(&project).await })
        };
        gated.entered.notified().await;

        assert!(!orchestrator.run(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Building);
        assert!(!orchestrator.is_running().await);
        assert!(orchestrator.log_text().contains("Run rejected: a build is in progress"));

        gated.release.notify_one();
        assert!(build.await.unwrap());
        assert!(matches!(orchestrator.status(), BuildStatus::Success(_)));
        assert!(!orchestrator.is_running().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exited_dev_server_ends_in_error() {
        use crate::config::ToolchainConfig;
        use crate::strategy::ToolchainStrategy;

        let (temp, project) = project_with_sources();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.html"), "x").unwrap();

        let sh = |script: &str| vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let strategy = ToolchainStrategy::new(
            "dist",
            ToolchainConfig {
                install: sh("true"),
                build: sh("true"),
                dev: sh("echo boom; exit 1"),
            },
        );
        let orchestrator = Orchestrator::new(Arc::new(strategy));

        assert!(orchestrator.run(&project).await);
        let exited = tokio::time::timeout(Duration::from_secs(5), async {
            while orchestrator.is_running().await {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(exited.is_ok());
        assert_eq!(
            orchestrator.status(),
            BuildStatus::Error("dev server exited".to_string())
        );

        assert!(orchestrator.build(&project).await);
        assert!(matches!(orchestrator.status(), BuildStatus::Success(_)));
        assert!(!orchestrator.log_text().contains("Build rejected"));
    }

    #[tokio::test]
    async fn test_run_without_build_keeps_status() {
        let (_temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());

        assert!(!orchestrator.run(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Idle);
        assert!(!orchestrator.is_running().await);
        assert!(orchestrator
            .log_text()
            .contains("No build found. Please run Build first."));
    }

    #[tokio::test]
    async fn test_run_stop_cycle() {
        let (_temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());
        let mut status = orchestrator.subscribe_status();

        assert!(orchestrator.build(&project).await);
        assert!(orchestrator.run(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Running);
        assert!(orchestrator.is_running().await);
        assert!(status.has_changed().unwrap());
        status.mark_unchanged();

        // Refused while serving
        assert!(!orchestrator.build(&project).await);

        let addr = orchestrator.server_addr().await.unwrap();
        orchestrator.stop().await;
        assert_eq!(orchestrator.status(), BuildStatus::Idle);
        assert!(!orchestrator.is_running().await);
        assert!(orchestrator.server_addr().await.is_none());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());

        // Idempotent
        orchestrator.stop().await;
        assert_eq!(orchestrator.status(), BuildStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_replaces_previous_session() {
        let (_temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());
        assert!(orchestrator.build(&project).await);

        assert!(orchestrator.run(&project).await);
        assert!(orchestrator.run(&project).await);
        assert_eq!(orchestrator.status(), BuildStatus::Running);
        assert!(orchestrator.is_running().await);
        assert_eq!(orchestrator.log_text().matches("Server running!").count(), 2);

        let addr = orchestrator.server_addr().await.unwrap();
        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());
        orchestrator.stop().await;
    }

    #[tokio::test]
    async fn test_serve_failure_sets_error() {
        let (temp, project) = project_with_sources();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.html"), "x").unwrap();

        let gated = Arc::new(GatedStrategy {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let orchestrator = Orchestrator::new(gated);
        assert!(!orchestrator.run(&project).await);
        assert!(matches!(orchestrator.status(), BuildStatus::Error(_)));
        assert!(orchestrator.log_text().contains("Error starting server"));
    }

    #[tokio::test]
    async fn test_log_streams_and_clears() {
        let (_temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());
        let mut live = orchestrator.subscribe_log();

        orchestrator.build(&project).await;
        let first = tokio::time::timeout(Duration::from_secs(5), live.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, "Starting build process...");

        assert!(!orchestrator.log_text().is_empty());
        orchestrator.clear_log();
        assert!(orchestrator.log_text().is_empty());
    }

    #[tokio::test]
    async fn test_file_tree_skips_output() {
        let (temp, project) = project_with_sources();
        let orchestrator = Orchestrator::new(builtin());
        orchestrator.build(&project).await;

        let tree = orchestrator.file_tree(&project).await;
        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["src"]);
        assert!(temp.path().join(".bento").is_dir());

        let missing = Project::new("gone", "/definitely/not/here/bento");
        assert!(orchestrator.file_tree(&missing).await.is_empty());
    }
}
