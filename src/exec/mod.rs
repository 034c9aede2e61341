//! Command execution for the external toolchain
//!
//! Commands are validated against a whitelist before anything is spawned.
//! Output from stdout and stderr is merged and delivered line by line as it
//! is produced: reader tasks push lines into a channel, and the consumer
//! forwards them to a [`LogSink`].

use crate::error::{BentoError, Result};
use crate::log::LogSink;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long `kill` waits for buffered output to reach the sink
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Binaries the toolchain adapter may launch
const ALLOWED_COMMANDS: &[&str] = &[
    "npm", "npx", "node",
    "bun", "bunx",
    "yarn", "pnpm",
    "deno",
    "sh", "bash",
];

/// A program plus argv and working directory. Never goes through a shell
/// unless the program itself is one.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Build from an argv array such as `["npm", "run", "build"]`
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| BentoError::validation("Command cannot be empty"))?;
        Ok(rest.iter().fold(Self::new(program.as_str()), |cmd, a| cmd.arg(a.as_str())))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human readable form for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn validate(&self) -> Result<()> {
        if ALLOWED_COMMANDS.contains(&self.program.as_str()) {
            return Ok(());
        }
        Err(BentoError::process(format!(
            "Command '{}' not in whitelist. Allowed: {:?}",
            self.program, ALLOWED_COMMANDS
        )))
    }

    fn spawn_child(&self) -> Result<Child> {
        self.validate()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        tracing::info!("spawning `{}`", self.display());
        cmd.spawn()
            .map_err(|e| BentoError::process(format!("Failed to execute `{}`: {}", self.display(), e)))
    }

    /// Run to completion, forwarding merged output to `sink` line by line.
    /// Returns the exit code (`-1` when terminated by a signal).
    pub async fn stream(&self, sink: &LogSink) -> Result<i32> {
        let mut child = self.spawn_child()?;
        let mut lines = attach_pumps(&mut child);

        while let Some(line) = lines.recv().await {
            sink.line(line);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BentoError::process(format!("Failed to wait for `{}`: {}", self.display(), e)))?;
        let code = status.code().unwrap_or(-1);
        tracing::info!("`{}` exited with {}", self.display(), code);
        Ok(code)
    }

    /// Spawn a long-running process whose output is forwarded to `sink` by a
    /// background task for as long as the process lives.
    pub fn spawn_streaming(&self, sink: LogSink) -> Result<ProcessHandle> {
        let mut child = self.spawn_child()?;
        let mut lines = attach_pumps(&mut child);

        let forwarder = tokio::spawn(async move {
            while let Some(line) = lines.recv().await {
                sink.line(line);
            }
        });

        Ok(ProcessHandle {
            label: self.display(),
            child,
            forwarder,
        })
    }
}

/// Start one reader task per output pipe; the receiver closes once both
/// pipes reach EOF.
fn attach_pumps(child: &mut Child) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        pump(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        pump(stderr, tx.clone());
    }
    rx
}

fn pump<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Handle to one spawned external process
///
/// Dropping the handle kills the process.
#[derive(Debug)]
pub struct ProcessHandle {
    label: String,
    child: Child,
    forwarder: JoinHandle<()>,
}

impl ProcessHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Force-terminate the process, then give the forwarder a moment to flush
    /// the last lines. Safe to call after it has exited.
    pub async fn kill(&mut self) -> Result<()> {
        if self.is_running() {
            tracing::info!("killing `{}`", self.label);
            if let Err(e) = self.child.kill().await {
                if e.kind() != std::io::ErrorKind::InvalidInput {
                    return Err(BentoError::process(format!(
                        "Failed to kill `{}`: {}",
                        self.label, e
                    )));
                }
            }
        }
        if !self.forwarder.is_finished() {
            let _ = tokio::time::timeout(DRAIN_TIMEOUT, &mut self.forwarder).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandBuilder {
        CommandBuilder::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_command_validation_allows_whitelisted() {
        let cmd = CommandBuilder::new("npm").arg("install");
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_command_validation_blocks_unlisted() {
        let cmd = CommandBuilder::new("rm").arg("-rf").arg("/");
        assert!(matches!(cmd.validate(), Err(BentoError::Process(_))));
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["npm".to_string(), "run".to_string(), "build".to_string()];
        let cmd = CommandBuilder::from_argv(&argv).unwrap().working_dir("/tmp");
        assert_eq!(cmd.display(), "npm run build");
        assert_eq!(cmd.cwd.as_deref(), Some(std::path::Path::new("/tmp")));

        assert!(CommandBuilder::from_argv(&[]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_merges_stdout_and_stderr() {
        let sink = LogSink::new();
        let code = sh("echo out; echo err 1>&2; exit 3")
            .stream(&sink)
            .await
            .unwrap();

        assert_eq!(code, 3);
        let text = sink.text();
        assert!(text.contains("out\n"));
        assert!(text.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_respects_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "").unwrap();
        let sink = LogSink::new();
        let code = sh("ls")
            .working_dir(temp.path())
            .stream(&sink)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert!(sink.text().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_rejected_command_never_spawns() {
        let sink = LogSink::new();
        let result = CommandBuilder::new("definitely-not-allowed").stream(&sink).await;
        assert!(matches!(result, Err(BentoError::Process(_))));
        assert!(sink.text().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_streaming_and_kill() {
        let sink = LogSink::new();
        let mut live = sink.subscribe();
        let mut handle = sh("echo ready; exec sleep 30")
            .spawn_streaming(sink.clone())
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), live.recv())
            .await
            .expect("no output from process")
            .unwrap();
        assert_eq!(first, "ready");
        assert!(handle.is_running());

        handle.kill().await.unwrap();
        assert!(!handle.is_running());

        // Second kill is a no-op
        handle.kill().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_after_exit_flushes_output() {
        let sink = LogSink::new();
        let mut handle = sh("echo first; echo last; exit 0")
            .spawn_streaming(sink.clone())
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        handle.kill().await.unwrap();
        assert!(sink.text().contains("first\nlast\n"));
    }
}
