use crate::config::{Config, StrategyKind};
use crate::fs::FileNode;
use crate::orchestrator::Orchestrator;
use crate::projects::{Project, ProjectRegistry};
use crate::state::{self, BuildOutcome};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a React + TypeScript project in the workspace
    New {
        /// Project name
        name: String,
    },

    /// Register an existing project directory
    Import {
        /// Directory containing src/ or package.json
        path: String,
    },

    /// List registered projects
    List,

    /// Print a project's file tree
    Tree {
        /// Project name or directory
        project: String,
    },

    /// Print a project file
    Open {
        project: String,
        /// Path relative to the project root
        file: PathBuf,
    },

    /// Replace a project file with stdin
    Save {
        project: String,
        /// Path relative to the project root
        file: PathBuf,
    },

    /// Build a project
    Build {
        project: String,
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Serve the last build until Ctrl-C
    Run {
        project: String,
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Build, then serve if the build succeeded
    Preview {
        project: String,
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the last recorded build
    Status {
        project: String,
    },

    /// Print the effective configuration
    Config {
        /// Write it to ~/.config/bento/config.toml
        #[arg(long)]
        save: bool,
    },
}

/// Per-invocation configuration overrides
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Build strategy: builtin or toolchain
    #[arg(long)]
    pub strategy: Option<StrategyKind>,

    /// Port for the local static server
    #[arg(long)]
    pub port: Option<u16>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(strategy) = self.strategy {
            config.global.build.strategy = strategy;
        }
        if let Some(port) = self.port {
            config.global.server.port = port;
        }
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    let log_file = config.log_file();
    crate::logger::init_logger(
        cli.verbose,
        cli.quiet,
        &config.global.logging.level,
        log_file.as_deref(),
    )?;

    let registry = ProjectRegistry::new(config.registry_path());

    match cli.command {
        Commands::New { name } => {
            let workspace = config.workspace_dir();
            let project = registry
                .create(&workspace, &name)
                .with_context(|| format!("Failed to create project '{}'", name))?;

            println!("✓ Project created at: {}", project.path.display());
            println!("\nNext steps:");
            println!("  bento build \"{}\"", project.name);
            println!("  bento run \"{}\"", project.name);
            Ok(())
        }
        Commands::Import { path } => {
            let project = registry
                .import(&path)
                .with_context(|| format!("Failed to import {}", path))?;
            println!("✓ Imported '{}' from {}", project.name, project.path.display());
            Ok(())
        }
        Commands::List => {
            let projects = registry.list();
            if projects.is_empty() {
                println!("No projects registered.");
                println!("\nCreate one with `bento new <name>` or `bento import <path>`.");
            } else {
                println!(
                    "{} project{}:\n",
                    projects.len(),
                    if projects.len() == 1 { "" } else { "s" }
                );
                for project in &projects {
                    let marker = if project.exists() { "•" } else { "✗" };
                    println!("  {} {} at {}", marker, project.name, project.path.display());
                }
            }
            Ok(())
        }
        Commands::Tree { project } => {
            let project = resolve_project(&registry, &project)?;
            let tree = crate::fs::file_tree(project.root())?;
            println!("{}", project.name);
            print_tree(&tree, 1);
            Ok(())
        }
        Commands::Open { project, file } => {
            let workspace = open_workspace(&registry, &project).await?;
            let text = workspace.open_file(&file).await?;
            print!("{}", text);
            Ok(())
        }
        Commands::Save { project, file } => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;

            let workspace = open_workspace(&registry, &project).await?;
            workspace.open_file(&file).await?;
            workspace.save_file(text).await?;
            println!("✓ Saved {}", file.display());
            Ok(())
        }
        Commands::Build { project, overrides } => {
            overrides.apply(&mut config);
            let project = resolve_project(&registry, &project)?;
            let orchestrator = orchestrator(&config)?;

            if !with_live_log(&orchestrator, orchestrator.build(&project)).await {
                anyhow::bail!("Build of '{}' failed", project.name);
            }
            Ok(())
        }
        Commands::Run { project, overrides } => {
            overrides.apply(&mut config);
            let project = resolve_project(&registry, &project)?;
            let orchestrator = orchestrator(&config)?;
            serve_until_interrupted(&orchestrator, &project).await
        }
        Commands::Preview { project, overrides } => {
            overrides.apply(&mut config);
            let project = resolve_project(&registry, &project)?;
            let orchestrator = orchestrator(&config)?;

            if !with_live_log(&orchestrator, orchestrator.build(&project)).await {
                anyhow::bail!("Build of '{}' failed, not starting the server", project.name);
            }
            serve_until_interrupted(&orchestrator, &project).await
        }
        Commands::Status { project } => {
            let project = resolve_project(&registry, &project)?;
            match state::load_build_record(project.root()) {
                Some(record) => {
                    let when = chrono::DateTime::from_timestamp(record.timestamp, 0)
                        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| record.timestamp.to_string());
                    let outcome = match record.outcome {
                        BuildOutcome::Success => "✓ success",
                        BuildOutcome::Failed => "✗ failed",
                    };
                    println!("{}: {} ({} strategy) at {}", project.name, outcome, record.strategy, when);
                    if !record.message.is_empty() {
                        println!("  {}", record.message);
                    }
                }
                None => println!("{}: never built", project.name),
            }
            Ok(())
        }
        Commands::Config { save } => {
            let rendered = toml::to_string_pretty(&config.global)?;
            print!("{}", rendered);
            if save {
                config.save()?;
                eprintln!("✓ Configuration saved");
            }
            Ok(())
        }
    }
}

fn orchestrator(config: &Config) -> Result<Orchestrator> {
    let strategy = crate::strategy::from_config(config)?;
    Ok(Orchestrator::new(strategy))
}

/// A registered project name, or a path to a project directory
fn resolve_project(registry: &ProjectRegistry, reference: &str) -> Result<Project> {
    if let Some(project) = registry.find(reference) {
        return Ok(project);
    }

    let safe_path = crate::path::SafePath::from_user_input(reference)?;
    if safe_path.expanded().is_dir() {
        return Ok(Project::from_dir(safe_path.as_path()));
    }

    anyhow::bail!(
        "Unknown project '{}': not a registered name or a directory",
        reference
    )
}

async fn open_workspace(registry: &ProjectRegistry, reference: &str) -> Result<Workspace> {
    let project = resolve_project(registry, reference)?;
    let workspace = Workspace::new(crate::log::LogSink::new());
    workspace.open_project(project).await?;
    Ok(workspace)
}

/// Drive `work` to completion while echoing build-log lines to stdout
async fn with_live_log<F: Future>(orchestrator: &Orchestrator, work: F) -> F::Output {
    let mut lines = orchestrator.subscribe_log();
    tokio::pin!(work);

    loop {
        tokio::select! {
            output = &mut work => {
                while let Ok(line) = lines.try_recv() {
                    println!("{}", line);
                }
                return output;
            }
            received = lines.recv() => match received {
                Ok(line) => println!("{}", line),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("... {} log lines skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return work.await,
            },
        }
    }
}

async fn serve_until_interrupted(orchestrator: &Orchestrator, project: &Project) -> Result<()> {
    if !with_live_log(orchestrator, orchestrator.run(project)).await {
        anyhow::bail!("'{}' is not running", project.name);
    }

    println!("Press Ctrl-C to stop");
    let mut lines = orchestrator.subscribe_log();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            received = lines.recv() => {
                if let Ok(line) = received {
                    println!("{}", line);
                }
            }
        }
    }

    with_live_log(orchestrator, orchestrator.stop()).await;
    Ok(())
}

fn print_tree(nodes: &[FileNode], depth: usize) {
    for node in nodes {
        let suffix = if node.is_directory { "/" } else { "" };
        println!("{}{}{}", "  ".repeat(depth), node.name, suffix);
        print_tree(&node.children, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from(["bento", "run", "demo", "--strategy", "toolchain", "--port", "8080"])
            .unwrap();
        match cli.command {
            Commands::Run { project, overrides } => {
                assert_eq!(project, "demo");
                assert_eq!(overrides.strategy, Some(StrategyKind::Toolchain));
                assert_eq!(overrides.port, Some(8080));

                let mut config = Config::default();
                overrides.apply(&mut config);
                assert_eq!(config.global.build.strategy, StrategyKind::Toolchain);
                assert_eq!(config.global.server.port, 8080);
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["bento", "build", "demo", "--strategy", "webpack"]).is_err());
        assert!(Cli::try_parse_from(["bento", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_resolve_project_by_name_or_path() {
        let temp = TempDir::new().unwrap();
        let registry = ProjectRegistry::new(temp.path().join("projects.json"));
        let created = registry.create(&temp.path().join("ws"), "demo").unwrap();

        assert_eq!(resolve_project(&registry, "demo").unwrap(), created);

        let by_path = resolve_project(&registry, temp.path().join("ws/demo").to_str().unwrap()).unwrap();
        assert_eq!(by_path.name, "demo");

        assert!(resolve_project(&registry, "missing").is_err());
    }
}
