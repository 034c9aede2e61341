use serde::{Deserialize, Serialize};

/// Global Bento configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GlobalConfig {
    pub workspace: WorkspaceConfig,
    pub server: ServerConfig,
    pub build: BuildConfig,
    pub toolchain: ToolchainConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory new projects are created in
    pub path: String,
    /// JSON file holding the project registry
    pub registry: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BuildConfig {
    pub strategy: StrategyKind,
    /// Output directory name, relative to the project root
    pub out_dir: String,
}

/// Which build/run strategy the orchestrator drives
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Built-in lexical bundler plus the local static server
    #[default]
    Builtin,
    /// Delegate to an externally installed toolchain
    Toolchain,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ToolchainConfig {
    pub install: Vec<String>,
    pub build: Vec<String>,
    pub dev: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            path: "~/bento-projects".to_string(),
            registry: "~/.bento/projects.json".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Builtin,
            out_dir: "dist".to_string(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            install: vec!["npm".to_string(), "install".to_string()],
            build: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            dev: vec!["npm".to_string(), "run".to_string(), "dev".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "toolchain" => Ok(Self::Toolchain),
            other => Err(format!(
                "unknown strategy '{}' (expected 'builtin' or 'toolchain')",
                other
            )),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::Toolchain => write!(f, "toolchain"),
        }
    }
}
