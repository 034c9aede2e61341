pub mod types;

use crate::error::{BentoError, Result};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use types::{
    BuildConfig, GlobalConfig, LoggingConfig, ServerConfig, StrategyKind, ToolchainConfig,
    WorkspaceConfig,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let global = Self::load_global_config()?;
        Ok(Self { global })
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config/bento/config.toml"))
    }

    fn load_global_config() -> Result<GlobalConfig> {
        let config_paths: Vec<Option<PathBuf>> = vec![
            Self::global_config_path(),
            Some(PathBuf::from("bento.toml")),
        ];

        for path in config_paths.into_iter().flatten() {
            if path.exists() {
                let content = fs::read_to_string(&path)
                    .map_err(|e| BentoError::io(&path, e))?;
                return Self::parse(&content);
            }
        }

        Ok(GlobalConfig::default())
    }

    /// Parse a TOML document; missing sections and keys take their defaults
    pub fn parse(content: &str) -> Result<GlobalConfig> {
        toml::from_str(content)
            .map_err(|e| BentoError::Config(format!("Failed to parse config TOML: {}", e)))
    }

    /// Save global config to ~/.config/bento/config.toml
    pub fn save(&self) -> Result<()> {
        let config_path = Self::global_config_path()
            .ok_or_else(|| BentoError::Config("Could not find home directory".to_string()))?;

        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).map_err(|e| BentoError::io(config_dir, e))?;
        }

        let toml_string = toml::to_string_pretty(&self.global)
            .map_err(|e| BentoError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&config_path, toml_string).map_err(|e| BentoError::io(&config_path, e))?;

        Ok(())
    }

    /// Directory new projects are created in (tilde expanded)
    pub fn workspace_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.global.workspace.path).to_string())
    }

    /// Registry file location (tilde expanded)
    pub fn registry_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.global.workspace.registry).to_string())
    }

    /// Log file location, if file logging is enabled
    pub fn log_file(&self) -> Option<PathBuf> {
        self.global
            .logging
            .file
            .as_ref()
            .map(|f| PathBuf::from(shellexpand::tilde(f).to_string()))
    }

    /// Address the local static server binds to
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let host = &self.global.server.host;
        let addr = format!("{}:{}", host, self.global.server.port);
        addr.parse()
            .map_err(|e| BentoError::Config(format!("Invalid server address '{}': {}", addr, e)))
    }
}
