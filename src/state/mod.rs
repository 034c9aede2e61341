pub mod build;

pub use build::{BuildOutcome, BuildRecord, load_build_record, save_build_record};

/// Orchestrator status. Exactly one value is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BuildStatus {
    #[default]
    Idle,
    Building,
    Running,
    Success(String),
    Error(String),
}

impl BuildStatus {
    /// Statuses in which a new build is refused
    pub fn is_busy(&self) -> bool {
        matches!(self, BuildStatus::Building | BuildStatus::Running)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BuildStatus::Running)
    }

    pub fn is_building(&self) -> bool {
        matches!(self, BuildStatus::Building)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            BuildStatus::Success(msg) | BuildStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Idle => write!(f, "idle"),
            BuildStatus::Building => write!(f, "building"),
            BuildStatus::Running => write!(f, "running"),
            BuildStatus::Success(msg) => write!(f, "success: {}", msg),
            BuildStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(BuildStatus::Building.is_busy());
        assert!(BuildStatus::Running.is_busy());
        assert!(!BuildStatus::Idle.is_busy());
        assert!(!BuildStatus::Success("ok".into()).is_busy());
        assert!(!BuildStatus::Error("bad".into()).is_busy());
    }

    #[test]
    fn test_display_and_message() {
        let status = BuildStatus::Error("Build failed".into());
        assert_eq!(status.to_string(), "error: Build failed");
        assert_eq!(status.message(), Some("Build failed"));
        assert_eq!(BuildStatus::default(), BuildStatus::Idle);
        assert!(BuildStatus::Idle.message().is_none());
    }
}
