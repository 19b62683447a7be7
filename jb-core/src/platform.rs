//! Platform detection and OS-specific directories.

use std::path::PathBuf;
use crate::error::{JbError, JbResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Get the platform-specific application data directory.
    ///
    /// - Windows: `%APPDATA%/JobBook`
    /// - macOS: `~/Library/Application Support/JobBook`
    /// - Linux: `~/.local/share/JobBook`
    pub fn data_dir() -> JbResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| JbError::Config("could not determine data directory".into()))?;
        Ok(base.join("JobBook"))
    }

    /// Get the platform-specific configuration directory.
    ///
    /// - Windows: `%APPDATA%/JobBook`
    /// - macOS: `~/Library/Application Support/JobBook`
    /// - Linux: `~/.config/JobBook`
    pub fn config_dir() -> JbResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| JbError::Config("could not determine config directory".into()))?;
        Ok(base.join("JobBook"))
    }

    /// Get the directory for session-scoped files.
    ///
    /// Uses the login session's runtime directory (`$XDG_RUNTIME_DIR` on
    /// Linux), which the OS clears when the session ends. Platforms without
    /// one fall back to the system temp directory.
    pub fn session_dir() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("JobBook")
    }

    /// Get the user's document directory, used as the default export target.
    pub fn documents_dir() -> PathBuf {
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get a human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let p = Platform::current();
        assert!(matches!(p, Platform::Windows | Platform::MacOs | Platform::Linux));
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(Platform::Windows.name(), "Windows");
        assert_eq!(Platform::MacOs.name(), "macOS");
        assert_eq!(Platform::Linux.name(), "Linux");
    }

    #[test]
    fn test_session_dir_is_app_scoped() {
        let dir = Platform::session_dir();
        assert!(dir.ends_with("JobBook"));
    }
}
