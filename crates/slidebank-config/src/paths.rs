//! Application paths management.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    /// Default home of the stage/template/thumbnail trees.
    pub storage_dir: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "slidebank", "slidebank")?;
        Some(Self::with_dirs(
            proj_dirs.config_dir().to_path_buf(),
            proj_dirs.data_dir().to_path_buf(),
        ))
    }

    /// Paths rooted at an explicit data directory, keeping the platform config dir.
    pub fn with_data_dir(data_dir: PathBuf) -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "slidebank", "slidebank")?;
        Some(Self::with_dirs(proj_dirs.config_dir().to_path_buf(), data_dir))
    }

    fn with_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            database_file: data_dir.join("slidebank.db"),
            storage_dir: data_dir.join("storage"),
            config_dir,
            data_dir,
        }
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.storage_dir)?;
        Ok(())
    }

    /// Check if slidebank has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_paths_creation() {
        let paths = AppPaths::new();
        assert!(paths.is_some());

        let paths = paths.unwrap();
        assert!(paths.config_file.to_string_lossy().contains("config.toml"));
        assert!(paths.database_file.to_string_lossy().contains("slidebank.db"));
    }

    #[test]
    fn test_data_dir_override() {
        let paths = AppPaths::with_data_dir(PathBuf::from("/srv/slidebank")).unwrap();
        assert_eq!(paths.database_file, PathBuf::from("/srv/slidebank/slidebank.db"));
        assert_eq!(paths.storage_dir, PathBuf::from("/srv/slidebank/storage"));
    }
}
