//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use slidebank_core::Category;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub ai: AiConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoPlatformDirs)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# SlideBank Configuration
# Presentation ingestion: watch, extract, render, archive

[general]
# Data directory for the database and default storage
# data_dir = "~/.local/share/slidebank"

[storage]
# Inbox where new decks are dropped
# stage = "~/SlideBank/stage"

# Optional second inbox, e.g. a network share
# original = "/mnt/share/decks"

# Long-term storage; processed decks are moved here
# template = "~/SlideBank/template"

# Rendered slide images, one directory per deck
# thumbnails = "~/SlideBank/thumbnails"

# Fast local workspace for staged copies and intermediate PDFs
# scratch = "/tmp/slidebank"

[watch]
# File extension to ingest (case-insensitive)
extension = "pptx"

# File patterns to ignore
ignore_patterns = [
    "~$*",
    "*.tmp",
    ".DS_Store",
    "._*",
]

# Wait this long after a write before processing (seconds)
quiescence_seconds = 2

# Default for the auto_process flag until it is set explicitly
auto_process = true

[render]
# Converts the deck to PDF
office_binary = "libreoffice"

# Rasterizes the PDF into one PNG per page
rasterizer_binary = "pdftoppm"

dpi = 150

[ai]
# Default for the ai_enabled flag until it is set explicitly
enabled = false

active_provider = "ollama"
# max_input_chars = 8000

[ai.providers.ollama]
driver = "ollama"
endpoint = "http://localhost:11434"
model = "llama3.1"
timeout_seconds = 120

# [ai.providers.openai]
# driver = "openai"
# endpoint = "https://api.openai.com/v1"
# model = "gpt-4o-mini"
# api_key_env = "OPENAI_API_KEY"
# input_price_per_1m = 0.15
# output_price_per_1m = 0.60

# [ai.providers.claude]
# driver = "anthropic"
# endpoint = "https://api.anthropic.com"
# model = "claude-3-5-haiku-latest"
# api_key_env = "ANTHROPIC_API_KEY"
"#
        .to_string()
    }

    /// Reject configurations that cannot work at all.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.watch.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid("watch.extension is empty".to_string()));
        }
        if self.render.dpi == 0 {
            return Err(ConfigError::Invalid("render.dpi must be positive".to_string()));
        }
        if self.ai.enabled && !self.ai.providers.contains_key(&self.ai.active_provider) {
            return Err(ConfigError::Invalid(format!(
                "ai.active_provider '{}' has no [ai.providers.{}] section",
                self.ai.active_provider, self.ai.active_provider
            )));
        }
        Ok(())
    }

    /// Point one storage area at a directory.
    pub fn set_storage_dir(&mut self, area: &str, dir: String) -> ConfigResult<()> {
        let slot = match area {
            "stage" => &mut self.storage.stage,
            "original" => &mut self.storage.original,
            "template" => &mut self.storage.template,
            "thumbnails" => &mut self.storage.thumbnails,
            "scratch" => &mut self.storage.scratch,
            other => return Err(ConfigError::UnknownArea(other.to_string())),
        };
        *slot = Some(dir);
        Ok(())
    }

    /// Data directory, honouring the `general.data_dir` override.
    pub fn app_paths(&self) -> ConfigResult<AppPaths> {
        match &self.general.data_dir {
            Some(dir) => AppPaths::with_data_dir(expand(dir)),
            None => AppPaths::new(),
        }
        .ok_or(ConfigError::NoPlatformDirs)
    }

    /// Resolve every storage area to an absolute directory.
    pub fn storage_roots(&self, paths: &AppPaths) -> StorageRoots {
        let base = &paths.storage_dir;
        let pick = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .map(expand)
                .unwrap_or_else(|| base.join(default))
        };

        StorageRoots {
            stage: pick(&self.storage.stage, "stage"),
            original: self.storage.original.as_deref().map(expand),
            template: pick(&self.storage.template, "template"),
            thumbnails: pick(&self.storage.thumbnails, "thumbnails"),
            scratch: pick(&self.storage.scratch, "scratch"),
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// Storage directories; unset areas live under the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub stage: Option<String>,
    pub original: Option<String>,
    pub template: Option<String>,
    pub thumbnails: Option<String>,
    pub scratch: Option<String>,
}

/// Resolved storage directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    pub stage: PathBuf,
    pub original: Option<PathBuf>,
    pub template: PathBuf,
    pub thumbnails: PathBuf,
    pub scratch: PathBuf,
}

impl StorageRoots {
    /// All roots under a single base directory. Used by tests and `init`.
    pub fn under(base: &Path) -> Self {
        Self {
            stage: base.join("stage"),
            original: None,
            template: base.join("template"),
            thumbnails: base.join("thumbnails"),
            scratch: base.join("scratch"),
        }
    }

    /// Roots the watcher observes: the inboxes, never long-term storage.
    pub fn watch_roots(&self) -> Vec<(Category, PathBuf)> {
        let mut roots = vec![(Category::Stage, self.stage.clone())];
        if let Some(original) = &self.original {
            roots.push((Category::Original, original.clone()));
        }
        roots
    }

    /// Find the category root containing `path`, with the path relative to it.
    ///
    /// Inboxes and long-term storage both count. When roots are nested the
    /// deepest one wins.
    pub fn categorize(&self, path: &Path) -> Option<(Category, PathBuf)> {
        let mut roots = self.watch_roots();
        roots.push((Category::Template, self.template.clone()));
        roots
            .into_iter()
            .filter_map(|(category, root)| {
                let relative = path.strip_prefix(&root).ok()?;
                if relative.as_os_str().is_empty() {
                    return None;
                }
                Some((root.components().count(), category, relative.to_path_buf()))
            })
            .max_by_key(|(depth, _, _)| *depth)
            .map(|(_, category, relative)| (category, relative))
    }

    /// Create every configured directory.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.stage)?;
        if let Some(original) = &self.original {
            std::fs::create_dir_all(original)?;
        }
        std::fs::create_dir_all(&self.template)?;
        std::fs::create_dir_all(&self.thumbnails)?;
        std::fs::create_dir_all(&self.scratch)?;
        Ok(())
    }
}

/// File watching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub extension: String,
    pub ignore_patterns: Vec<String>,
    pub quiescence_seconds: u64,
    pub auto_process: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extension: "pptx".to_string(),
            ignore_patterns: vec![
                "~$*".to_string(),
                "*.tmp".to_string(),
                ".DS_Store".to_string(),
                "._*".to_string(),
            ],
            quiescence_seconds: 2,
            auto_process: true,
        }
    }
}

/// External converter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub office_binary: String,
    pub rasterizer_binary: String,
    pub dpi: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            office_binary: "libreoffice".to_string(),
            rasterizer_binary: "pdftoppm".to_string(),
            dpi: 150,
        }
    }
}

/// AI enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub active_provider: String,
    /// Slide text beyond this many characters is cut before prompting.
    pub max_input_chars: Option<usize>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for AiConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert("ollama".to_string(), ProviderConfig::default());
        Self {
            enabled: false,
            active_provider: "ollama".to_string(),
            max_input_chars: None,
            providers,
        }
    }
}

impl AiConfig {
    pub fn active(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.active_provider)
    }
}

/// Backend protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderDriver {
    Ollama,
    #[serde(alias = "openai-compatible")]
    OpenAi,
    Anthropic,
    Mock,
}

/// One configured AI provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub driver: ProviderDriver,
    /// Base URL; empty selects the driver's public default.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable holding the key, read when `api_key` is unset.
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub input_price_per_1m: f64,
    pub output_price_per_1m: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            driver: ProviderDriver::Ollama,
            endpoint: String::new(),
            model: "llama3.1".to_string(),
            api_key: None,
            api_key_env: None,
            temperature: 0.3,
            max_tokens: 512,
            timeout_seconds: 120,
            input_price_per_1m: 0.0,
            output_price_per_1m: 0.0,
        }
    }
}

impl ProviderConfig {
    /// The API key from config or, failing that, the named environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_ref()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.watch.extension, "pptx");
        assert_eq!(config.watch.quiescence_seconds, 2);
        assert_eq!(config.render.dpi, 150);
        assert!(!config.ai.enabled);
        assert!(config.ai.active().is_some());
    }

    #[test]
    fn test_default_string_parses() {
        let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.render.office_binary, "libreoffice");
        assert!(config.watch.ignore_patterns.contains(&"~$*".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [render]
            dpi = 96

            [ai]
            enabled = true
            active_provider = "local"

            [ai.providers.local]
            driver = "mock"
            model = "echo"
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.render.dpi, 96);
        // Defaults should still work
        assert_eq!(config.render.rasterizer_binary, "pdftoppm");
        let provider = config.ai.active().unwrap();
        assert_eq!(provider.driver, ProviderDriver::Mock);
        assert_eq!(provider.timeout_seconds, 120);
    }

    #[test]
    fn test_missing_active_provider_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [ai]
            enabled = true
            active_provider = "nowhere"
            "#
        )
        .unwrap();

        let err = Config::load_from(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_set_storage_dir() {
        let mut config = Config::default();
        config
            .set_storage_dir("original", "/mnt/share".to_string())
            .unwrap();
        assert_eq!(config.storage.original.as_deref(), Some("/mnt/share"));
        assert!(config.set_storage_dir("archive", "/x".to_string()).is_err());
    }

    #[test]
    fn test_storage_roots_defaults() {
        let paths = AppPaths::with_data_dir(PathBuf::from("/data")).unwrap();
        let roots = Config::default().storage_roots(&paths);
        assert_eq!(roots.stage, PathBuf::from("/data/storage/stage"));
        assert_eq!(roots.template, PathBuf::from("/data/storage/template"));
        assert!(roots.original.is_none());
    }

    #[test]
    fn test_categorize() {
        let roots = StorageRoots {
            original: Some(PathBuf::from("/mnt/share")),
            ..StorageRoots::under(Path::new("/srv"))
        };

        let (category, rel) = roots
            .categorize(Path::new("/srv/stage/sales/q3.pptx"))
            .unwrap();
        assert_eq!(category, Category::Stage);
        assert_eq!(rel, PathBuf::from("sales/q3.pptx"));

        let (category, _) = roots.categorize(Path::new("/mnt/share/a.pptx")).unwrap();
        assert_eq!(category, Category::Original);

        assert!(roots.categorize(Path::new("/elsewhere/a.pptx")).is_none());
        assert!(roots.categorize(Path::new("/srv/stage")).is_none());
    }

    #[test]
    fn test_template_is_categorized_but_not_watched() {
        let roots = StorageRoots {
            original: Some(PathBuf::from("/mnt/share")),
            ..StorageRoots::under(Path::new("/srv"))
        };

        let watched: Vec<Category> = roots.watch_roots().into_iter().map(|(c, _)| c).collect();
        assert_eq!(watched, vec![Category::Stage, Category::Original]);

        let (category, rel) = roots
            .categorize(Path::new("/srv/template/sales/q3.pptx"))
            .unwrap();
        assert_eq!(category, Category::Template);
        assert_eq!(rel, PathBuf::from("sales/q3.pptx"));
    }

    #[test]
    fn test_nested_roots_prefer_deepest() {
        let roots = StorageRoots {
            original: Some(PathBuf::from("/srv/stage/remote")),
            ..StorageRoots::under(Path::new("/srv"))
        };
        let (category, rel) = roots
            .categorize(Path::new("/srv/stage/remote/a.pptx"))
            .unwrap();
        assert_eq!(category, Category::Original);
        assert_eq!(rel, PathBuf::from("a.pptx"));
    }

    #[test]
    fn test_resolved_api_key() {
        let provider = ProviderConfig {
            api_key: Some("inline".to_string()),
            api_key_env: Some("SLIDEBANK_TEST_UNSET_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(provider.resolved_api_key().as_deref(), Some("inline"));

        let provider = ProviderConfig {
            api_key_env: Some("SLIDEBANK_TEST_UNSET_KEY".to_string()),
            ..Default::default()
        };
        assert!(provider.resolved_api_key().is_none());
    }
}
