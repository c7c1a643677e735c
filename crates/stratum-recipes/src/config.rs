//! User configuration file support.
//!
//! Configuration precedence (highest first):
//! 1. Command-line flags
//! 2. Local config file (`./.stratumrc`)
//! 3. Global config file (`~/.stratum/config.toml`)
//! 4. Defaults

use crate::error::{RecipeError, RecipeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

impl OutputFormat {
    /// Render a configuration tree in this format.
    pub fn render<T: Serialize>(self, value: &T) -> RecipeResult<String> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Toml => Ok(toml::to_string_pretty(value)?),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Serialization format for rendered recipes
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDefaults {
    /// Log and checkpoint directory used when a recipe is built without `dir`
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumConfig {
    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub defaults: RecipeDefaults,
}

impl StratumConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> RecipeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RecipeError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to_file(&self, path: &Path) -> RecipeResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".stratum")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".stratumrc")
    }

    /// Load the global then the local file. Missing files are skipped;
    /// unreadable or malformed ones are errors.
    pub fn discover_and_load() -> RecipeResult<Self> {
        Self::load_layered(&[Self::default_global_path(), Self::default_local_path()])
    }

    /// Merge the files in order, later ones overriding earlier ones.
    pub fn load_layered(paths: &[PathBuf]) -> RecipeResult<Self> {
        let mut config = Self::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            config.merge(&Self::load_from_file(path)?);
        }
        Ok(config)
    }

    /// Values set in `other` override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(format) = other.output.format {
            self.output.format = Some(format);
        }
        if let Some(ref dir) = other.defaults.dir {
            self.defaults.dir = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let local = temp.path().join("local.toml");
        let global_text = "log_level = \"debug\"\n[defaults]\ndir = \"/global/runs\"\n";
        let local_text = "[output]\nformat = \"toml\"\n[defaults]\ndir = \"/local/runs\"\n";
        std::fs::write(&global, global_text).unwrap();
        std::fs::write(&local, local_text).unwrap();

        let config = StratumConfig::load_layered(&[global, local]).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.output.format, Some(OutputFormat::Toml));
        assert_eq!(config.defaults.dir, Some(PathBuf::from("/local/runs")));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        let absent = temp.path().join("absent.toml");
        let config = StratumConfig::load_layered(&[absent]).unwrap();
        assert_eq!(config, StratumConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        let result = StratumConfig::load_layered(&[path]);
        assert!(matches!(result, Err(RecipeError::Config(_))));
    }

    #[test]
    fn test_render_formats() {
        let config = StratumConfig {
            log_level: Some("info".to_string()),
            ..StratumConfig::default()
        };
        let json = OutputFormat::Json.render(&config).unwrap();
        assert!(json.contains("\"log_level\": \"info\""));
        let toml = OutputFormat::Toml.render(&config).unwrap();
        assert!(toml.contains("log_level = \"info\""));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let config = StratumConfig {
            log_level: Some("warn".to_string()),
            output: OutputConfig {
                format: Some(OutputFormat::Json),
            },
            defaults: RecipeDefaults {
                dir: Some(PathBuf::from("/runs")),
            },
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(StratumConfig::load_from_file(&path).unwrap(), config);
    }
}
