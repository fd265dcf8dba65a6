use crate::error::Result;
use crate::palette::{PaletteVariant, DEFAULT_PALETTE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tclish_core::config::DEFAULT_STACK_LIMIT;
use tclish_core::InterpreterConfig;

/// Looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "tclish.yaml";

pub const DEFAULT_MODULE: &str = "tclish";

/// Console configuration, read from `tclish.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Zip bundle to unpack before importing `module`: a URL or a file path
    pub bundle: Option<String>,

    /// Module imported from the bundle
    pub module: String,

    /// Journal the database next to this path
    pub db_file: Option<PathBuf>,

    pub stack_limit: usize,

    /// Interpreter state restored at startup and saved on exit
    pub state_file: Option<PathBuf>,

    pub color: ColorOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorOptions {
    pub enabled: bool,
    pub variant: PaletteVariant,
    pub palette: Vec<String>,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            variant: PaletteVariant::default(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bundle: None,
            module: DEFAULT_MODULE.to_string(),
            db_file: None,
            stack_limit: DEFAULT_STACK_LIMIT,
            state_file: None,
            color: ColorOptions::default(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConsoleOverrides {
    pub bundle: Option<String>,
    pub module: Option<String>,
    pub db_file: Option<PathBuf>,
    pub stack_limit: Option<usize>,
    pub state_file: Option<PathBuf>,
    pub variant: Option<PaletteVariant>,
    pub no_color: bool,
}

impl ConsoleConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// `path` when given, else `tclish.yaml` in `dir` if present, else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = dir.join(CONFIG_FILE);
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write a default configuration file
    pub fn init_file(path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(&ConsoleConfig::default())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn merge(&mut self, overrides: ConsoleOverrides) {
        if let Some(bundle) = overrides.bundle {
            self.bundle = Some(bundle);
        }
        if let Some(module) = overrides.module {
            self.module = module;
        }
        if let Some(db_file) = overrides.db_file {
            self.db_file = Some(db_file);
        }
        if let Some(limit) = overrides.stack_limit {
            self.stack_limit = limit;
        }
        if let Some(state_file) = overrides.state_file {
            self.state_file = Some(state_file);
        }
        if let Some(variant) = overrides.variant {
            self.color.variant = variant;
        }
        if overrides.no_color {
            self.color.enabled = false;
        }
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            stack_limit: self.stack_limit,
            db_file: self.db_file.clone(),
            load_stdlib: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ConsoleConfig = serde_yaml::from_str("bundle: https://example.com/b.zip\n").unwrap();
        assert_eq!(config.bundle.as_deref(), Some("https://example.com/b.zip"));
        assert_eq!(config.module, "tclish");
        assert_eq!(config.stack_limit, 64);
        assert!(config.color.enabled);
        assert_eq!(config.color.palette.len(), 6);
    }

    #[test]
    fn test_nested_color_options() {
        let yaml = "color:\n  variant: distinct\n  palette: ['#000000', '#FFFFFF']\n";
        let config: ConsoleConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.color.variant, PaletteVariant::Distinct);
        assert_eq!(config.color.palette, vec!["#000000", "#FFFFFF"]);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = ConsoleConfig::default();
        config.merge(ConsoleOverrides {
            module: Some("game".to_string()),
            stack_limit: Some(8),
            no_color: true,
            ..ConsoleOverrides::default()
        });
        assert_eq!(config.module, "game");
        assert_eq!(config.interpreter_config().stack_limit, 8);
        assert!(!config.color.enabled);
    }

    #[test]
    fn test_init_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        ConsoleConfig::init_file(&path).unwrap();
        let loaded = ConsoleConfig::discover(None, dir.path()).unwrap();
        assert_eq!(loaded, ConsoleConfig::default());
    }
}
