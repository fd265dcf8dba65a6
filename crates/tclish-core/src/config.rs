use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default maximum number of nested evaluation frames per task
pub const DEFAULT_STACK_LIMIT: usize = 64;

/// Options that control how an interpreter is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterConfig {
    /// Maximum frame depth before `stack limit exceeded` (default: 64)
    #[serde(default = "default_stack_limit")]
    pub stack_limit: usize,

    /// Journal the database to `<dbFile>.steps` / `<dbFile>.snapshots`
    #[serde(default)]
    pub db_file: Option<PathBuf>,

    /// Register the math, common and string libraries (default: true)
    #[serde(default = "default_true")]
    pub load_stdlib: bool,
}

fn default_stack_limit() -> usize {
    DEFAULT_STACK_LIMIT
}

fn default_true() -> bool {
    true
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            stack_limit: DEFAULT_STACK_LIMIT,
            db_file: None,
            load_stdlib: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InterpreterConfig::default();
        assert_eq!(config.stack_limit, 64);
        assert!(config.db_file.is_none());
        assert!(config.load_stdlib);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{ "stackLimit": 8 }"#;
        let config: InterpreterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.stack_limit, 8);
        assert!(config.load_stdlib);
    }
}
