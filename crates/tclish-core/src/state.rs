//! Saving and restoring the persistent parts of an interpreter.

use crate::db::{DbError, DbTree};
use crate::interpreter::{Definition, Interpreter};
use crate::objects::ObjectRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, StateError>;

/// Help topics, procedures, the database tree and the object registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterState {
    pub helps: IndexMap<String, String>,
    pub definitions: IndexMap<String, Definition>,
    pub db: DbTree,
    pub objects: ObjectRegistry,
}

impl Interpreter {
    pub fn to_state(&self) -> InterpreterState {
        InterpreterState {
            helps: self.helps.clone(),
            definitions: self.definitions.clone(),
            db: self.db.tree().clone(),
            objects: self.objects.clone(),
        }
    }

    /// Merge saved helps, definitions and objects, and replace the database
    pub fn apply_state(&mut self, state: InterpreterState) -> Result<()> {
        self.helps.extend(state.helps);
        self.definitions.extend(state.definitions);
        self.objects.merge(state.objects);
        self.db.restore(state.db)?;
        Ok(())
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_state())?;
        fs::write(path, json)?;
        info!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn load_state(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let state: InterpreterState = serde_json::from_str(&content)?;
        self.apply_state(state)?;
        info!("Loaded state from {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::reply::Reply;
    use tempfile::TempDir;

    fn interpreter() -> Interpreter {
        Interpreter::new(InterpreterConfig::default()).unwrap()
    }

    #[test]
    fn test_state_survives_a_new_interpreter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut first = interpreter();
        first.run("defproc greet {+ 1 [args 1]} {adds one}");
        first.run("db set config theme dark");
        first.run("class pet var name {} rex\nnew pet p");
        first.save_state(&path).unwrap();

        let mut second = interpreter();
        second.load_state(&path).unwrap();
        assert_eq!(second.run("greet 2"), Reply::ok("3"));
        assert_eq!(second.run("db get config theme"), Reply::ok("dark"));
        assert_eq!(second.run("p get name"), Reply::ok("rex"));
        assert_eq!(second.run("new pet q"), Reply::ok("<instance-pet-2>"));
    }

    #[test]
    fn test_partial_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{ "helps": { "intro": "hello" } }"#).unwrap();

        let mut interp = interpreter();
        interp.load_state(&path).unwrap();
        assert_eq!(interp.helps().get("intro").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_invalid_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            interpreter().load_state(&path),
            Err(StateError::Json(_))
        ));
    }
}
