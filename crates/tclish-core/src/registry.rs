use crate::interpreter::Interpreter;
use crate::reply::Reply;
use crate::task::Task;
use indexmap::IndexMap;
use std::sync::Arc;

/// Signature shared by built-in commands, handles and host extensions
pub type CommandFn = Arc<dyn Fn(&mut Interpreter, &mut Task, &[String]) -> Reply + Send + Sync>;

/// A registered command and its help text
#[derive(Clone)]
pub struct Command {
    pub func: CommandFn,
    pub help: String,
}

/// Named commands in registration order
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; fails if the name is taken
    pub fn add<F>(&mut self, name: &str, func: F, help: &str) -> Result<(), String>
    where
        F: Fn(&mut Interpreter, &mut Task, &[String]) -> Reply + Send + Sync + 'static,
    {
        if self.commands.contains_key(name) {
            return Err(format!("'{}' is already defined", name));
        }
        self.commands.insert(
            name.to_string(),
            Command {
                func: Arc::new(func),
                help: help.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        self.commands.shift_remove(name);
    }

    pub fn get(&self, name: &str) -> Option<CommandFn> {
        self.commands.get(name).map(|c| c.func.clone())
    }

    pub fn help(&self, name: &str) -> Option<&str> {
        self.commands.get(name).map(|c| c.help.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = CommandRegistry::new();
        assert!(registry.add("x", |_, _, _| Reply::empty(), "help x").is_ok());
        let err = registry.add("x", |_, _, _| Reply::empty(), "").unwrap_err();
        assert_eq!(err, "'x' is already defined");
        assert_eq!(registry.help("x"), Some("help x"));
    }

    #[test]
    fn test_keys_in_registration_order() {
        let mut registry = CommandRegistry::new();
        for name in ["b", "a", "c"] {
            registry.add(name, |_, _, _| Reply::empty(), "").unwrap();
        }
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        registry.remove("a");
        assert_eq!(registry.len(), 2);
    }
}
