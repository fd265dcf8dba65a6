use crate::config::DEFAULT_STACK_LIMIT;
use crate::reply::Reply;
use rustc_hash::FxHashMap;

/// One level of the evaluation stack
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub args: Vec<String>,
    pub values: FxHashMap<String, String>,
    pub label: String,
}

/// A unit of execution: the program text plus its stack of frames
#[derive(Debug, Clone)]
pub struct Task {
    frames: Vec<Frame>,
    stack_limit: usize,
    program: String,
}

impl Task {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_args(program, Vec::new())
    }

    /// Create a task whose first frame holds `args`
    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        let mut task = Task {
            frames: Vec::new(),
            stack_limit: DEFAULT_STACK_LIMIT,
            program: program.into(),
        };
        task.push(args, String::new());
        task
    }

    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Arguments of the innermost frame
    pub fn args(&self) -> &[String] {
        self.frames.last().map(|f| f.args.as_slice()).unwrap_or(&[])
    }

    /// Returns false once the stack limit is exceeded
    pub fn push(&mut self, args: Vec<String>, label: impl Into<String>) -> bool {
        if self.frames.len() > self.stack_limit {
            return false;
        }
        self.frames.push(Frame {
            args,
            values: FxHashMap::default(),
            label: label.into(),
        });
        true
    }

    pub fn pop(&mut self) -> bool {
        self.frames.pop().is_some()
    }

    /// Look a name up from the innermost frame outwards
    pub fn get(&self, key: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.values.get(key).map(String::as_str))
    }

    /// Bind a name in the innermost frame
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.values.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    /// Overwrite the nearest existing binding
    pub fn update(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.values.contains_key(key))
        {
            Some(frame) => {
                frame.values.insert(key.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    pub fn unset(&mut self, key: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.values.remove(key);
        }
    }

    /// Build an error reply carrying this task's stack trace
    pub fn error(&self, message: impl std::fmt::Display, label: impl std::fmt::Display) -> Reply {
        let mut lines = vec![format!("<{}> {}", label, message)];
        if let Some(top) = self.frames.last() {
            lines.push(format!("while evaluating:{{{}}}", top.label));
            lines.push("stack:".to_string());
            for (i, frame) in self.frames.iter().rev().enumerate() {
                lines.push(format!("{:>4}: {{{}}}", i, frame.label));
            }
        }
        Reply::Error(lines.join("\n"))
    }
}
