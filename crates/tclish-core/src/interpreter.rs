//! The evaluator: word substitution, sentence dispatch and frame handling.

use crate::config::InterpreterConfig;
use crate::db::{Database, DbError};
use crate::directives;
use crate::events::EventQueue;
use crate::objects::{self, ObjectRegistry};
use crate::output::{OutputSink, StdoutSink};
use crate::registry::{CommandFn, CommandRegistry};
use crate::reply::Reply;
use crate::scanner::{self, escape_len};
use crate::stdlib;
use crate::task::Task;
use crate::text::{self, read_word};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Marker word that splices the following list into the arguments
pub const SPLAT: &str = "{*}";

/// A user procedure created by `defproc` or `proc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub body: String,
    pub help: String,
}

/// What a handle dispatches to
#[derive(Clone)]
pub enum HandleTarget {
    /// Forward to an object instance (used for `self`)
    Instance(String),
    Command(CommandFn),
}

/// A temporary command binding that shadows nothing but definitions
#[derive(Clone)]
pub struct Handle {
    pub target: HandleTarget,
    pub help: String,
}

pub struct Interpreter {
    pub(crate) commands: CommandRegistry,
    pub(crate) handles: IndexMap<String, Handle>,
    pub(crate) helps: IndexMap<String, String>,
    pub(crate) definitions: IndexMap<String, Definition>,
    pub(crate) db: Database,
    pub(crate) objects: ObjectRegistry,
    pub(crate) events: EventQueue,
    output: Arc<dyn OutputSink>,
    config: InterpreterConfig,
}

impl Interpreter {
    /// Create an interpreter printing to stdout
    pub fn new(config: InterpreterConfig) -> Result<Self, DbError> {
        Self::with_output(config, Arc::new(StdoutSink))
    }

    /// Create an interpreter with a custom output sink (for testing)
    pub fn with_output(
        config: InterpreterConfig,
        output: Arc<dyn OutputSink>,
    ) -> Result<Self, DbError> {
        let db = match &config.db_file {
            Some(path) => Database::open(path)?,
            None => Database::in_memory(),
        };

        let mut interpreter = Interpreter {
            commands: CommandRegistry::new(),
            handles: IndexMap::new(),
            helps: IndexMap::new(),
            definitions: IndexMap::new(),
            db,
            objects: ObjectRegistry::new(),
            events: EventQueue::new(),
            output,
            config,
        };

        crate::db::register(&mut interpreter.commands);
        directives::register_help(&mut interpreter.commands);
        objects::register(&mut interpreter.commands);
        crate::events::register(&mut interpreter.commands);
        if interpreter.config.load_stdlib {
            stdlib::register_all(&mut interpreter.commands);
        }

        debug!(
            commands = interpreter.commands.len(),
            journaled = interpreter.db.is_journaled(),
            "Interpreter ready"
        );
        Ok(interpreter)
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn definitions(&self) -> &IndexMap<String, Definition> {
        &self.definitions
    }

    pub fn helps(&self) -> &IndexMap<String, String> {
        &self.helps
    }

    pub fn handles(&self) -> &IndexMap<String, Handle> {
        &self.handles
    }

    /// Send text to the output sink
    pub fn write_output(&self, text: &str) {
        self.output.write(text);
    }

    /// Register a host command
    pub fn add_command<F>(&mut self, name: &str, func: F, help: &str) -> Result<(), String>
    where
        F: Fn(&mut Interpreter, &mut Task, &[String]) -> Reply + Send + Sync + 'static,
    {
        self.commands.add(name, func, help)
    }

    /// Add a general help topic
    pub fn add_help(&mut self, topic: impl Into<String>, text: impl Into<String>) {
        self.helps.insert(topic.into(), text.into());
    }

    /// Define or redefine a procedure
    pub fn add_definition(&mut self, name: &str, body: &str, help: &str) {
        self.definitions.insert(
            name.to_string(),
            Definition {
                body: body.to_string(),
                help: help.to_string(),
            },
        );
    }

    /// Install a handle, returning the one it replaced
    pub fn add_handle(&mut self, name: &str, handle: Handle) -> Option<Handle> {
        self.handles.insert(name.to_string(), handle)
    }

    /// Remove a handle and restore `previous` if there was one
    pub fn remove_handle(&mut self, name: &str, previous: Option<Handle>) {
        self.handles.shift_remove(name);
        if let Some(prev) = previous {
            self.handles.insert(name.to_string(), prev);
        }
    }

    /// Run `f` with `handle` bound to `name`
    pub fn with_handle<R>(
        &mut self,
        name: &str,
        handle: Handle,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.add_handle(name, handle);
        let result = f(self);
        self.remove_handle(name, previous);
        result
    }

    /// Whether `name` resolves to anything invocable
    pub fn is_known_command(&self, name: &str) -> bool {
        directives::lookup(name).is_some()
            || self.commands.contains(name)
            || self.objects.contains(name)
            || self.handles.contains_key(name)
            || self.definitions.contains_key(name)
    }

    /// A fresh task honouring the configured stack limit
    pub fn new_task(&self, program: &str) -> Task {
        Task::new(program).with_stack_limit(self.config.stack_limit)
    }

    /// Evaluate source text in a fresh task
    pub fn run(&mut self, source: &str) -> Reply {
        debug!(len = source.len(), "Running source");
        let mut task = self.new_task(source);
        self.eval(&mut task, source, Vec::new(), None)
    }

    /// Evaluate `prog` in a new frame holding `args`
    pub fn eval(
        &mut self,
        task: &mut Task,
        prog: &str,
        args: Vec<String>,
        label: Option<&str>,
    ) -> Reply {
        if !task.push(args, label.unwrap_or(prog)) {
            return task.error("stack limit exceeded", "eval");
        }
        trace!(depth = task.depth(), "eval");
        let reply = self.simple_eval(task, prog);
        task.pop();
        match reply {
            Reply::Return(value) => Reply::Ok(value),
            other => other,
        }
    }

    /// Evaluate `prog` in the current frame; the value is that of the last
    /// sentence
    pub fn simple_eval(&mut self, task: &mut Task, prog: &str) -> Reply {
        let sentences = match scanner::split_sentences(prog) {
            Ok(sentences) => sentences,
            Err(e) => return task.error(e.message, e.label),
        };

        let mut result = String::new();
        for sentence in &sentences {
            match self.eval_sentence(task, sentence) {
                Reply::Ok(value) => result = value,
                Reply::Comment => {}
                abort => return abort,
            }
        }
        Reply::Ok(result)
    }

    /// Evaluate a code body with `args`; a bare command name is called with
    /// the args spliced in
    pub fn do_codebody(&mut self, task: &mut Task, code: &str, args: Vec<String>) -> Reply {
        if text::is_command_name(code) {
            let body = format!("{} {} [args list]", code, SPLAT);
            self.eval(task, &body, args, None)
        } else {
            self.eval(task, code, args, None)
        }
    }

    /// Variable lookup: task frames, then the database root
    pub fn get_value(&self, key: &str, task: Option<&Task>) -> String {
        if let Some(value) = task.and_then(|t| t.get(key)) {
            return value.to_string();
        }
        self.db.get(&[key.to_string()])
    }

    fn eval_sentence(&mut self, task: &mut Task, words: &[String]) -> Reply {
        let Some(first) = words.first() else {
            return Reply::Comment;
        };
        if first.is_empty() || first.starts_with('#') {
            return Reply::Comment;
        }

        let mut command = match self.clean_word(task, first) {
            Reply::Ok(value) => value,
            abort => return abort,
        };

        let mut args = Vec::with_capacity(words.len() - 1);
        let mut index = 1;
        while index < words.len() {
            let word = &words[index];
            index += 1;
            if word == SPLAT {
                if command == "help" && index == 2 {
                    args.push(SPLAT.to_string());
                    continue;
                }
                let Some(next) = words.get(index) else {
                    break;
                };
                index += 1;
                match self.clean_word(task, next) {
                    Reply::Ok(value) => args.extend(text::unpack(&value)),
                    abort => return abort,
                }
                continue;
            }
            match self.clean_word(task, word) {
                Reply::Ok(value) => args.push(value),
                abort => return abort,
            }
        }

        let mut field = None;
        let is_modifier = command.len() >= 2
            && command.ends_with('=')
            && !command.ends_with("==")
            && !self.is_known_command(&command);
        if is_modifier {
            if args.is_empty() {
                return task.error("Modifiers requires a field name", &command);
            }
            let name = std::mem::take(&mut args[0]);
            args[0] = task.get(&name).unwrap_or("").to_string();
            field = Some(name);
            command.pop();
        }

        let reply = self.dispatch(task, &command, &args);
        if reply.is_abort() {
            return reply;
        }

        if let Some(field) = field {
            let value = reply.value().to_string();
            if !task.update(&field, value.clone()) {
                task.set(field, value);
            }
        }
        reply
    }

    fn dispatch(&mut self, task: &mut Task, command: &str, args: &[String]) -> Reply {
        if let Some(directive) = directives::lookup(command) {
            return directive(self, task, args);
        }
        if let Some(func) = self.commands.get(command) {
            return func(self, task, args);
        }
        if self.objects.contains(command) {
            return objects::instance_command(self, task, command, args);
        }
        if let Some(handle) = self.handles.get(command).cloned() {
            return match handle.target {
                HandleTarget::Instance(id) => objects::instance_command(self, task, &id, args),
                HandleTarget::Command(func) => func(self, task, args),
            };
        }
        if let Some(definition) = self.definitions.get(command).cloned() {
            return self.eval(task, &definition.body, args.to_vec(), None);
        }
        task.error("unknown command", command)
    }

    /// Substitute a raw word into its value
    pub fn clean_word(&mut self, task: &mut Task, word: &str) -> Reply {
        let Some(first) = word.chars().next() else {
            return Reply::empty();
        };
        let rest = &word[first.len_utf8()..];
        match first {
            '"' => self.clean_quoted(task, rest),
            '\'' => Reply::Ok(text::unescape(rest.strip_suffix('\'').unwrap_or(rest))),
            '[' => {
                let inner = rest.strip_suffix(']').unwrap_or(rest);
                self.simple_eval(task, inner)
            }
            '{' => Reply::ok(rest.strip_suffix('}').unwrap_or(rest)),
            '$' => Reply::Ok(self.get_value(rest, Some(task))),
            _ => Reply::ok(word),
        }
    }

    fn clean_quoted(&mut self, task: &mut Task, body: &str) -> Reply {
        let chars: Vec<char> = body.chars().collect();
        let mut out = String::new();
        let mut pos = 0;

        while pos < chars.len() && chars[pos] != '"' {
            match chars[pos] {
                '\\' => {
                    let len = escape_len(&chars, pos);
                    let sequence: String = chars[pos..pos + len].iter().collect();
                    out.push_str(&text::unescape(&sequence));
                    pos += len;
                }
                '$' => match read_word(&chars, pos + 1) {
                    Some((name, next)) => {
                        out.push_str(&self.get_value(&name, Some(task)));
                        pos = next;
                    }
                    None => {
                        out.push('$');
                        pos += 1;
                    }
                },
                '[' => {
                    let start = pos;
                    let end = match scanner::skip_command(&chars, pos) {
                        Ok(end) => end,
                        Err(e) => return task.error(e.message, e.label),
                    };
                    let inner: String = chars[start + 1..end - 1].iter().collect();
                    match self.simple_eval(task, &inner) {
                        Reply::Ok(value) => out.push_str(&value),
                        abort => return abort,
                    }
                    pos = end;
                }
                c => {
                    out.push(c);
                    pos += 1;
                }
            }
        }
        Reply::Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CollectingSink;

    fn interpreter() -> (Interpreter, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let interp = Interpreter::with_output(InterpreterConfig::default(), sink.clone()).unwrap();
        (interp, sink)
    }

    #[test]
    fn test_last_sentence_is_result() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("set a 1\nset b 2"), Reply::ok("2"));
    }

    #[test]
    fn test_quoted_substitution() {
        let (mut interp, _) = interpreter();
        let reply = interp.run("set name world\nset x \"hello $name, [+ 1 2]\\t!\"");
        assert_eq!(reply, Reply::ok("hello world, 3\t!"));
    }

    #[test]
    fn test_braced_variable_name() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("set {a b} 5\nset r \"${a b}x\""), Reply::ok("5x"));
    }

    #[test]
    fn test_splat_arguments() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("+ {*} [list 1 2 3]"), Reply::ok("6"));
    }

    #[test]
    fn test_modifier_updates_variable() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("set x 4\n+= x 3\nget x"), Reply::ok("7"));
    }

    #[test]
    fn test_comparison_commands_are_not_modifiers() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run(">= 3 2"), Reply::ok("true"));
        assert_eq!(interp.run("!= a b"), Reply::ok("true"));
    }

    #[test]
    fn test_unknown_command() {
        let (mut interp, _) = interpreter();
        let reply = interp.run("nope 1");
        assert!(reply.is_error());
        assert!(reply.value().starts_with("<nope> unknown command"));
    }

    #[test]
    fn test_return_stops_body() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("return early\nerror late"), Reply::ok("early"));
    }

    #[test]
    fn test_variables_fall_back_to_db_root() {
        let (mut interp, _) = interpreter();
        assert_eq!(interp.run("db set greeting hi\nset r $greeting"), Reply::ok("hi"));
    }

    fn first(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
        Reply::ok("first")
    }

    fn second(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
        Reply::ok("second")
    }

    #[test]
    fn test_scoped_handle_restores_previous() {
        let (mut interp, _) = interpreter();
        let first = Handle {
            target: HandleTarget::Command(Arc::new(first)),
            help: String::new(),
        };
        let second = Handle {
            target: HandleTarget::Command(Arc::new(second)),
            help: String::new(),
        };
        interp.add_handle("h", first);
        let inner = interp.with_handle("h", second, |interp| interp.run("h"));
        assert_eq!(inner, Reply::ok("second"));
        assert_eq!(interp.run("h"), Reply::ok("first"));
    }
}
