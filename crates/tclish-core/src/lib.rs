pub mod config;
pub mod db;
pub mod directives;
pub mod events;
pub mod interpreter;
pub mod objects;
pub mod output;
pub mod registry;
pub mod reply;
pub mod scanner;
pub mod state;
pub mod stdlib;
pub mod task;
pub mod text;

pub use config::InterpreterConfig;
pub use db::{Database, DbError, DbTree};
pub use interpreter::Interpreter;
pub use output::{CollectingSink, OutputSink, StdoutSink};
pub use registry::{CommandFn, CommandRegistry};
pub use reply::Reply;
pub use state::{InterpreterState, StateError};
pub use task::Task;
