//! The standard library: math, list/control and string commands.

pub mod common;
pub mod math;
pub mod string;

use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use crate::reply::Reply;
use crate::task::Task;
use tracing::warn;

/// Plain function commands, registered from static tables
pub type BuiltinFn = fn(&mut Interpreter, &mut Task, &[String]) -> Reply;

/// A table entry: name, function, help text
pub type Builtin = (&'static str, BuiltinFn, &'static str);

/// Register every entry of `table`; names already taken are skipped
pub fn install(registry: &mut CommandRegistry, table: &[Builtin]) {
    for (name, func, help) in table {
        if let Err(e) = registry.add(name, *func, help) {
            warn!("Skipping builtin: {}", e);
        }
    }
}

pub fn register_all(registry: &mut CommandRegistry) {
    install(registry, math::COMMANDS);
    install(registry, common::COMMANDS);
    install(registry, string::COMMANDS);
}
