//! Built-in directives: the control forms every program can rely on, plus
//! the `help` command.

use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use crate::reply::Reply;
use crate::task::Task;
use crate::text::{self, is_true, nth, pack, to_integer};

pub type DirectiveFn = fn(&mut Interpreter, &mut Task, &[String]) -> Reply;

/// Directive names in the order they are listed by `help topics`
pub const DIRECTIVES: [&str; 9] = [
    "if", "return", "error", "get", "set", "args", "defproc", "true", "false",
];

pub fn lookup(name: &str) -> Option<DirectiveFn> {
    let directive: DirectiveFn = match name {
        "if" => directive_if,
        "return" => directive_return,
        "error" => directive_error,
        "get" => directive_get,
        "set" => directive_set,
        "args" => directive_args,
        "defproc" => directive_defproc,
        "true" => directive_true,
        "false" => directive_false,
        _ => return None,
    };
    Some(directive)
}

pub fn help_text(name: &str) -> Option<&'static str> {
    let text = match name {
        "true" => HELP_TRUE,
        "false" => HELP_FALSE,
        "if" => HELP_IF,
        "defproc" => HELP_DEFPROC,
        "args" => HELP_ARGS,
        "error" => HELP_ERROR,
        "return" => HELP_RETURN,
        "set" => HELP_SET,
        "get" => HELP_GET,
        "help" => HELP_HELP,
        _ => return None,
    };
    Some(text)
}

pub(crate) fn register_help(registry: &mut CommandRegistry) {
    // Only fails on a duplicate name, and this runs first on an empty registry
    let _ = registry.add("help", command_help, HELP_HELP);
}

fn directive_if(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let mut condition = nth(args, 0);
    let mut body = nth(args, 1);
    let mut pos = 2;
    loop {
        match interp.simple_eval(task, condition) {
            Reply::Ok(value) if is_true(&value) => return interp.simple_eval(task, body),
            abort if abort.is_abort() => return abort,
            _ => {}
        }

        loop {
            if pos >= args.len() {
                return Reply::empty();
            }
            let keyword = args[pos].to_lowercase();
            pos += 1;
            match keyword.as_str() {
                "else" => return interp.simple_eval(task, nth(args, pos)),
                "elif" | "elseif" => {
                    condition = nth(args, pos);
                    body = nth(args, pos + 1);
                    pos += 2;
                    break;
                }
                _ => {}
            }
        }
    }
}

fn directive_true(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::boolean(true)
}

fn directive_false(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::boolean(false)
}

fn directive_return(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Return(nth(args, 0).to_string())
}

fn directive_error(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args {
        [] => task.error("error", "error"),
        [message] => task.error(message, "error"),
        [message, label] => task.error(message, label),
        [rest @ .., label] => task.error(rest.join(" "), label),
    }
}

fn directive_get(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.first() {
        Some(name) => Reply::Ok(interp.get_value(name, Some(task))),
        None => task.error("get requires a variable name", "unspecified"),
    }
}

fn directive_set(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args {
        [] => task.error("set requires a variable name", "unspecified"),
        [name] => {
            task.unset(name);
            Reply::empty()
        }
        [name, value, ..] => {
            task.set(name.clone(), value.clone());
            Reply::ok(value.clone())
        }
    }
}

fn directive_args(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(first) = args.first() else {
        return task.error("Args requires a directive or an index", "unspecified");
    };
    let frame_args = task.args().to_vec();

    match first.to_lowercase().as_str() {
        "count" => Reply::Ok(frame_args.len().to_string()),
        "list" => {
            let default_stop = (frame_args.len() + 1).to_string();
            let start = args.get(1).map(String::as_str).unwrap_or("1");
            let stop = args.get(2).map(String::as_str).unwrap_or(&default_stop);
            let Some(start_index) = to_integer(start) else {
                return task.error(format!("{} is not a valid index", start), "unspecified");
            };
            let Some(stop_index) = to_integer(stop) else {
                return task.error(format!("{} is not a valid index", stop), "unspecified");
            };
            let range = text::slice_range(
                frame_args.len(),
                start_index.saturating_sub(1),
                stop_index.saturating_sub(1),
            );
            Reply::Ok(pack(&frame_args[range]))
        }
        "map" => {
            for (i, name) in args[1..].iter().enumerate() {
                let Some(value) = frame_args.get(i) else {
                    return task.error(
                        format!("argument <{}> at pos {} is missing", name, i + 1),
                        "args map",
                    );
                };
                task.set(name.clone(), value.clone());
            }
            Reply::empty()
        }
        _ => match to_integer(first) {
            Some(index) if index >= 1 => Reply::ok(nth(&frame_args, (index - 1) as usize)),
            Some(_) => Reply::empty(),
            None => task.error(format!("{} is not a valid index", first), "unspecified"),
        },
    }
}

fn directive_defproc(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error(
            "a procedure needs both a name and a body, and optionally a helpstring",
            "defproc",
        );
    }
    interp.add_definition(&args[0], &args[1], nth(args, 2));
    Reply::empty()
}

fn command_help(interp: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    let Some(topic) = args.first() else {
        return Reply::ok(HELP_HELP);
    };
    let topic_lower = topic.to_lowercase();
    let second = nth(args, 1).to_lowercase();

    if (topic_lower == "list" && second == "topics") || (topic_lower == "topics" && second == "list")
    {
        let names: Vec<&str> = interp
            .helps
            .keys()
            .map(String::as_str)
            .chain(DIRECTIVES)
            .chain(interp.commands.keys())
            .chain(interp.handles.keys().map(String::as_str))
            .chain(interp.definitions.keys().map(String::as_str))
            .collect();
        return Reply::Ok(pack(names));
    }

    if topic_lower == "topics" {
        let section = |title: &str, names: Vec<&str>| format!("{}:\n  {}", title, names.join("\n  "));
        let sections = [
            section("general topics", interp.helps.keys().map(String::as_str).collect()),
            section("directives", DIRECTIVES.to_vec()),
            section("commands", interp.commands.keys().collect()),
            section("handles", interp.handles.keys().map(String::as_str).collect()),
            section("definitions", interp.definitions.keys().map(String::as_str).collect()),
        ];
        return Reply::Ok(sections.join("\n"));
    }

    if let Some(handle) = interp.handles.get(topic) {
        return Reply::ok(handle.help.clone());
    }
    if let Some(text) = interp.helps.get(topic) {
        return Reply::ok(text.clone());
    }
    if let Some(text) = help_text(topic) {
        return Reply::ok(text);
    }
    if let Some(definition) = interp.definitions.get(topic) {
        return Reply::ok(definition.help.clone());
    }
    if let Some(text) = interp.objects.help(topic) {
        return Reply::Ok(text);
    }
    if let Some(text) = interp.commands.help(topic) {
        return Reply::ok(text);
    }
    Reply::Ok(format!("helpstring for topic '{}' doesn't exist", topic))
}

const HELP_TRUE: &str = "usage:
  true
return a value that is considered true in a boolean context.
";

const HELP_FALSE: &str = "usage:
  false
return a value that is considered false in a boolean context.
";

const HELP_IF: &str = "usage:
  if <condition> <body> [elif <condition> <body>]... [else <body>]

evaluates the first body whose condition is true.
elseif is accepted as a synonym for elif. else ends the chain,
anything after its body is ignored.

Example:
  if {> $x 0} {
    print \"x is positive\"
  } elif {< $x 0} {
    print \"x is negative\"
  } else {
    print \"x is zero\"
  }
";

const HELP_DEFPROC: &str = "usage:
  defproc <name> <body> [<helpstring>]

defines a command whose body reads its arguments with the args directive.

Example:
  defproc add {
    + [args 1] [args 2]
  } \"usage:
    add <a> <b>
  returns the sum of <a> and <b>\"
";

const HELP_ARGS: &str = "usage:
(1) args <index>
(2) args count
(3) args map <varname>...
(4) args list [start] [stop]

reads the arguments given to the current definition, numbered 1 to n.

(1) returns the argument at <index>, or an empty string past the end
(2) returns the number of arguments
(3) binds the arguments to the given names, failing if too few were passed
(4) returns the arguments from [start] up to but not including [stop]
    as a list; start defaults to 1 and stop to [args count]+1
";

const HELP_ERROR: &str = "usage:
  error [<message>] [<label>]

raises an error. with more than two arguments the last one is the label
and the rest are joined into the message.

Example:
  error \"This is an error message\"
";

const HELP_RETURN: &str = "usage:
  return [<value>]

returns a value, ending the execution in scope early.";

const HELP_SET: &str = "usage:
  set <name> [<value>]

set the value associated with <name> in the current scope.
without a value the name is removed from the current scope.";

const HELP_GET: &str = "usage:
  get <name>

return the value associated with <name>, searching outwards through the
enclosing scopes and finally the database root. missing names are empty.
";

const HELP_HELP: &str = "usage:
  help <topic>
  help topics
  help list topics

returns the helpstring for the specified topic
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;

    fn run(src: &str) -> Reply {
        Interpreter::new(InterpreterConfig::default())
            .unwrap()
            .run(src)
    }

    #[test]
    fn test_if_chain() {
        let src = "set x -2\nif {> $x 0} {set r pos} elseif {< $x 0} {set r neg} else {set r zero}";
        assert_eq!(run(src), Reply::ok("neg"));
        assert_eq!(run("if {false} {set r a}"), Reply::empty());
        assert_eq!(run("if {} {a} else {set r b} elif {true} {c}"), Reply::ok("b"));
    }

    #[test]
    fn test_error_labels() {
        assert!(run("error").value().starts_with("<error> error"));
        assert!(run("error oops").value().starts_with("<error> oops"));
        assert!(run("error oops mine").value().starts_with("<mine> oops"));
        assert!(run("error a b c lbl").value().starts_with("<lbl> a b c"));
    }

    #[test]
    fn test_args_list_extreme_bounds() {
        let src = "defproc f {args list -9223372036854775808}\nf a b";
        assert_eq!(run(src), Reply::ok("{'a''b'}"));
        let src = "defproc f {args list 1 -9223372036854775808}\nf a b";
        assert_eq!(run(src), Reply::ok("{}"));
    }

    #[test]
    fn test_args_forms() {
        let define = "defproc f {args list 2}\n";
        assert_eq!(run(&format!("{}f a b c", define)), Reply::ok("{'b''c'}"));
        assert_eq!(run("defproc f {args count}\nf a b c"), Reply::ok("3"));
        assert_eq!(run("defproc f {args 2}\nf a b"), Reply::ok("b"));
        assert_eq!(run("defproc f {args 5}\nf a b"), Reply::empty());
        assert!(run("defproc f {args x}\nf a").value().contains("x is not a valid index"));
    }

    #[test]
    fn test_args_map_missing() {
        let reply = run("defproc f {args map a b}\nf 1");
        assert!(reply
            .value()
            .starts_with("<args map> argument <b> at pos 2 is missing"));
    }

    #[test]
    fn test_set_without_value_unsets() {
        assert_eq!(run("set a 1\nset a\nget a"), Reply::empty());
    }

    #[test]
    fn test_help_lookup_order() {
        assert_eq!(run("help"), Reply::ok(HELP_HELP));
        assert_eq!(run("help if"), Reply::ok(HELP_IF));
        assert_eq!(run("defproc f {} {f help}\nhelp f"), Reply::ok("f help"));
        assert_eq!(
            run("help nothing"),
            Reply::ok("helpstring for topic 'nothing' doesn't exist")
        );
    }

    #[test]
    fn test_help_list_topics() {
        let reply = run("help list topics");
        let topics = text::unpack(reply.value());
        assert!(topics.iter().any(|t| t == "if"));
        assert!(topics.iter().any(|t| t == "help"));
        assert!(topics.iter().any(|t| t == "db"));
    }
}
