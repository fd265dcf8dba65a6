use indoc::indoc;
use std::sync::Arc;
use tclish_core::{CollectingSink, Interpreter, InterpreterConfig, Reply};

fn interpreter() -> Interpreter {
    Interpreter::new(InterpreterConfig::default()).unwrap()
}

fn run(source: &str) -> Reply {
    interpreter().run(source)
}

// ============================================================================
// Procedures and recursion
// ============================================================================

#[test]
fn test_recursive_procedure() {
    let source = indoc! {"
        proc fact {n} {
            if {<= $n 1} {return 1}
            * $n [fact [- $n 1]]
        }
        fact 10
    "};
    assert_eq!(run(source), Reply::ok("3628800"));
}

#[test]
fn test_runaway_recursion_hits_stack_limit() {
    let config = InterpreterConfig {
        stack_limit: 16,
        ..InterpreterConfig::default()
    };
    let mut interp = Interpreter::new(config).unwrap();
    let reply = interp.run("defproc forever {forever}\nforever");
    assert!(reply.is_error());
    assert!(reply.value().contains("stack limit exceeded"));
}

#[test]
fn test_return_stops_the_procedure_only() {
    let source = indoc! {"
        defproc early {
            return first
            error unreachable
        }
        set r [early]
        join $r -done
    "};
    assert_eq!(run(source), Reply::ok("first-done"));
}

// ============================================================================
// Substitution
// ============================================================================

#[test]
fn test_quoted_substitution() {
    let source = indoc! {r#"
        set name world
        set n 2
        "hello $name, [+ $n 1] times\t!"
    "#};
    assert_eq!(run(source), Reply::ok("hello world, 3 times\t!"));
}

#[test]
fn test_braces_are_literal() {
    assert_eq!(run("set a 1\nreturn {$a [b]}"), Reply::ok("$a [b]"));
}

#[test]
fn test_splat_expands_list() {
    assert_eq!(run("+ {*} [list 1 2 3]"), Reply::ok("6"));
}

#[test]
fn test_modifier_updates_variable() {
    let source = indoc! {"
        set total 10
        += total 5
        get total
    "};
    assert_eq!(run(source), Reply::ok("15"));
}

#[test]
fn test_database_root_is_visible_as_variables() {
    assert_eq!(run("db set motd hi\nreturn $motd"), Reply::ok("hi"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_command_error_carries_stack() {
    let reply = run("defproc outer {missing-command}\nouter");
    let text = reply.value();
    assert!(text.starts_with("<missing-command> unknown command"));
    assert!(text.contains("stack:"));
}

#[test]
fn test_try_recovers() {
    let source = indoc! {"
        try {error failed} catch {
            return [join recovered: [args 1]]
        }
    "};
    let reply = run(source);
    assert!(reply.value().starts_with("recovered:<error> failed"));
}

#[test]
fn test_unbalanced_source_is_an_error() {
    assert!(run("set a [list 1 2").is_error());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_print_goes_to_sink() {
    let sink = Arc::new(CollectingSink::new());
    let mut interp = Interpreter::with_output(InterpreterConfig::default(), sink.clone()).unwrap();
    let source = indoc! {"
        foreach {x} in {a b c} {
            print $x
        }
    "};
    interp.run(source);
    assert_eq!(sink.take(), "a\nb\nc\n");
}

#[test]
fn test_host_command() {
    let mut interp = interpreter();
    interp
        .add_command(
            "shout",
            |_, _, args: &[String]| Reply::Ok(args.join(" ").to_uppercase()),
            "shouts",
        )
        .unwrap();
    assert_eq!(interp.run("shout hello there"), Reply::ok("HELLO THERE"));
    assert_eq!(interp.run("help shout"), Reply::ok("shouts"));
    assert!(interp.add_command("shout", |_, _, _: &[String]| Reply::empty(), "").is_err());
}
