use super::Builtin;
use crate::interpreter::Interpreter;
use crate::reply::Reply;
use crate::task::Task;
use crate::text::{escape, nth, pack, slice_range, to_integer};
use glob::Pattern;
use regex::Regex;

pub const COMMANDS: &[Builtin] = &[
    ("uuid", uuid, HELP_UUID),
    ("sub", substring, HELP_SUB),
    ("len", len, HELP_LEN),
    ("strip", strip, HELP_STRIP),
    ("lower", lower, HELP_LOWER),
    ("upper", upper, HELP_UPPER),
    ("split", split, HELP_SPLIT),
    ("join", join, HELP_JOIN),
    ("chars", chars, HELP_CHARS),
    ("escape", escape_command, HELP_ESCAPE),
    ("regex-match", regex_match, HELP_REGEX_MATCH),
    ("regex-test", regex_test, HELP_REGEX_TEST),
    ("glob-match", glob_match, HELP_GLOB_MATCH),
    ("glob-test", glob_test, HELP_GLOB_TEST),
];

/// Random version 4 uuid, hyphenated lowercase hex
fn uuid(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    Reply::Ok(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

fn substring(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(input) = args.first() else {
        return task.error("sub requires a string, a start index and a stop index", "sub");
    };
    let chars: Vec<char> = input.chars().collect();

    let start = match args.get(1) {
        Some(s) => match to_integer(s) {
            Some(n) => n,
            None => return task.error("start index must be a valid integer", "sub"),
        },
        None => 1,
    };
    let stop = match args.get(2) {
        Some(s) => match to_integer(s) {
            Some(n) => n,
            None => return task.error("stop index must be a valid integer", "sub"),
        },
        None => chars.len() as i64,
    };

    let range = slice_range(chars.len(), start.saturating_sub(1), stop);
    Reply::Ok(chars[range].iter().collect())
}

fn len(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(nth(args, 0).chars().count().to_string())
}

fn strip(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::ok(nth(args, 0).trim())
}

fn lower(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(nth(args, 0).to_lowercase())
}

fn upper(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(nth(args, 0).to_uppercase())
}

fn split(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error(
            "split requires a string to split, and a string to split it by",
            "split",
        );
    }
    if args[1].is_empty() {
        return task.error("empty separator", "split");
    }
    Reply::Ok(pack(args[0].split(args[1].as_str())))
}

fn join(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(args.concat())
}

fn chars(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.first() {
        Some(s) => Reply::Ok(pack(s.chars().map(String::from))),
        None => task.error("needs a string to split", "chars"),
    }
}

fn escape_command(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(escape(nth(args, 0)))
}

fn compile(task: &Task, pattern: &str, label: &str) -> Result<Regex, Reply> {
    Regex::new(pattern)
        .map_err(|e| task.error(format!("Error in regular expression: {}", e), label))
}

/// Every non-overlapping match: the whole match without groups, the group
/// with one group, the packed groups with several
fn find_all(regex: &Regex, input: &str) -> Vec<String> {
    let groups = regex.captures_len() - 1;
    regex
        .captures_iter(input)
        .map(|caps| {
            let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("");
            match groups {
                0 => group(0).to_string(),
                1 => group(1).to_string(),
                n => pack((1..=n).map(group)),
            }
        })
        .collect()
}

fn regex_match(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error(
            "regex-match requires a pattern and at least a string",
            "regex-match",
        );
    }
    let regex = match compile(task, &args[0], "regex-match") {
        Ok(regex) => regex,
        Err(error) => return error,
    };
    let matches = find_all(&regex, &args[1]);

    let Some(body) = args.get(2) else {
        return Reply::Ok(pack(matches));
    };
    let mut results = Vec::with_capacity(matches.len());
    for found in matches {
        task.set("match", found);
        match interp.simple_eval(task, body) {
            Reply::Error(e) => return Reply::Error(e),
            other => results.push(other.into_value()),
        }
    }
    Reply::Ok(pack(results))
}

fn regex_test(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("regex-test requires a pattern and a string", "regex-test");
    }
    match compile(task, &format!("^(?:{})", args[0]), "regex-test") {
        Ok(regex) => Reply::boolean(regex.is_match(&args[1])),
        Err(error) => error,
    }
}

fn glob_check(task: &Task, args: &[String], label: &str) -> Result<bool, Reply> {
    if args.len() < 2 {
        return Err(task.error(
            format!("{} requires a pattern and at least a string", label),
            label,
        ));
    }
    Pattern::new(&args[0])
        .map(|pattern| pattern.matches(&args[1]))
        .map_err(|e| task.error(format!("invalid glob pattern: {}", e), label))
}

fn glob_test(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match glob_check(task, args, "glob-test") {
        Ok(matched) => Reply::boolean(matched),
        Err(error) => error,
    }
}

fn glob_match(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match glob_check(task, args, "glob-match") {
        Ok(true) => Reply::ok(args[1].clone()),
        Ok(false) => Reply::empty(),
        Err(error) => error,
    }
}

const HELP_UUID: &str = "usage:
  uuid

Returns a random uuid in string form.";

const HELP_SUB: &str = "usage:
  sub <string> [<start>] [<stop>]

Returns the characters from <start> to <stop>, 1-based with both ends
inclusive. <start> defaults to 1 and <stop> to the end of the string.";

const HELP_LEN: &str = "usage:
  len <string>

Returns the number of characters in the given string.";

const HELP_STRIP: &str = "usage:
  strip <string>

Returns a copy of the string with leading and trailing whitespace removed.";

const HELP_LOWER: &str = "usage:
  lower <string>

Returns a lowercase version of the given string.";

const HELP_UPPER: &str = "usage:
  upper <string>

Returns an uppercase version of the given string.";

const HELP_SPLIT: &str = "usage:
  split <string> <separator>

Splits the string into a list of substrings using the specified separator.";

const HELP_JOIN: &str = "usage:
  join <string1> <string2> ...

Joins the given strings into a single string.";

const HELP_CHARS: &str = "usage:
  chars <string>

Returns a list of characters in the given string.";

const HELP_ESCAPE: &str = "usage:
  escape <string>

Escapes brackets, quotes and backslashes in a string.";

const HELP_REGEX_MATCH: &str = r#"usage:
  regex-match <pattern> <string> [<body>]

Returns a list of every match of <pattern> in <string>. With one capture
group the group is returned instead of the whole match, with several the
groups are returned as a list.
With a <body>, it is evaluated for each match with the variable match set,
and the results are returned as a list.

Example:
  regex-match {\d{3}-\d{4}} "555-1234 and 555-4321" {
    upper $match
  }
"#;

const HELP_REGEX_TEST: &str = r#"usage:
  regex-test <pattern> <string>

Returns true if <pattern> matches at the start of <string>.

Example:
  regex-test "abc.*" "abcdef"
"#;

const HELP_GLOB_MATCH: &str = r#"usage:
  glob-match <pattern> <string>

Returns <string> if it matches the glob-style pattern, otherwise an empty
string.

Example:
  glob-match "abc*" "abcdef"
"#;

const HELP_GLOB_TEST: &str = r#"usage:
  glob-test <pattern> <string>

Returns true if <string> matches the glob-style pattern.

Example:
  glob-test "abc*" "abcdef"
"#;

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::interpreter::Interpreter;
    use crate::reply::Reply;

    fn run(src: &str) -> Reply {
        Interpreter::new(InterpreterConfig::default())
            .unwrap()
            .run(src)
    }

    #[test]
    fn test_substring_is_inclusive() {
        assert_eq!(run("sub hello 2 4"), Reply::ok("ell"));
        assert_eq!(run("sub hello 2"), Reply::ok("ello"));
        assert_eq!(run("sub héllo 2 2"), Reply::ok("é"));
        assert!(run("sub hello x").is_error());
    }

    #[test]
    fn test_substring_extreme_bounds() {
        assert_eq!(run("sub abc -9223372036854775808"), Reply::ok("abc"));
        assert_eq!(run("sub abc 1 -9223372036854775808"), Reply::empty());
        assert_eq!(run("sub abc 9223372036854775807"), Reply::empty());
    }

    #[test]
    fn test_simple_string_commands() {
        assert_eq!(run("len héllo"), Reply::ok("5"));
        assert_eq!(run("strip {  a b  }"), Reply::ok("a b"));
        assert_eq!(run("upper abc"), Reply::ok("ABC"));
        assert_eq!(run("lower ABC"), Reply::ok("abc"));
        assert_eq!(run("join a b c"), Reply::ok("abc"));
        assert_eq!(run("split a,b,,c ,"), Reply::ok("{'a''b''''c'}"));
        assert_eq!(run("chars abc"), Reply::ok("{'a''b''c'}"));
        assert!(run("split abc {}").is_error());
    }

    #[test]
    fn test_regex_match_groups() {
        assert_eq!(run("regex-match {\\d+} {a1 b22 c333}"), Reply::ok("{'1''22''333'}"));
        assert_eq!(
            run("lindex [lindex [regex-match {(\\w)=(\\d)} {a=1 b=2}] 2] 1"),
            Reply::ok("b")
        );
        assert_eq!(run("regex-match {x(\\d)} {x1 x2}"), Reply::ok("{'1''2'}"));
    }

    #[test]
    fn test_regex_match_with_body() {
        assert_eq!(
            run("regex-match {[a-z]+} {ab cd} {upper $match}"),
            Reply::ok("{'AB''CD'}")
        );
    }

    #[test]
    fn test_regex_test_anchors_at_start() {
        assert_eq!(run("regex-test abc abcdef"), Reply::ok("true"));
        assert_eq!(run("regex-test bcd abcdef"), Reply::empty());
        assert!(run("regex-test {(} x").is_error());
    }

    #[test]
    fn test_glob() {
        assert_eq!(run("glob-test {abc*} abcdef"), Reply::ok("true"));
        assert_eq!(run("glob-match {a?c} abc"), Reply::ok("abc"));
        assert_eq!(run("glob-match {a?c} abd"), Reply::empty());
    }

    #[test]
    fn test_uuid_shape() {
        let reply = run("uuid");
        assert_eq!(reply.value().len(), 36);
        assert_eq!(reply.value().matches('-').count(), 4);
        assert_eq!(&reply.value()[14..15], "4");
        assert_ne!(run("uuid"), reply);
    }
}
