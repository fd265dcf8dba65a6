use super::Builtin;
use crate::interpreter::Interpreter;
use crate::reply::Reply;
use crate::task::Task;
use crate::text::{escape, is_true, nth, pack, to_integer, unpack};
use rand::seq::SliceRandom;

pub const COMMANDS: &[Builtin] = &[
    ("choose", choose, HELP_CHOOSE),
    ("range", range, HELP_RANGE),
    ("proc", proc, HELP_PROC),
    ("print", print, HELP_PRINT),
    ("puts", puts, HELP_PUTS),
    ("try", try_catch, HELP_TRY),
    ("eval", eval, HELP_EVAL),
    ("list", list, HELP_LIST),
    ("take", take, HELP_TAKE),
    ("lindex", lindex, HELP_LINDEX),
    ("lcount", lcount, HELP_LCOUNT),
    ("ljoin", ljoin, HELP_LJOIN),
    ("lappend", lappend, HELP_LAPPEND),
    ("lzip", lzip, HELP_LZIP),
    ("lzipmax", lzip, HELP_LZIPMAX),
    ("lzipmin", lzipmin, HELP_LZIPMIN),
    ("lmap", lmap, HELP_LMAP),
    ("lreduce", lreduce, HELP_LREDUCE),
    ("lfilter", lfilter, HELP_LFILTER),
    ("for", for_each_element, HELP_FOR),
    ("foreach", foreach, HELP_FOREACH),
];

fn print(interp: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    let mut line = args.join(" ");
    line.push('\n');
    interp.write_output(&line);
    Reply::empty()
}

fn puts(interp: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    interp.write_output(&args.concat());
    Reply::empty()
}

fn list(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::Ok(pack(args))
}

fn take(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("take require a list and a number", "take");
    }
    let items = unpack(&args[0]);
    let Some(count) = to_integer(&args[1]) else {
        return task.error(
            format!("take require a valid number, {} is not a valid number.", args[1]),
            "take",
        );
    };
    let taken = (0..count.max(0) as usize).map(|i| nth(&items, i));
    Reply::Ok(pack(taken))
}

fn lindex(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("lindex require a list and a number", "lindex");
    }
    let items = unpack(&args[0]);
    match to_integer(&args[1]) {
        Some(index) if index >= 1 => Reply::ok(nth(&items, (index - 1) as usize)),
        Some(_) => Reply::empty(),
        None => task.error(
            format!("lindex require a valid number, {} is not a valid number.", args[1]),
            "lindex",
        ),
    }
}

fn lcount(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.first() {
        Some(list) => Reply::Ok(unpack(list).len().to_string()),
        None => task.error("lcount require a list", "lcount"),
    }
}

fn ljoin(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.first() {
        Some(list) => Reply::Ok(unpack(list).join(nth(args, 1))),
        None => task.error("expected list", "ljoin"),
    }
}

fn lappend(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(list) = args.first() else {
        return task.error("expected list", "lappend");
    };
    let mut items = unpack(list);
    items.extend(args[1..].iter().cloned());
    Reply::Ok(pack(items))
}

/// Interleave lists up to the longest (padding with "") or the shortest
fn zip_lists(args: &[String], longest: bool) -> Reply {
    let lists: Vec<Vec<String>> = args.iter().map(|l| unpack(l)).collect();
    let lengths = lists.iter().map(Vec::len);
    let rows = if longest { lengths.max() } else { lengths.min() }.unwrap_or(0);

    let mut out = Vec::with_capacity(rows * lists.len());
    for i in 0..rows {
        for list in &lists {
            out.push(nth(list, i));
        }
    }
    Reply::Ok(pack(out))
}

fn lzip(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    zip_lists(args, true)
}

fn lzipmin(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    zip_lists(args, false)
}

fn try_catch(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(program) = args.first() else {
        return Reply::empty();
    };

    let mut handler = None;
    let mut call_args = Vec::new();
    let mut pos = 1;
    while pos < args.len() {
        let word = args[pos].to_lowercase();
        match word.as_str() {
            "catch" | "except" => {
                handler = Some(nth(args, pos + 1));
                pos += 2;
            }
            "args" => {
                call_args = unpack(nth(args, pos + 1));
                pos += 2;
            }
            _ => {
                if pos == 1 {
                    handler = Some(args[1].as_str());
                }
                pos += 1;
            }
        }
    }

    match interp.eval(task, program, call_args.clone(), None) {
        Reply::Error(error) => match handler {
            Some(handler) => {
                let mut handler_args = vec![error, program.clone()];
                handler_args.extend(call_args);
                interp.eval(task, handler, handler_args, None)
            }
            None => Reply::Ok(error),
        },
        other => other,
    }
}

fn eval(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.split_first() {
        Some((code, rest)) => interp.eval(task, code, rest.to_vec(), None),
        None => Reply::empty(),
    }
}

fn for_each_element(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 3 {
        return task.error("expected name, list and code", "for");
    }
    let (name, code) = (&args[0], &args[2]);

    let mut result = String::new();
    for (i, item) in unpack(&args[1]).into_iter().enumerate() {
        task.set(name.clone(), item);
        task.set("i", i.to_string());
        task.set("ans", result.clone());
        match interp.simple_eval(task, code) {
            Reply::Ok(value) => result = value,
            abort => return abort,
        }
    }
    Reply::Ok(result)
}

fn foreach(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let packed_names = nth(args, 0);
    let (values, body) = if nth(args, 1).eq_ignore_ascii_case("in") {
        (nth(args, 2), nth(args, 3))
    } else {
        (nth(args, 1), nth(args, 2))
    };

    let names = unpack(packed_names);
    if names.is_empty() {
        return task.error(
            format!("'{}' does not contain at least one name", packed_names),
            "foreach",
        );
    }
    let values = unpack(values);

    let mut result = String::new();
    let mut pos = 0;
    while pos < values.len() {
        for name in &names {
            task.set(name.clone(), nth(&values, pos));
            pos += 1;
        }
        match interp.simple_eval(task, body) {
            Reply::Ok(value) => result = value,
            abort => return abort,
        }
    }
    Reply::Ok(result)
}

fn lmap(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("expected list and code", "lmap");
    }
    let mut results = Vec::new();
    let mut previous = String::new();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        match interp.do_codebody(task, &args[1], vec![item, i.to_string(), previous]) {
            Reply::Ok(value) => {
                previous = value.clone();
                results.push(value);
            }
            abort => return abort,
        }
    }
    Reply::Ok(pack(results))
}

fn lreduce(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("expected list and code", "lreduce");
    }
    let mut accumulator = nth(args, 2).to_string();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        match interp.do_codebody(task, &args[1], vec![item, i.to_string(), accumulator]) {
            Reply::Ok(value) => accumulator = value,
            abort => return abort,
        }
    }
    Reply::Ok(accumulator)
}

fn lfilter(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("expected list and code", "lfilter");
    }
    let mut kept = Vec::new();
    let mut previous = String::new();
    for (i, item) in unpack(&args[0]).into_iter().enumerate() {
        match interp.do_codebody(task, &args[1], vec![item.clone(), i.to_string(), previous]) {
            Reply::Ok(value) => {
                if is_true(&value) {
                    kept.push(item);
                }
                previous = value;
            }
            abort => return abort,
        }
    }
    Reply::Ok(pack(kept))
}

fn proc(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 3 {
        return task.error(
            "a procedure needs a name, an argument list and a body, and optionally a helpstring",
            "proc",
        );
    }
    let params: Vec<String> = unpack(&args[1])
        .iter()
        .map(|p| format!("'{}'", escape(p)))
        .collect();
    let body = format!("args map {}\n{}", params.join(" "), args[2]);
    interp.add_definition(&args[0], &body, nth(args, 3));
    Reply::empty()
}

fn choose(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    match args.choose(&mut rand::thread_rng()) {
        Some(choice) => Reply::ok(choice.clone()),
        None => Reply::empty(),
    }
}

fn range(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let integer = |index: usize, what: &str| {
        to_integer(nth(args, index)).ok_or_else(|| task.error(format!("{} must be an integer", what), "range"))
    };

    let bounds = match args.len() {
        0 => return task.error("please specify a range", "range"),
        1 => integer(0, "stop").map(|stop| {
            if stop < 0 {
                (-1, -1, stop)
            } else {
                (1, 1, stop)
            }
        }),
        2 => integer(0, "start").and_then(|start| {
            let stop = integer(1, "stop")?;
            Ok((start, if start > stop { -1 } else { 1 }, stop))
        }),
        _ => integer(0, "start").and_then(|start| {
            let step = integer(1, "step")?;
            let stop = integer(2, "stop")?;
            Ok((start, step, stop))
        }),
    };
    let (start, step, stop) = match bounds {
        Ok(bounds) => bounds,
        Err(error) => return error,
    };
    if step == 0 {
        return task.error("step must not be zero", "range");
    }

    let mut values = Vec::new();
    let mut n = Some(start);
    while let Some(current) = n {
        if (step > 0 && current > stop) || (step < 0 && current < stop) {
            break;
        }
        values.push(current.to_string());
        n = current.checked_add(step);
    }
    Reply::Ok(pack(values))
}

const HELP_CHOOSE: &str = "usage:
  choose <options>...

Returns one of the provided options at random.
";

const HELP_RANGE: &str = "usage:
(1) range <n>
(2) range <start> <stop>
(3) range <start> <step> <stop>

Returns a list of integers, both ends inclusive.

(1) from 1 to <n>, or from -1 down to <n> when <n> is negative
(2) from <start> to <stop>, counting down when <start> is larger
(3) every <step> number from <start> to <stop>
";

const HELP_PROC: &str = "usage:
  proc <name> <arguments> <body> [<helpstring>]

Example:
  proc add {a b} {
    + $a $b
  } \"adds a and b\"

equivalent to:
  defproc add {
    args map a b
    + $a $b
  }
";

const HELP_PRINT: &str = "usage:
  print <value>...

Prints the values separated by spaces, followed by a newline.

Example:
  print \"Hello, world!\"
";

const HELP_PUTS: &str = "usage:
  puts <value>...

Prints the values without separators or newline.
";

const HELP_TRY: &str = "usage:
  try <code> [<handler>]
  try <code> [catch <handler>] [args <list>]

Evaluates <code> in a new scope with the given args.
If it fails and a handler is given, the handler is evaluated with the error
text as [args 1], the code as [args 2] and the args after that.
Without a handler the error text is returned as a normal value.

Example:
  try {
    error \"errormsg\"
  } catch {
    print \"code [args 2] failed with [args 1]\"
  }
";

const HELP_EVAL: &str = "usage:
  eval <code> [<args>...]

Evaluates <code> in a new scope where [args] are the given <args>.
";

const HELP_LIST: &str = "usage:
  list <element>...

Creates a list containing the specified elements.

Example:
  set myList [list 1 2 3 4]
";

const HELP_TAKE: &str = "usage:
  take <list> <count>

Returns the first <count> items from <list>, padded with empty strings when
<list> is shorter.
";

const HELP_LINDEX: &str = "usage:
  lindex <list> <index>

Returns the item at 1-based <index> in <list>, or an empty string.

Example:
  lindex [list 1 2 3] 2
returns:
  2
";

const HELP_LCOUNT: &str = "usage:
  lcount <list>

Returns the number of entries in <list>
";

const HELP_LJOIN: &str = "usage:
  ljoin <list> [<sep>]

Concatenates all the values in <list>, optionally separated by <sep>
";

const HELP_LAPPEND: &str = "usage:
  lappend <list> <items>...

Returns <list> with <items> appended.
";

const HELP_LZIP: &str = "usage:
  lzip <lists>...

Interleaves the elements of the lists, up to the length of the longest one.
Missing elements are padded with empty strings.

Example:
  lzip [list 1 2 3] [list a b c d]
returns:
  [list 1 a 2 b 3 c {} d]
";

const HELP_LZIPMAX: &str = "usage:
  lzipmax <lists>...

Same as lzip.
";

const HELP_LZIPMIN: &str = "usage:
  lzipmin <lists>...

Interleaves the elements of the lists, up to the length of the shortest one.

Example:
  lzipmin [list 1 2 3] [list a b c d]
returns:
  [list 1 a 2 b 3 c]
";

const HELP_LMAP: &str = "usage:
  lmap <list> <script>

Evaluates <script> for each element with args item, position and previous
result, and returns the results as a list.

Example:
  lmap $numbers {
    args map item index previous
    * $item $item
  }
";

const HELP_LREDUCE: &str = "usage:
  lreduce <list> <script> [<initial_value>]

Evaluates <script> for each element with args item, position and the
accumulated value, and returns the final accumulated value.

Example:
  lreduce $numbers {
    args map item position accumulator
    + $accumulator $item
  } 0
";

const HELP_LFILTER: &str = "usage:
  lfilter <list> <script>

Keeps the elements for which <script> returns true. The script gets the
item, its position and the previous result as args.
";

const HELP_FOR: &str = "usage:
  for <variable> <list> <script>

Evaluates <script> in the current scope for each element, with <variable>
set to the element, i to its 0-based position and ans to the previous
result.
";

const HELP_FOREACH: &str = "usage:
  foreach <var-names> [in] <list> <script>

Evaluates <script> in the current scope, assigning consecutive elements to
the names on each round.

Example:
  foreach {letter number} in {a 1 b 2} {
    print \"$letter: $number\"
  }
";

#[cfg(test)]
mod tests {
    use crate::config::InterpreterConfig;
    use crate::interpreter::Interpreter;
    use crate::output::CollectingSink;
    use crate::reply::Reply;
    use std::sync::Arc;

    fn run(src: &str) -> Reply {
        Interpreter::new(InterpreterConfig::default())
            .unwrap()
            .run(src)
    }

    #[test]
    fn test_print_and_puts() {
        let sink = Arc::new(CollectingSink::new());
        let mut interp =
            Interpreter::with_output(InterpreterConfig::default(), sink.clone()).unwrap();
        interp.run("print a b\nputs c d");
        assert_eq!(sink.contents(), "a b\ncd");
    }

    #[test]
    fn test_list_helpers() {
        assert_eq!(run("take [list a b] 3"), Reply::ok("{'a''b'''}"));
        assert_eq!(run("lindex [list a b c] 2"), Reply::ok("b"));
        assert_eq!(run("lindex [list a b c] 9"), Reply::empty());
        assert_eq!(run("lcount [list a b c]"), Reply::ok("3"));
        assert_eq!(run("ljoin [list a b c] -"), Reply::ok("a-b-c"));
        assert_eq!(run("lappend [list a] b"), Reply::ok("{'a''b'}"));
    }

    #[test]
    fn test_zips() {
        assert_eq!(
            run("lzip [list 1 2] [list a b c]"),
            Reply::ok("{'1''a''2''b''''c'}")
        );
        assert_eq!(
            run("lzipmin [list 1 2] [list a b c]"),
            Reply::ok("{'1''a''2''b'}")
        );
    }

    #[test]
    fn test_range() {
        assert_eq!(run("range 3"), Reply::ok("{'1''2''3'}"));
        assert_eq!(run("range -2"), Reply::ok("{'-1''-2'}"));
        assert_eq!(run("range 3 1"), Reply::ok("{'3''2''1'}"));
        assert_eq!(run("range 0 5 10"), Reply::ok("{'0''5''10'}"));
        assert!(run("range 1 0 5").is_error());
        assert!(run("range x").is_error());
    }

    #[test]
    fn test_try_forms() {
        assert!(run("try {error boom}").value().starts_with("<error> boom"));
        assert_eq!(run("try {error boom} {return handled}"), Reply::ok("handled"));
        assert_eq!(
            run("try {error boom} catch {args 3} args [list x]"),
            Reply::ok("x")
        );
        assert_eq!(run("try {+ 1 2} catch {return no}"), Reply::ok("3"));
    }

    #[test]
    fn test_eval_uses_new_scope() {
        assert_eq!(run("eval {args 2} a b"), Reply::ok("b"));
        assert_eq!(run("eval {set inner 1}\nget inner"), Reply::empty());
    }

    #[test]
    fn test_for_sets_index_and_ans() {
        assert_eq!(run("for x [list a b c] {+ $i 1}"), Reply::ok("3"));
        assert_eq!(run("for x [list a b] {join $ans $x}"), Reply::ok("ab"));
    }

    #[test]
    fn test_foreach_multiple_names() {
        let reply = run("set out {}\nforeach {k v} in {a 1 b 2} {set out \"$out$k=$v;\"}");
        assert_eq!(reply, Reply::ok("a=1;b=2;"));
    }

    #[test]
    fn test_higher_order() {
        assert_eq!(
            run("lmap [list 1 2 3] {* [args 1] 2}"),
            Reply::ok("{'2''4''6'}")
        );
        assert_eq!(
            run("lreduce [list 1 2 3] {+ [args 1] [args 3]} 10"),
            Reply::ok("16")
        );
        assert_eq!(
            run("lfilter [list 1 2 3 4] {== [% [args 1] 2] 0}"),
            Reply::ok("{'2''4'}")
        );
        assert!(run("lfilter [list 1] {error stop}").is_error());
    }

    #[test]
    fn test_codebody_accepts_command_name() {
        assert_eq!(
            run("proc double {x} {* $x 2}\nlmap [list 1 2] double"),
            Reply::ok("{'2''4'}")
        );
    }

    #[test]
    fn test_proc_maps_params() {
        assert_eq!(run("proc add {a b} {+ $a $b} {adds}\nadd 2 3"), Reply::ok("5"));
        assert_eq!(run("proc add {a b} {+ $a $b} {adds}\nhelp add"), Reply::ok("adds"));
    }

    #[test]
    fn test_choose_picks_an_option() {
        let reply = run("choose a b c");
        assert!(["a", "b", "c"].contains(&reply.value()));
        assert_eq!(run("choose"), Reply::empty());
    }
}
