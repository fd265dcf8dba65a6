use super::Builtin;
use crate::interpreter::Interpreter;
use crate::reply::Reply;
use crate::task::Task;
use crate::text::{is_true, to_number, Number};
use std::cmp::Ordering;
use std::collections::HashSet;

pub const COMMANDS: &[Builtin] = &[
    ("floor", floor, HELP_FLOOR),
    ("ceil", ceil, HELP_CEIL),
    ("number?", is_number, HELP_NUMBER),
    ("integer?", is_integer, HELP_INTEGER),
    (">", greater, HELP_GT),
    (">=", greater_equal, HELP_GE),
    ("==", numeric_equal, HELP_NUM_EQ),
    ("<=", less_equal, HELP_LE),
    ("<", less, HELP_LT),
    ("=", string_equal, HELP_STR_EQ),
    ("!=", distinct, HELP_NE),
    ("!", not, HELP_NOT),
    ("round", round, HELP_ROUND),
    ("and", and, HELP_AND),
    ("or", or, HELP_OR),
    ("+", add, HELP_ADD),
    ("*", multiply, HELP_MUL),
    ("/", divide, HELP_DIV),
    ("-", subtract, HELP_SUB),
    ("%", modulo, HELP_MOD),
];

/// Keep integers exact, fall back to floats on overflow
fn int_or_float(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y)
            .map(Number::Int)
            .unwrap_or_else(|| Number::Float(float_op(x as f64, y as f64))),
        _ => Number::Float(float_op(a.as_f64(), b.as_f64())),
    }
}

/// Integral result of floor/ceil/round
fn integral(x: f64) -> Number {
    if x.is_finite() && x.abs() < i64::MAX as f64 {
        Number::Int(x as i64)
    } else {
        Number::Float(x)
    }
}

fn compare_chain(
    task: &Task,
    args: &[String],
    label: &str,
    holds: fn(Ordering) -> bool,
) -> Reply {
    let Some(first) = args.first() else {
        return Reply::empty();
    };
    let Some(mut prev) = to_number(first) else {
        return task.error("all arguments must be numbers, first is not", label);
    };

    for (i, arg) in args.iter().enumerate().skip(1) {
        let Some(n) = to_number(arg) else {
            return task.error(
                format!("all arguments must be numbers, arg {} is not", i + 1),
                label,
            );
        };
        if !prev.compare(n).is_some_and(holds) {
            return Reply::empty();
        }
        prev = n;
    }
    Reply::boolean(true)
}

fn greater(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    compare_chain(task, args, ">", Ordering::is_gt)
}

fn greater_equal(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    compare_chain(task, args, ">=", Ordering::is_ge)
}

fn numeric_equal(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    compare_chain(task, args, "==", Ordering::is_eq)
}

fn less_equal(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    compare_chain(task, args, "<=", Ordering::is_le)
}

fn less(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    compare_chain(task, args, "<", Ordering::is_lt)
}

fn string_equal(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("= requires at least two arguments", "=");
    }
    Reply::boolean(args[1..].iter().all(|a| *a == args[0]))
}

fn distinct(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("!= requires at least two arguments", "!=");
    }
    let unique: HashSet<&String> = args.iter().collect();
    Reply::boolean(unique.len() == args.len())
}

fn not(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    match args.first() {
        Some(value) => Reply::boolean(!is_true(value)),
        None => task.error("! requires at least one argument", "!"),
    }
}

fn is_number(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::boolean(args.first().and_then(|a| to_number(a)).is_some())
}

fn is_integer(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::boolean(
        args.first()
            .and_then(|a| to_number(a))
            .is_some_and(Number::is_integral),
    )
}

fn rounding(task: &Task, args: &[String], label: &str, op: fn(f64) -> f64) -> Reply {
    let Some(arg) = args.first() else {
        return task.error(format!("{} requires at least one argument", label), label);
    };
    match to_number(arg) {
        Some(Number::Float(x)) => Reply::Ok(integral(op(x)).to_string()),
        Some(n) => Reply::Ok(n.to_string()),
        None => task.error("Invalid input, must be a number", label),
    }
}

fn floor(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    rounding(task, args, "floor", f64::floor)
}

fn ceil(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    rounding(task, args, "ceil", f64::ceil)
}

fn round(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    rounding(task, args, "round", f64::round_ties_even)
}

fn and(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::boolean(args.iter().all(|a| is_true(a)))
}

fn or(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    Reply::boolean(args.iter().any(|a| is_true(a)))
}

fn add(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    let total = args
        .iter()
        .filter_map(|a| to_number(a))
        .fold(Number::Int(0), |acc, n| {
            int_or_float(acc, n, i64::checked_add, |x, y| x + y)
        });
    Reply::Ok(total.to_string())
}

fn multiply(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Reply {
    let product = args
        .iter()
        .filter_map(|a| to_number(a))
        .fold(Number::Int(1), |acc, n| {
            int_or_float(acc, n, i64::checked_mul, |x, y| x * y)
        });
    Reply::Ok(product.to_string())
}

fn divide(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(first) = args.first().and_then(|a| to_number(a)) else {
        return task.error("/ needs at least one number to divide", "/");
    };
    let mut quotient = first.as_f64();
    for n in args[1..].iter().filter_map(|a| to_number(a)) {
        if n.as_f64() == 0.0 {
            return task.error("division by zero", "/");
        }
        quotient /= n.as_f64();
    }
    Reply::Ok(Number::Float(quotient).to_string())
}

fn subtract(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(first) = args.first() else {
        return task.error("- must be given at least 1 number", "-");
    };
    let Some(first) = to_number(first) else {
        return task.error("cannot negate non-numbers", "-");
    };

    if args.len() == 1 {
        let negated = match first {
            Number::Int(i) => i
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(i as f64))),
            Number::Float(f) => Number::Float(-f),
        };
        return Reply::Ok(negated.to_string());
    }

    let difference = args[1..]
        .iter()
        .filter_map(|a| to_number(a))
        .fold(first, |acc, n| {
            int_or_float(acc, n, i64::checked_sub, |x, y| x - y)
        });
    Reply::Ok(difference.to_string())
}

fn floor_mod_int(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn floor_mod_float(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn modulo(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("must be provided with two numbers", "%");
    }
    let Some(a) = to_number(&args[0]) else {
        return task.error("a must be a number", "%");
    };
    let Some(b) = to_number(&args[1]) else {
        return task.error("b must be a number", "%");
    };
    if b.as_f64() == 0.0 {
        return task.error("modulo by zero", "%");
    }
    let result = match (a, b) {
        (Number::Int(x), Number::Int(y)) => Number::Int(floor_mod_int(x, y).unwrap_or(0)),
        _ => Number::Float(floor_mod_float(a.as_f64(), b.as_f64())),
    };
    Reply::Ok(result.to_string())
}

const HELP_FLOOR: &str = "usage:
  floor <a>

rounds <a> down to an integer.
throws an error if <a> is a non-number";

const HELP_CEIL: &str = "usage:
  ceil <a>

rounds <a> up to an integer.
throws an error if <a> is a non-number";

const HELP_NUMBER: &str = "usage:
  number? <value>

returns true if <value> is a valid number";

const HELP_INTEGER: &str = "usage:
  integer? <value>

returns true if <value> is a valid integer";

const HELP_GT: &str = "usage:
  > <nums>...

returns true if every number is larger than the next one
throws an error if any argument is not a valid number";

const HELP_GE: &str = "usage:
  >= <nums>...

returns true if every number is larger than or equal to the next one
throws an error if any argument is not a valid number";

const HELP_NUM_EQ: &str = "usage:
  == <nums>...

returns true if all numbers are numerically equal
throws an error if any argument is not a valid number";

const HELP_LE: &str = "usage:
  <= <nums>...

returns true if every number is less than or equal to the next one
throws an error if any argument is not a valid number";

const HELP_LT: &str = "usage:
  < <nums>...

returns true if every number is smaller than the next one
throws an error if any argument is not a valid number";

const HELP_STR_EQ: &str = "usage:
  = <strs>...

take two or more strings and return true if they are all equal";

const HELP_NE: &str = "usage:
  != <strs>...

returns true if none of the provided strings are equal";

const HELP_NOT: &str = "usage:
  ! <value>

returns true if input is false (empty string)";

const HELP_ROUND: &str = "usage:
  round <value>

rounds the given input to the nearest integer, halves to even
throws an error if <value> is a non-number";

const HELP_AND: &str = "usage:
  and <values>...

returns true if all given arguments are true (non-empty strings)";

const HELP_OR: &str = "usage:
  or <values>...

returns true if at least one given argument is true (non-empty strings)";

const HELP_ADD: &str = "usage:
  + <values>...

returns a sum of all the inputs
non-numbers are ignored";

const HELP_MUL: &str = "usage:
  * <values>...

returns a product of all the inputs
non-numbers are ignored";

const HELP_DIV: &str = "usage:
  / <number> <values>...

returns the first number divided by the subsequent valid numbers
throws an error if the first number is invalid or a divisor is zero
subsequent non-numbers are ignored";

const HELP_SUB: &str = "usage:
(1) - <number>
(2) - <number> <numbers>...

(1) negates the numeric value of the input.
(2) subtracts the subsequent numbers from the first number.

subsequent non-numbers are ignored";

const HELP_MOD: &str = "usage:
  % a b

returns a modulo b, with the sign of b.
throws an error if either is a non-number or b is zero";

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
    fn test_chained_comparisons() {
        assert_eq!(run("> 3 2 1"), Reply::ok("true"));
        assert_eq!(run("> 3 3 1"), Reply::empty());
        assert_eq!(run(">= 3 3 1"), Reply::ok("true"));
        assert_eq!(run("< 1 2 3"), Reply::ok("true"));
        assert_eq!(run("<= 1 1 0"), Reply::empty());
        assert_eq!(run("== 2 2.0"), Reply::ok("true"));
        assert_eq!(run(">"), Reply::empty());
    }

    #[test]
    fn test_comparison_errors_name_the_argument() {
        assert!(run("< 1 x")
            .value()
            .starts_with("<<> all arguments must be numbers, arg 2 is not"));
        assert!(run("> x 1")
            .value()
            .starts_with("<>> all arguments must be numbers, first is not"));
    }

    #[test]
    fn test_string_equality() {
        assert_eq!(run("= a a a"), Reply::ok("true"));
        assert_eq!(run("!= a b c"), Reply::ok("true"));
        assert_eq!(run("!= a b a"), Reply::empty());
        assert!(run("= a").is_error());
    }

    #[test]
    fn test_not() {
        assert_eq!(run("! {}"), Reply::ok("true"));
        assert_eq!(run("! x"), Reply::empty());
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("+ 1 2 x 3.5"), Reply::ok("6.5"));
        assert_eq!(run("* 2 3"), Reply::ok("6"));
        assert_eq!(run("/ 7 2"), Reply::ok("3.5"));
        assert_eq!(run("/ 6 3"), Reply::ok("2"));
        assert_eq!(run("- 5"), Reply::ok("-5"));
        assert_eq!(run("- 10 1 2"), Reply::ok("7"));
        assert_eq!(run("+ 9223372036854775807 1"), Reply::ok("9223372036854775808"));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(run("/ 1 0").is_error());
        assert!(run("% 1 0").is_error());
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(run("% 7 3"), Reply::ok("1"));
        assert_eq!(run("% -7 3"), Reply::ok("2"));
        assert_eq!(run("% 7 -3"), Reply::ok("-2"));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(run("round 2.5"), Reply::ok("2"));
        assert_eq!(run("round 3.5"), Reply::ok("4"));
        assert_eq!(run("round -0.4"), Reply::ok("0"));
        assert_eq!(run("floor 2.7"), Reply::ok("2"));
        assert_eq!(run("ceil 2.1"), Reply::ok("3"));
        assert_eq!(run("floor 4"), Reply::ok("4"));
        assert!(run("floor x").is_error());
    }

    #[test]
    fn test_number_predicates() {
        assert_eq!(run("number? 1.5"), Reply::ok("true"));
        assert_eq!(run("number? abc"), Reply::empty());
        assert_eq!(run("integer? 2.0"), Reply::ok("true"));
        assert_eq!(run("integer? 2.5"), Reply::empty());
    }
}
