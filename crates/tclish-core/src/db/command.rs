use super::DbError;
use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use crate::reply::Reply;
use crate::stdlib::{install, Builtin};
use crate::task::Task;
use crate::text::{pack, to_integer, to_number};

const COMMANDS: &[Builtin] = &[("db", db_command, HELP_DB)];

pub fn register(registry: &mut CommandRegistry) {
    install(registry, COMMANDS);
}

fn unit_seconds(unit: &str) -> Option<f64> {
    let seconds = match unit {
        "second" | "seconds" => 1.0,
        "minute" | "minutes" => 60.0,
        "hour" | "hours" => 3_600.0,
        "day" | "days" => 86_400.0,
        "week" | "weeks" => 604_800.0,
        _ => return None,
    };
    Some(seconds)
}

/// Sum `<unit> <n>` pairs into seconds
fn parse_duration(task: &Task, args: &[String]) -> Result<f64, Reply> {
    let mut total = 0.0;
    let mut pos = 0;
    while pos < args.len() {
        let unit = args[pos].to_lowercase();
        let Some(scale) = unit_seconds(&unit) else {
            return Err(task.error(
                format!("duration {} is not a valid duration", args[pos]),
                "db revert",
            ));
        };
        let amount = args.get(pos + 1).map(String::as_str).unwrap_or("");
        let Some(n) = to_number(amount) else {
            return Err(task.error(
                format!(
                    "number {} (pos {}) is not a valid number of {}",
                    amount,
                    pos + 2,
                    unit.trim_end_matches('s')
                ),
                "db revert",
            ));
        };
        total += n.as_f64() * scale;
        pos += 2;
    }
    Ok(total)
}

fn db_command(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(sub) = args.first() else {
        return task.error("Missing command for 'db'.", "db");
    };
    let sub = sub.to_lowercase();
    let rest = &args[1..];
    let label = format!("db {}", sub);
    let db = &mut interp.db;

    let outcome: Result<Reply, DbError> = match sub.as_str() {
        "get" => Ok(Reply::Ok(db.get(rest))),
        "set" => match rest.split_last() {
            Some((value, keys)) => db.set(keys, value).map(|_| Reply::ok(value.clone())),
            None => return task.error("db set requires a value", &label),
        },
        "unset" => db.unset(rest).map(|_| Reply::empty()),
        "has" => Ok(Reply::boolean(db.has(rest))),
        "list" => Ok(Reply::Ok(pack(db.list(rest)))),
        "prune" => db.prune(rest).map(|_| Reply::empty()),
        "show" => Ok(Reply::Ok(db.show(rest))),
        "tree" => Ok(Reply::Ok(db.show_keys(rest))),
        "create-snapshot" => {
            let name = rest.first().map(String::as_str).unwrap_or("unnamed");
            db.create_snapshot(name).map(|_| Reply::empty())
        }
        "load-snapshot" => db
            .load_snapshot(rest.first().map(String::as_str))
            .map(|_| Reply::empty()),
        "list-snapshots" => {
            let limit = match rest.first() {
                Some(n) => match to_integer(n) {
                    Some(limit) => limit.max(0) as usize,
                    None => {
                        return task.error(
                            format!("{} is not a valid numerical limit", n),
                            &label,
                        )
                    }
                },
                None => 10,
            };
            db.list_snapshots(limit).map(|labels| Reply::Ok(pack(labels)))
        }
        "revert" => match parse_duration(task, rest) {
            Ok(seconds) => db.revert(seconds).map(|_| Reply::empty()),
            Err(error) => return error,
        },
        _ => {
            return task.error(format!("Error: Unknown 'db' command '{}'.", sub), "db");
        }
    };

    outcome.unwrap_or_else(|e| task.error(e, &label))
}

const HELP_DB: &str = "usage:
(1)  db get <fields...>
(2)  db set <fields...> <value>
(3)  db unset <fields...>
(4)  db has <fields...>
(5)  db list <fields...>
(6)  db prune <fields...>
(7)  db show <fields...>
(8)  db tree <fields...>
(9)  db create-snapshot [<name>]
(10) db load-snapshot [<name>]
(11) db list-snapshots [<limit>]
(12) db revert [<unit> <amount>]...

stores values under a path of keys. every node of the tree may hold a
value and have children.

(1)  reads a value, empty when missing
       db get user profile name
(2)  stores a value and returns it
       db set user profile name \"John Doe\"
(3)  removes a value, keeping the entries below it
(4)  returns true if a value is stored at the path
(5)  returns the list of keys directly below the path
(6)  deletes the entry and everything below it
(7)  prints the subtree with its values
(8)  prints the subtree keys, marking those holding a value with *

the remaining switches need a database opened from a file:

(9)  saves the current state as a snapshot, named unnamed by default
(10) loads the most recent snapshot with the given name, or the most recent
     snapshot when no name is given
(11) lists the <limit> most recent snapshots, 10 by default
(12) reverts the database by the sum of the given durations.
     units are seconds, minutes, hours, days and weeks
       db revert weeks 1 days 1
";
