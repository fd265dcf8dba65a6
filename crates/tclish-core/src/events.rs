//! Scheduled events, run by the host between evaluations.

use crate::db::journal::now_secs;
use crate::interpreter::Interpreter;
use crate::registry::CommandRegistry;
use crate::reply::Reply;
use crate::stdlib::{install, Builtin};
use crate::task::Task;
use crate::text::{pack, to_number};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Command run when an event fails
pub const ON_EVENT_ERROR: &str = "on-event-error";

#[derive(Debug, Clone)]
pub struct Event {
    pub due: f64,
    seq: u64,
    pub command: String,
    pub args: Vec<String>,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of events keyed by due time, then insertion order
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, due: f64, command: String, args: Vec<String>) {
        self.next_seq += 1;
        self.heap.push(Reverse(Event {
            due,
            seq: self.next_seq,
            command,
            args,
        }));
    }

    /// Remove the earliest event if it is due at `now`
    pub fn pop_due(&mut self, now: f64) -> Option<Event> {
        self.pop_due_through(now, u64::MAX)
    }

    /// Like `pop_due`, ignoring events queued after sequence number `last`
    fn pop_due_through(&mut self, now: f64, last: u64) -> Option<Event> {
        let next = &self.heap.peek()?.0;
        if next.due > now || next.seq > last {
            return None;
        }
        self.heap.pop().map(|Reverse(event)| event)
    }

    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(event)| event.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pending events in due order
    pub fn sorted(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.heap.iter().map(|Reverse(event)| event).collect();
        events.sort();
        events
    }
}

impl Interpreter {
    /// Queue `command` to run `delay` seconds from now
    pub fn push_event(&mut self, delay: f64, command: impl Into<String>, args: Vec<String>) {
        let command = command.into();
        debug!(delay, "Scheduled event {}", command);
        self.events.push(now_secs() + delay, command, args);
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Run up to `count` events that are due now, returning how many ran.
    /// Events queued while processing wait for the next call.
    pub fn process_events(&mut self, count: usize) -> usize {
        let now = now_secs();
        let last = self.events.next_seq;
        let mut processed = 0;
        while processed < count {
            let Some(event) = self.events.pop_due_through(now, last) else {
                break;
            };
            let mut task = self.new_task(&event.command);
            let reply = self.do_codebody(&mut task, &event.command, event.args.clone());
            if let Reply::Error(error) = reply {
                if event.command == ON_EVENT_ERROR {
                    warn!("Event handler failed: {}", error);
                } else {
                    let mut args = vec![event.command.clone(), error];
                    args.extend(event.args);
                    self.push_event(0.0, ON_EVENT_ERROR, args);
                }
            }
            processed += 1;
        }
        processed
    }
}

const COMMANDS: &[Builtin] = &[
    ("schedule-event", schedule_event, HELP_SCHEDULE_EVENT),
    ("push-event", push_event, HELP_PUSH_EVENT),
    ("list-events", list_events, HELP_LIST_EVENTS),
    ("time", time, HELP_TIME),
];

pub fn register(registry: &mut CommandRegistry) {
    install(registry, COMMANDS);
}

fn schedule_event(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    if args.len() < 2 {
        return task.error("timeout and event needed", "schedule-event");
    }
    let Some(delay) = to_number(&args[0]) else {
        return task.error("time must be a valid number of seconds", "schedule-event");
    };
    interp.push_event(delay.as_f64(), args[1].clone(), args[2..].to_vec());
    Reply::empty()
}

fn push_event(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some((command, rest)) = args.split_first() else {
        return task.error("event needed", "push-event");
    };
    interp.push_event(0.0, command.clone(), rest.to_vec());
    Reply::empty()
}

fn list_events(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    let events = interp.events.sorted();
    Reply::Ok(pack(
        events
            .iter()
            .flat_map(|event| [event.command.clone(), event.due.to_string()]),
    ))
}

fn time(_: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::Ok(now_secs().to_string())
}

const HELP_SCHEDULE_EVENT: &str = "usage:
  schedule-event <timeout> <command> <args>...

schedules <command> to run with <args> <timeout> seconds in the future.
when it fails, on-event-error is called with the command, the error and
the args.
";

const HELP_PUSH_EVENT: &str = "usage:
  push-event <command> <args>...

equivalent to schedule-event 0 <command> {*} <args>
";

const HELP_LIST_EVENTS: &str = "usage:
  list-events

returns a list of command and due time pairs, earliest first
";

const HELP_TIME: &str = "usage:
  time

returns the current time in seconds since 1970
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;
    use crate::text::unpack;

    fn interpreter() -> Interpreter {
        Interpreter::new(InterpreterConfig::default()).unwrap()
    }

    #[test]
    fn test_queue_orders_by_due_then_insertion() {
        let mut queue = EventQueue::new();
        queue.push(5.0, "late".to_string(), vec![]);
        queue.push(1.0, "first".to_string(), vec![]);
        queue.push(1.0, "second".to_string(), vec![]);
        assert_eq!(queue.pop_due(10.0).unwrap().command, "first");
        assert_eq!(queue.pop_due(10.0).unwrap().command, "second");
        assert!(queue.pop_due(4.0).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_push_event_runs_on_process() {
        let mut interp = interpreter();
        interp.run("push-event db set greeting hello");
        assert_eq!(interp.run("db get greeting"), Reply::empty());
        assert_eq!(interp.process_events(10), 1);
        assert_eq!(interp.run("db get greeting"), Reply::ok("hello"));
    }

    #[test]
    fn test_future_events_wait() {
        let mut interp = interpreter();
        interp.run("schedule-event 3600 db set later yes");
        assert_eq!(interp.process_events(10), 0);
        let listed = unpack(interp.run("list-events").value());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], "db");
    }

    #[test]
    fn test_failure_calls_on_event_error() {
        let mut interp = interpreter();
        interp.run("defproc on-event-error {db set failed [args 1]}");
        interp.run("push-event no-such-command x");
        assert_eq!(interp.process_events(10), 1);
        assert_eq!(interp.events().len(), 1);
        assert_eq!(interp.process_events(10), 1);
        assert_eq!(interp.run("db get failed"), Reply::ok("no-such-command"));
        assert!(interp.events().is_empty());
    }

    #[test]
    fn test_failing_handler_is_not_requeued() {
        let mut interp = interpreter();
        interp.push_event(0.0, ON_EVENT_ERROR, vec![]);
        assert_eq!(interp.process_events(10), 1);
        assert!(interp.events().is_empty());
    }

    #[test]
    fn test_schedule_needs_number() {
        let reply = interpreter().run("schedule-event soon print");
        assert!(reply
            .value()
            .starts_with("<schedule-event> time must be a valid number of seconds"));
    }
}
