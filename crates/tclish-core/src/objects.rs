//! Classes and instances: `class`, `new`, `object` and instance commands.

use crate::interpreter::{Handle, HandleTarget, Interpreter, SPLAT};
use crate::registry::CommandRegistry;
use crate::reply::Reply;
use crate::scanner::extract_header;
use crate::stdlib::{install, Builtin};
use crate::task::Task;
use crate::text::{escape, nth, pack, unpack};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Declared class variable: validator command and initial value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarSpec {
    #[serde(rename = "type")]
    pub validator: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub vars: IndexMap<String, VarSpec>,
    pub methods: IndexMap<String, String>,
    #[serde(default)]
    pub constructor: String,
    #[serde(default)]
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: Option<String>,
    pub class: String,
    pub vars: IndexMap<String, String>,
}

/// Every class and live instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectRegistry {
    next_id: u64,
    objects: IndexMap<String, Instance>,
    named_objects: IndexMap<String, String>,
    classes: IndexMap<String, ClassDef>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an instance id or name to the instance id
    pub fn resolve(&self, id_or_name: &str) -> Option<&str> {
        if let Some((id, _)) = self.objects.get_key_value(id_or_name) {
            return Some(id.as_str());
        }
        let id = self.named_objects.get(id_or_name)?;
        self.objects.get_key_value(id).map(|(id, _)| id.as_str())
    }

    pub fn contains(&self, id_or_name: &str) -> bool {
        self.resolve(id_or_name).is_some()
    }

    pub fn instance(&self, id_or_name: &str) -> Option<&Instance> {
        self.objects.get(self.resolve(id_or_name)?)
    }

    fn instance_mut(&mut self, id: &str) -> Option<&mut Instance> {
        self.objects.get_mut(id)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    fn allocate_id(&mut self, class_name: &str) -> String {
        self.next_id += 1;
        format!("<instance-{}-{}>", class_name, self.next_id)
    }

    fn insert(&mut self, instance: Instance) {
        self.objects.insert(instance.id.clone(), instance);
    }

    fn bind_name(&mut self, name: &str, id: &str) {
        if let Some(instance) = self.objects.get_mut(id) {
            instance.name = Some(name.to_string());
        }
        self.named_objects.insert(name.to_string(), id.to_string());
    }

    /// Drop an instance; its name is released only if it still points here
    fn remove(&mut self, id: &str) {
        if let Some(instance) = self.objects.shift_remove(id) {
            if let Some(name) = instance.name {
                if self.named_objects.get(&name).map(String::as_str) == Some(id) {
                    self.named_objects.shift_remove(&name);
                }
            }
        }
    }

    /// Help text for an instance: its description
    pub fn help(&self, id_or_name: &str) -> Option<String> {
        self.show_object(id_or_name)
    }

    pub fn show_object(&self, id_or_name: &str) -> Option<String> {
        let instance = self.instance(id_or_name)?;
        let mut text = format!("id {}\nclass {}", instance.id, instance.class);
        if let Some(name) = &instance.name {
            text.push_str(&format!("\nname {}", name));
        }
        text.push_str("\nvars");
        for (key, value) in &instance.vars {
            text.push_str(&format!("\n  {} {}", key, value));
        }
        Some(text)
    }

    pub fn show_class(&self, class_name: &str) -> Option<String> {
        let class = self.classes.get(class_name)?;
        let mut text = format!("class {}", class_name);
        if !class.constructor.is_empty() {
            match extract_header(&class.constructor) {
                Some(params) => text.push_str(&format!(" {{ {} }}", params.join(" "))),
                None => text.push_str(" <args...>"),
            }
        }
        text.push_str("\nvars");
        for (key, spec) in &class.vars {
            text.push_str(&format!("\n  {} {} {}", key, spec.validator, spec.value));
        }
        text.push_str("\nmethods");
        for (key, body) in &class.methods {
            text.push_str(&format!("\n  {}", key));
            if let Some(params) = extract_header(body) {
                text.push_str(&format!(" {{ {} }}", params.join(" ")));
            }
        }
        Some(text)
    }

    /// `name id` pairs of the named instances, as a list
    pub fn named_list(&self) -> String {
        pack(
            self.named_objects
                .iter()
                .flat_map(|(name, id)| [name.as_str(), id.as_str()]),
        )
    }

    /// Merge a saved registry into this one; entries in `saved` win
    pub fn merge(&mut self, saved: ObjectRegistry) {
        self.next_id = self.next_id.max(saved.next_id);
        self.objects.extend(saved.objects);
        self.named_objects.extend(saved.named_objects);
        self.classes.extend(saved.classes);
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }
}

const COMMANDS: &[Builtin] = &[
    ("object", object_command, HELP_OBJECT),
    ("object-type", object_type, HELP_OBJECT_TYPE),
    ("named-objects", named_objects, HELP_NAMED_OBJECTS),
    ("objects", objects_command, HELP_OBJECTS),
    ("classes", classes, HELP_CLASSES),
    ("class", make_class, HELP_CLASS),
    ("new", instantiate, HELP_NEW),
];

pub fn register(registry: &mut CommandRegistry) {
    install(registry, COMMANDS);
}

/// Run `body` with `self` bound to the instance
fn eval_as(
    interp: &mut Interpreter,
    task: &mut Task,
    id: &str,
    body: &str,
    args: Vec<String>,
) -> Reply {
    let handle = Handle {
        target: HandleTarget::Instance(id.to_string()),
        help: interp.objects.show_object(id).unwrap_or_default(),
    };
    interp.with_handle("self", handle, |interp| interp.eval(task, body, args, None))
}

enum Invalid {
    Failed(String),
    Rejected,
}

/// Run a type validator against a value; an empty result rejects it
fn validate(
    interp: &mut Interpreter,
    task: &mut Task,
    validator: &str,
    value: &str,
) -> Result<(), Invalid> {
    let program = format!("{} {} [args list]", validator, SPLAT);
    match interp.eval(task, &program, vec![value.to_string()], None) {
        Reply::Ok(result) if result.is_empty() => Err(Invalid::Rejected),
        Reply::Ok(_) => Ok(()),
        failure => Err(Invalid::Failed(failure.into_value())),
    }
}

fn validation_error(
    task: &Task,
    invalid: Invalid,
    var: &str,
    validator: &str,
    value: &str,
    label: &str,
) -> Reply {
    match invalid {
        Invalid::Failed(error) => task.error(
            format!(
                "error in type validator {} <{}> = {}.\n{}",
                var, validator, value, error
            ),
            label,
        ),
        Invalid::Rejected => task.error(
            format!(
                "value is not valid for type {} <{}> = {}.",
                var, validator, value
            ),
            label,
        ),
    }
}

/// Dispatch a command sent to an instance (by id or name)
pub fn instance_command(
    interp: &mut Interpreter,
    task: &mut Task,
    target: &str,
    args: &[String],
) -> Reply {
    let Some(instance) = interp.objects.instance(target).cloned() else {
        return task.error(format!("object {} doesn't exist", target), "object");
    };
    let Some(class) = interp.objects.class(&instance.class).cloned() else {
        return task.error(
            format!("object is of class {} which doesn't exist.", instance.class),
            "object",
        );
    };
    let Some(directive) = args.first() else {
        return task.error("object needs a directive", "object");
    };
    let id = instance.id.as_str();

    match directive.as_str() {
        "get" => {
            let Some(var) = args.get(1) else {
                return task.error("object get needs a varname", "object");
            };
            match instance.vars.get(var) {
                Some(value) => Reply::ok(value.clone()),
                None => task.error(
                    format!("object {} has no member variable {}", id, var),
                    "object",
                ),
            }
        }
        "set" => {
            let Some(var) = args.get(1) else {
                return task.error("object set needs a varname", "object");
            };
            let Some(value) = args.get(2) else {
                return task.error("object set needs a value", "object");
            };
            if let Some(spec) = class.vars.get(var) {
                if let Err(invalid) = validate(interp, task, &spec.validator, value) {
                    return validation_error(task, invalid, var, &spec.validator, value, "object");
                }
            }
            match interp.objects.instance_mut(id) {
                Some(live) => {
                    live.vars.insert(var.clone(), value.clone());
                    Reply::empty()
                }
                None => task.error(format!("object {} was deleted", id), "object"),
            }
        }
        "id" => Reply::ok(id),
        "show" => Reply::Ok(interp.objects.show_object(id).unwrap_or_default()),
        "show-class" => Reply::Ok(interp.objects.show_class(&class.name).unwrap_or_default()),
        "class" => Reply::ok(instance.class.clone()),
        "delete" => {
            interp.objects.remove(id);
            debug!("Deleted {}", id);
            Reply::empty()
        }
        method => {
            if let Some(body) = class.methods.get(method) {
                return eval_as(interp, task, id, body, args[1..].to_vec());
            }
            match instance.vars.get(method) {
                Some(value) => Reply::ok(value.clone()),
                None => task.error(format!("directive {} is undefined", method), "object"),
            }
        }
    }
}

fn object_command(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(target) = args.first() else {
        return task.error("object command needs an id", "object");
    };
    instance_command(interp, task, target, args.get(2..).unwrap_or(&[]))
}

fn object_type(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(target) = args.first() else {
        return task.error("object-type needs an object id", "object-type");
    };
    match interp.objects.instance(target) {
        Some(instance) => Reply::ok(instance.class.clone()),
        None => Reply::empty(),
    }
}

fn named_objects(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::Ok(interp.objects.named_list())
}

fn objects_command(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::Ok(pack(interp.objects.ids()))
}

fn classes(interp: &mut Interpreter, _: &mut Task, _: &[String]) -> Reply {
    Reply::Ok(pack(interp.objects.class_names()))
}

fn make_class(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(class_name) = args.first() else {
        return task.error("class needs a name", "class");
    };
    let mut class = ClassDef {
        name: class_name.clone(),
        ..ClassDef::default()
    };

    let mut pos = 1;
    let mut take = |count: usize| {
        let words = args.get(pos..pos + count);
        pos += count;
        words
    };

    while let Some([keyword]) = take(1) {
        match keyword.to_lowercase().as_str() {
            "var" => {
                let Some([name, validator, value]) = take(3) else {
                    return task.error(
                        "var needs a name, a type validator and an initial value",
                        "class var",
                    );
                };
                class.vars.insert(
                    name.clone(),
                    VarSpec {
                        validator: validator.clone(),
                        value: value.clone(),
                    },
                );
            }
            "method" => {
                let Some([name, body]) = take(2) else {
                    return task.error("method needs a name and a body", "class method");
                };
                class.methods.insert(name.clone(), body.clone());
            }
            "proc" => {
                let Some([name, params, body]) = take(3) else {
                    return task.error(
                        "proc needs a name, a parameter list and a body",
                        "class proc",
                    );
                };
                let header: Vec<String> = unpack(params)
                    .iter()
                    .map(|p| format!("'{}'", escape(p)))
                    .collect();
                class
                    .methods
                    .insert(name.clone(), format!("args map {}\n{}", header.join(" "), body));
            }
            "constructor" => {
                let Some([body]) = take(1) else {
                    return task.error("constructor needs a body", "class constructor");
                };
                class.constructor = body.clone();
            }
            "helps" => {
                let Some([text]) = take(1) else {
                    return task.error("helps need a helpstring", "class helps");
                };
                class.help = text.clone();
            }
            _ => {}
        }
    }

    if !class.help.is_empty() {
        interp.add_help(class_name.clone(), class.help.clone());
    }
    debug!("Defined class {}", class_name);
    interp.objects.classes.insert(class_name.clone(), class);
    Reply::empty()
}

fn instantiate(interp: &mut Interpreter, task: &mut Task, args: &[String]) -> Reply {
    let Some(class_name) = args.first() else {
        return task.error("a class name is needed", "new");
    };
    let Some(class) = interp.objects.class(class_name).cloned() else {
        return task.error(format!("class {} does not exist", class_name), "new");
    };
    let name = args.get(1).filter(|n| !n.is_empty()).cloned();
    let rest = args.get(2..).unwrap_or(&[]);
    let label = format!("new {}", class_name);

    let mut instance = Instance {
        id: interp.objects.allocate_id(class_name),
        name: None,
        class: class_name.clone(),
        vars: class
            .vars
            .iter()
            .map(|(k, spec)| (k.clone(), spec.value.clone()))
            .collect(),
    };
    let id = instance.id.clone();

    if !class.constructor.is_empty() {
        interp.objects.insert(instance);
        let reply = eval_as(interp, task, &id, &class.constructor, rest.to_vec());
        if reply.is_abort() {
            interp.objects.remove(&id);
            return reply;
        }
        if let Some(name) = &name {
            interp.objects.bind_name(name, &id);
        }
        return reply;
    }

    for pair in rest.chunks(2) {
        let var = &pair[0];
        let value = nth(pair, 1);
        if let Some(spec) = class.vars.get(var) {
            if let Err(invalid) = validate(interp, task, &spec.validator, value) {
                return validation_error(task, invalid, var, &spec.validator, value, &label);
            }
        }
        instance.vars.insert(var.clone(), value.to_string());
    }

    interp.objects.insert(instance);
    if let Some(name) = &name {
        interp.objects.bind_name(name, &id);
    }
    Reply::Ok(id)
}

const HELP_OBJECT: &str = "usage:
  object <object-id> <ignored> [<args...>]

sends <args...> to the object, like [<object-name> <args...>]
";

const HELP_OBJECT_TYPE: &str = "usage:
  object-type <object-id>

returns the class of the object, or an empty string
";

const HELP_NAMED_OBJECTS: &str = "usage:
  named-objects

returns a list of name and object id pairs
";

const HELP_OBJECTS: &str = "usage:
  objects

returns the list of live object ids
";

const HELP_CLASSES: &str = "usage:
  classes

returns the list of defined classes
";

const HELP_CLASS: &str = r"usage:
  class <class-name> \
    [var <var-name> <type> <initial-value>]... \
    [method <method-name> <method-body>]... \
    [proc <method-name> <arguments> <method-body>]... \
    [constructor <constructor-body>] \
    [helps <help-text>]

defines a class.

var declares a variable. <type> is a validator command called with the new
value that returns an empty string when the value is invalid.
method declares a method whose body reads its arguments with args.
proc declares a method with named arguments.
constructor is evaluated by new with self bound to the instance.
helps adds a help topic named after the class.

Example:
  class counter \
    var count integer? 0 \
    constructor {
      self set count [args 1]
    } \
    method increment {
      self set count [+ 1 [self get count]]
      self get count
    } \
    proc add {n} {
      self set count [+ $n [self get count]]
    }

  new counter c 5
  c increment
  c get count
";

const HELP_NEW: &str = "usage:
  new <class name> [<instance name>] [<args...>]

creates an instance of <class name>, bound to <instance name> if given.
with a constructor, <args> are passed to it and its result is returned.
without one, <args> are <var> <value> pairs and the object id is returned.
";
