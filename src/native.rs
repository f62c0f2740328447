use std::collections::HashMap;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::callable::bind_arguments;
use crate::prelude::*;

type NativeBody = fn(&Token, &HashMap<String, Value>) -> Result<Value, RuntimeError>;

/// Adapter wrapping a host-implemented procedure in the shared call
/// protocol. Arguments go through the exact same positional/named binding
/// as user functions; the body then receives the bound name-to-value map
/// together with the call site token for error reporting.
#[derive(Debug)]
pub struct NativeFunction {
    name: &'static str,
    params: Vec<&'static str>,
    min_arity: usize,
    max_arity: usize,
    body: NativeBody,
}

impl NativeFunction {
    pub fn new(
        name: &'static str,
        params: &[&'static str],
        min_arity: usize,
        max_arity: usize,
        body: NativeBody,
    ) -> Self {
        Self {
            name,
            params: params.to_vec(),
            min_arity,
            max_arity,
            body,
        }
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn min_arity(&self) -> usize {
        self.min_arity
    }

    fn max_arity(&self) -> usize {
        self.max_arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<EvaluatedArg>,
    ) -> Result<Value, RuntimeError> {
        let scope = bind_arguments(&self.params, arguments)?;
        (self.body)(paren, &scope.into_values())
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// The set of native functions handed to an interpreter at startup. Built
/// explicitly and passed in; there is no process-wide registry.
pub struct NativeRegistry {
    functions: Vec<Rc<NativeFunction>>,
}

impl NativeRegistry {
    pub fn empty() -> Self {
        Self { functions: vec![] }
    }

    /// clock, print, input, int, str, type.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(NativeFunction::new("clock", &[], 0, 0, clock));
        registry.register(NativeFunction::new("print", &["value"], 1, 1, print));
        registry.register(NativeFunction::new("input", &["prompt"], 0, 1, input));
        registry.register(NativeFunction::new("int", &["text"], 1, 1, int));
        registry.register(NativeFunction::new("str", &["value"], 1, 1, str_));
        registry.register(NativeFunction::new("type", &["value"], 1, 1, type_));
        registry
    }

    pub fn register(&mut self, function: NativeFunction) {
        self.functions.push(Rc::new(function));
    }

    pub fn functions(&self) -> &[Rc<NativeFunction>] {
        &self.functions
    }
}

/// Pull a string-typed argument out of the bound map, or fail with the
/// argument-type error naming the callee and parameter.
fn string_arg(
    token: &Token,
    args: &HashMap<String, Value>,
    callee: &'static str,
    param: &'static str,
) -> Result<Option<String>, RuntimeError> {
    match args.get(param) {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.clone())),
        Some(other) => Err(RuntimeError::InvalidArgumentType {
            token: token.clone(),
            callee: callee.to_owned(),
            param: param.to_owned(),
            expected: "a string",
            found: other.type_name(),
        }),
    }
}

fn clock(_token: &Token, _args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    let start = SystemTime::now();
    let since_epoch = start.duration_since(UNIX_EPOCH).expect("Time went backward");

    Ok(Value::Float(since_epoch.as_millis() as f64 / 1000.0))
}

fn print(_token: &Token, args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    if let Some(value) = args.get("value") {
        println!("{value}");
    }

    Ok(Value::Null)
}

fn input(token: &Token, args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    if let Some(prompt) = string_arg(token, args, "input", "prompt")? {
        print!("{prompt}");
        let _ = io::stdout().flush();
    }

    // A closed or failing stdin reads as null.
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Ok(Value::Null),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
            }
            Ok(Value::Str(line))
        }
    }
}

fn int(token: &Token, args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    let text = match string_arg(token, args, "int", "text")? {
        Some(text) => text,
        None => return Ok(Value::Null),
    };

    // Unparsable text yields null rather than an error.
    Ok(text
        .trim()
        .parse::<i64>()
        .map(Value::Int)
        .unwrap_or(Value::Null))
}

fn str_(_token: &Token, args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    match args.get("value") {
        Some(value) => Ok(Value::Str(value.to_string())),
        None => Ok(Value::Null),
    }
}

fn type_(_token: &Token, args: &HashMap<String, Value>) -> Result<Value, RuntimeError> {
    match args.get("value") {
        Some(value) => Ok(Value::Str(value.type_name().to_owned())),
        None => Ok(Value::Null),
    }
}
