#![allow(clippy::new_without_default)]
#![allow(ambiguous_wide_pointer_comparisons)]

mod ast;
mod callable;
mod environment;
mod error;
mod func;
mod interpreter;
mod native;
mod parser;
mod scanner;
mod token;
mod value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::callable::{Callable, EvaluatedArg};
    pub use crate::environment::Environment;
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interpreter::{Flow, Interpreter};
    pub use crate::native::{NativeFunction, NativeRegistry};
    pub use crate::parser::Parser;
    pub use crate::scanner::Scanner;
    pub use crate::token::*;
    pub use crate::value::Value;
    pub use crate::Shared;
}

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use prelude::{Expr, Interpreter, ParseError, Parser, RuntimeError, Scanner, Stmt, Value};

pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedErrorReporter = Shared<ErrorReporter>;

/// The execution driver: wires scanner, parser and interpreter together and
/// owns the top-level error boundary. Batch runs halt on error (the binary
/// maps the flags to exit codes); the prompt reports and keeps reading.
pub struct Quill {
    interpreter: Interpreter,
    error_reporter: SharedErrorReporter,
}

impl Quill {
    pub fn new() -> Self {
        let error_reporter = Rc::new(RefCell::new(ErrorReporter::default()));

        Self {
            interpreter: Interpreter::new().with_error_reporting(error_reporter.clone()),
            error_reporter,
        }
    }

    pub fn had_error(&self) -> bool {
        self.error_reporter.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.error_reporter.borrow().had_runtime_error
    }
}

impl Quill {
    pub fn run_file(&mut self, filename: &str) -> Result<(), anyhow::Error> {
        let content = std::fs::read_to_string(filename)?;
        self.run(content.as_ref())
    }

    pub fn run_prompt(&mut self) -> Result<(), anyhow::Error> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            write!(stdout, "> ")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(());
            }

            self.run_line(&line);
            // One bad line must not poison the session.
            self.error_reporter.borrow_mut().reset();
        }
    }

    pub fn run(&mut self, input: &str) -> Result<(), anyhow::Error> {
        if let Some(statements) = self.prepare(input) {
            self.interpreter.interpret(&statements);
        }

        Ok(())
    }

    /// Run one interactive line. A line holding a single expression
    /// statement gets its result echoed in the formatted display form.
    fn run_line(&mut self, input: &str) {
        let Some(statements) = self.prepare(input) else {
            return;
        };

        if let [Stmt::Expression { expr }] = &statements[..] {
            match self.evaluate(expr) {
                Ok(value) => {
                    if value != Value::Null {
                        println!("{}", value.echo());
                    }
                }
                Err(e) => self.error_reporter.borrow_mut().runtime_error(&e),
            }
        } else {
            self.interpreter.interpret(&statements);
        }
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        self.interpreter.evaluate_expr(expr)
    }

    fn prepare(&mut self, input: &str) -> Option<Vec<Stmt>> {
        let mut scanner = Scanner::new(input);
        let tokens = match scanner.scan_tokens() {
            Ok(tokens) => tokens,
            Err(errors) => {
                self.print_parse_errors(errors);
                return None;
            }
        };

        let mut parser = Parser::new(tokens);
        match parser.parse() {
            Ok(stmts) => Some(stmts),
            Err(errors) => {
                self.print_parse_errors(errors);
                None
            }
        }
    }

    fn print_parse_errors(&mut self, errors: Vec<ParseError>) {
        let mut reporter = self.error_reporter.borrow_mut();
        for e in errors {
            reporter.parse_error(&e);
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl ErrorReporter {
    pub fn parse_error(&mut self, e: &ParseError) {
        eprintln!("Error: {e}");
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, e: &RuntimeError) {
        eprintln!("{e}");
        self.had_runtime_error = true;
    }

    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
