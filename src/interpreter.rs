use std::cell::RefCell;
use std::rc::Rc;

use crate::func::Function;
use crate::native::NativeRegistry;
use crate::prelude::*;
use crate::SharedErrorReporter;

type EvalResult = Result<Value, RuntimeError>;

/// Outcome of executing one statement. Loop control and `return` travel
/// through this tag instead of unwinding: every non-loop statement hands a
/// non-`Normal` tag straight back to its caller, so the innermost enclosing
/// loop is always the one that sees `Break` or `Continue`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Debug)]
pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    error_reporter: Option<SharedErrorReporter>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_natives(NativeRegistry::standard())
    }

    /// Build an interpreter whose globals hold exactly the given natives.
    pub fn with_natives(registry: NativeRegistry) -> Self {
        let globals = Environment::new().as_shared();
        let environment = globals.clone();

        for function in registry.functions() {
            globals
                .borrow_mut()
                .define(function.name(), Value::Callable(function.clone()));
        }

        Self {
            globals,
            environment,
            error_reporter: None,
        }
    }

    pub fn with_error_reporting(self, error_reporter: SharedErrorReporter) -> Self {
        Self {
            error_reporter: Some(error_reporter),
            ..self
        }
    }
}

impl Interpreter {
    pub fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Grouping { expr: inner } => self.evaluate_expr(inner.as_ref()),
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, operator, right),
            Expr::Variable { name } => self.environment.borrow().get(name),
            Expr::Assignment { name, value } => {
                let value = self.evaluate_expr(value.as_ref())?;
                self.environment.borrow_mut().assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Get { object, name } => {
                let object = self.evaluate_expr(object)?;
                object.get_property(name)
            }
            Expr::Logical { left, operator, right } => {
                let left_val = self.evaluate_expr(left)?;

                if operator.token_type == TokenType::Or {
                    if self.is_truthy(&left_val) {
                        return Ok(left_val);
                    }
                } else {
                    // TokenType::And
                    if !self.is_truthy(&left_val) {
                        return Ok(left_val);
                    }
                }

                self.evaluate_expr(right)
            }
            Expr::Call { callee, paren, arguments } => self.evaluate_call(callee, paren, arguments),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Argument],
    ) -> EvalResult {
        let callee = self.evaluate_expr(callee)?;

        let callable = match callee {
            Value::Callable(callable) => callable,
            _ => {
                return Err(RuntimeError::InvalidOperand {
                    operator: paren.clone(),
                    message: "Can only call functions".to_owned(),
                })
            }
        };

        // Arity is checked before any argument is bound.
        let supplied = arguments.len();
        if supplied < callable.min_arity() || supplied > callable.max_arity() {
            return Err(RuntimeError::ArityMismatch {
                paren: paren.clone(),
                callee: callable.name().to_owned(),
                min: callable.min_arity(),
                max: callable.max_arity(),
                supplied,
            });
        }

        // Evaluate in source order, keeping each argument's key.
        let mut args = vec![];
        for argument in arguments {
            match argument {
                Argument::Positional(expr) => {
                    args.push(EvaluatedArg::Positional(self.evaluate_expr(expr)?));
                }
                Argument::Named { name, value } => {
                    args.push(EvaluatedArg::Named {
                        name: name.clone(),
                        value: self.evaluate_expr(value)?,
                    });
                }
            }
        }

        callable.call(self, paren, args)
    }

    fn is_truthy(&self, value: &Value) -> bool {
        !matches!(value, Value::Null | Value::Bool(false))
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> EvalResult {
        let value = self.evaluate_expr(right)?;
        match operator.token_type {
            TokenType::Minus => match value {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| self.integer_overflow(operator)),
                Value::Float(n) => Ok(Value::Float(-n)),
                _ => Err(RuntimeError::InvalidOperand {
                    operator: operator.clone(),
                    message: "Operand must be a number".to_owned(),
                }),
            },
            TokenType::Bang => Ok(Value::Bool(!self.is_truthy(&value))),

            // Unreachable code. We don't have any unary expression except the ones above.
            _ => Ok(Value::Null),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left_value = self.evaluate_expr(left)?;
        let right_value = self.evaluate_expr(right)?;

        match operator.token_type {
            TokenType::Plus => match (&left_value, &right_value) {
                (Value::Int(l), Value::Int(r)) => l
                    .checked_add(*r)
                    .map(Value::Int)
                    .ok_or_else(|| self.integer_overflow(operator)),
                (Value::Str(l), Value::Str(r)) => Ok(Value::Str(format!("{l}{r}"))),
                _ => self
                    .check_number_operands(operator, &left_value, &right_value)
                    .map(|(l, r)| Value::Float(l + r))
                    .map_err(|_| RuntimeError::InvalidOperand {
                        operator: operator.clone(),
                        message: "Operands must be two numbers or two strings".to_owned(),
                    }),
            },
            TokenType::Minus => match (&left_value, &right_value) {
                (Value::Int(l), Value::Int(r)) => l
                    .checked_sub(*r)
                    .map(Value::Int)
                    .ok_or_else(|| self.integer_overflow(operator)),
                _ => self
                    .check_number_operands(operator, &left_value, &right_value)
                    .map(|(l, r)| Value::Float(l - r)),
            },
            TokenType::Star => match (&left_value, &right_value) {
                (Value::Int(l), Value::Int(r)) => l
                    .checked_mul(*r)
                    .map(Value::Int)
                    .ok_or_else(|| self.integer_overflow(operator)),
                _ => self
                    .check_number_operands(operator, &left_value, &right_value)
                    .map(|(l, r)| Value::Float(l * r)),
            },
            TokenType::Slash => match (&left_value, &right_value) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::InvalidOperand {
                    operator: operator.clone(),
                    message: "Division by zero".to_owned(),
                }),
                // The zero case is reported above; i64::MIN / -1 still
                // overflows here.
                (Value::Int(l), Value::Int(r)) => l
                    .checked_div(*r)
                    .map(Value::Int)
                    .ok_or_else(|| self.integer_overflow(operator)),
                _ => self
                    .check_number_operands(operator, &left_value, &right_value)
                    .map(|(l, r)| Value::Float(l / r)),
            },
            TokenType::Greater => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Value::Bool(l > r)),
            TokenType::GreaterEqual => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Value::Bool(l >= r)),
            TokenType::Less => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Value::Bool(l < r)),
            TokenType::LessEqual => self
                .check_number_operands(operator, &left_value, &right_value)
                .map(|(l, r)| Value::Bool(l <= r)),

            TokenType::EqualEqual => Ok(Value::Bool(left_value == right_value)),
            TokenType::BangEqual => Ok(Value::Bool(left_value != right_value)),

            // Unreachable code
            _ => Ok(Value::Null),
        }
    }

    fn integer_overflow(&self, operator: &Token) -> RuntimeError {
        RuntimeError::InvalidOperand {
            operator: operator.clone(),
            message: "Integer overflow".to_owned(),
        }
    }

    fn check_number_operands(
        &self,
        operator: &Token,
        left: &Value,
        right: &Value,
    ) -> Result<(f64, f64), RuntimeError> {
        if let (Some(l), Some(r)) = (left.number(), right.number()) {
            Ok((l, r))
        } else {
            Err(RuntimeError::InvalidOperand {
                operator: operator.clone(),
                message: "Operands must be numbers".to_owned(),
            })
        }
    }
}

impl Interpreter {
    /// Run a script top to bottom, stopping at the first runtime error and
    /// handing it to the reporter.
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            match self.execute(stmt) {
                Err(e) => {
                    self.runtime_error(e);
                    return;
                }
                Ok(_flow) => {
                    // The parser rejects break/continue outside loops and
                    // return outside functions, so only Normal reaches here.
                    debug_assert!(matches!(_flow, Flow::Normal));
                }
            }
        }
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.evaluate_stmt(stmt)
    }

    pub fn execute_block<I, R>(
        &mut self,
        statements: I,
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow, RuntimeError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        let prev_env = self.environment.clone();
        self.environment = environment;

        let mut flow = Flow::Normal;
        for s in statements {
            match self.execute(s.as_ref()) {
                Ok(Flow::Normal) => {}
                Ok(other) => {
                    flow = other;
                    break;
                }
                Err(e) => {
                    self.environment = prev_env;
                    return Err(e);
                }
            }
        }

        self.environment = prev_env;
        Ok(flow)
    }

    fn evaluate_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate_expr(expr)?;
            }
            Stmt::Function { name, params, body } => {
                // self.environment is the active environment at declaration
                // time, NOT at call time. Capturing it here is what makes
                // the scoping lexical.
                let env = self.environment.clone();
                let function = Function::new(name.clone(), params.to_vec(), body, env);
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Callable(Rc::new(function)));
            }
            Stmt::Break { token: _ } => return Ok(Flow::Break),
            Stmt::Continue { token: _ } => return Ok(Flow::Continue),
            Stmt::Return { keyword: _, value } => {
                let value =
                    if let Some(expr) = value { self.evaluate_expr(expr)? } else { Value::Null };

                return Ok(Flow::Return(value));
            }
            Stmt::Var { name, initializer } => {
                let value = if let Some(expr) = initializer {
                    self.evaluate_expr(expr)?
                } else {
                    Value::Null
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
            }
            Stmt::Block { statements } => {
                // Create a new environment for executing the block
                let new_env = Environment::new()
                    .with_enclosing(self.environment.clone())
                    .as_shared();

                return self.execute_block(statements, new_env);
            }
            Stmt::If { condition, then_branch, else_branch } => {
                let condition_result = self.evaluate_expr(condition)?;

                if self.is_truthy(&condition_result) {
                    return self.execute(then_branch.as_ref());
                } else if let Some(stmt) = else_branch {
                    return self.execute(stmt.as_ref());
                }
            }
            Stmt::While { condition, body } => loop {
                let value = self.evaluate_expr(condition)?;
                if !self.is_truthy(&value) {
                    break;
                }

                match self.execute(body)? {
                    // Continue ends the iteration's body; the condition
                    // check above is the next-iteration step.
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => break,
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            },
        };

        Ok(Flow::Normal)
    }

    fn runtime_error(&self, e: RuntimeError) {
        if self.error_reporter.is_none() {
            return;
        }
        let reporter = self.error_reporter.as_ref().unwrap();
        let mut reporter = reporter.borrow_mut();
        reporter.runtime_error(&e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_statements(source: &str) -> Vec<Stmt> {
        let mut scanner = Scanner::new(source);
        let tokens = scanner.scan_tokens().expect("failed to scan the source");
        let mut parser = Parser::new(tokens);
        parser.parse().expect("failed to parse the source")
    }

    fn run(source: &str) -> Result<Interpreter, RuntimeError> {
        let statements = make_statements(source);
        let mut ipr = Interpreter::new();
        for stmt in &statements {
            ipr.execute(stmt)?;
        }
        Ok(ipr)
    }

    fn global(ipr: &Interpreter, name: &str) -> Value {
        let token = Token::new(TokenType::Identifier, name, None, 0, 0);
        ipr.globals.borrow().get(&token).expect("global not found")
    }

    #[test]
    fn break_terminates_the_innermost_loop_only() {
        let ipr = run(r#"
            var outer = 0;
            var inner = 0;
            var i = 0;
            while (i < 3) {
                i = i + 1;
                outer = outer + 1;
                var j = 0;
                while (true) {
                    j = j + 1;
                    if (j == 2) { break; }
                    inner = inner + 1;
                }
            }
        "#)
        .unwrap();

        // The outer loop ran all three times; the inner one broke each time.
        assert_eq!(global(&ipr, "outer"), Value::Int(3));
        assert_eq!(global(&ipr, "inner"), Value::Int(3));
    }

    #[test]
    fn break_propagates_through_nested_conditionals_and_blocks() {
        let ipr = run(r#"
            var n = 0;
            var after = false;
            while (true) {
                n = n + 1;
                if (n > 1) {
                    {
                        if (true) { break; }
                    }
                }
            }
            after = true;
        "#)
        .unwrap();

        // Execution resumed at the statement following the loop.
        assert_eq!(global(&ipr, "n"), Value::Int(2));
        assert_eq!(global(&ipr, "after"), Value::Bool(true));
    }

    #[test]
    fn continue_skips_the_rest_of_the_iteration() {
        let ipr = run(r#"
            var i = 0;
            var odd_sum = 0;
            while (i < 6) {
                i = i + 1;
                if (i == 2 or i == 4 or i == 6) { continue; }
                odd_sum = odd_sum + i;
            }
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "odd_sum"), Value::Int(9));
        assert_eq!(global(&ipr, "i"), Value::Int(6));
    }

    #[test]
    fn return_propagates_through_loops_inside_a_function() {
        let ipr = run(r#"
            fun first_over(limit) {
                var i = 0;
                while (true) {
                    i = i + 1;
                    if (i > limit) { return i; }
                }
            }
            var result = first_over(4);
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "result"), Value::Int(5));
    }

    #[test]
    fn function_without_explicit_return_yields_null() {
        let ipr = run(r#"
            fun noop(x) { x + 1; }
            var result = noop(1);
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "result"), Value::Null);
    }

    #[test]
    fn closures_capture_the_defining_environment() {
        let ipr = run(r#"
            fun make_counter() {
                var count = 0;
                fun bump() {
                    count = count + 1;
                    return count;
                }
                return bump;
            }
            var counter = make_counter();
            counter();
            var result = counter();
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "result"), Value::Int(2));
    }

    #[test]
    fn named_and_positional_calls_agree() {
        let ipr = run(r#"
            fun pair(a, b) { return str(a) + "," + str(b); }
            var positional = pair(1, 2);
            var named = pair(b: 2, a: 1);
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "positional"), global(&ipr, "named"));
        assert_eq!(global(&ipr, "positional"), Value::Str("1,2".to_owned()));
    }

    #[test]
    fn duplicate_argument_is_reported_on_the_offending_name() {
        let err = run("fun f(a, b) { return a; } f(1, a: 2);").unwrap_err();
        match err {
            RuntimeError::DuplicateArgument { name } => assert_eq!(name.lexeme, "a"),
            other => panic!("expected DuplicateArgument, got {other:?}"),
        }
    }

    #[test]
    fn unknown_argument_is_reported_on_the_offending_name() {
        let err = run("fun f(a) { return a; } f(c: 1);").unwrap_err();
        match err {
            RuntimeError::UnknownArgument { name } => assert_eq!(name.lexeme, "c"),
            other => panic!("expected UnknownArgument, got {other:?}"),
        }
    }

    #[test]
    fn arity_is_checked_before_binding() {
        let err = run("fun f(a, b) { return a; } f(1, 2, 3);").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch { min: 2, max: 2, supplied: 3, .. }
        ));

        // Even a call full of bogus named arguments fails on arity first.
        let err = run("fun g(a) { return a; } g(x: 1, y: 2);").unwrap_err();
        assert!(matches!(err, RuntimeError::ArityMismatch { .. }));
    }

    #[test]
    fn calling_a_non_function_fails() {
        let err = run("var x = 3; x(1);").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOperand { .. }));
    }

    #[test]
    fn undefined_variable_read_fails() {
        let err = run("ghost;").unwrap_err();
        match err {
            RuntimeError::UnresolvedIdentifier { name } => assert_eq!(name.lexeme, "ghost"),
            other => panic!("expected UnresolvedIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        let ipr = run("var a = 7 / 2; var b = 7.0 / 2; var c = 1 + 2 * 3;").unwrap();
        assert_eq!(global(&ipr, "a"), Value::Int(3));
        assert_eq!(global(&ipr, "b"), Value::Float(3.5));
        assert_eq!(global(&ipr, "c"), Value::Int(7));
    }

    #[test]
    fn integer_division_by_zero_fails() {
        let err = run("1 / 0;").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidOperand { .. }));
    }

    #[test]
    fn integer_overflow_is_a_runtime_error() {
        for source in [
            "9223372036854775807 + 1;",
            "0 - 9223372036854775807 - 2;",
            "9223372036854775807 * 2;",
            // i64::MIN has no literal spelling, so build it up first.
            "(0 - 9223372036854775807 - 1) / (0 - 1);",
            "-(0 - 9223372036854775807 - 1);",
        ] {
            let err = run(source).unwrap_err();
            match err {
                RuntimeError::InvalidOperand { message, .. } => {
                    assert_eq!(message, "Integer overflow", "source: {source}");
                }
                other => panic!("expected InvalidOperand for {source}, got {other:?}"),
            }
        }
    }

    #[test]
    fn string_property_access_through_the_evaluator() {
        let ipr = run(r#"var n = "hello".length;"#).unwrap();
        assert_eq!(global(&ipr, "n"), Value::Int(5));

        let err = run(r#""hello".size;"#).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UndefinedProperty { type_name: "string", .. }
        ));
    }

    #[test]
    fn shadowed_binding_reappears_after_the_block() {
        let ipr = run(r#"
            var a = "outer";
            var seen_inner = "";
            {
                var a = "inner";
                seen_inner = a;
            }
            var seen_after = a;
        "#)
        .unwrap();

        assert_eq!(global(&ipr, "seen_inner"), Value::Str("inner".to_owned()));
        assert_eq!(global(&ipr, "seen_after"), Value::Str("outer".to_owned()));
    }
}
