use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use crate::callable::bind_arguments;
use crate::prelude::*;

/// A user-defined function: its declaration plus the environment it was
/// declared in. The captured environment makes scoping lexical; calls chain
/// their binding scope onto it, never onto the caller's scope.
#[derive(Debug, Clone)]
pub struct Function {
    name: Token,
    params: Vec<Token>,
    body: Vec<Rc<Stmt>>,
    closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(
        name: Token,
        params: Vec<Token>,
        body: &[Rc<Stmt>],
        closure: Rc<RefCell<Environment>>,
    ) -> Self {
        Self {
            name,
            params,
            body: body.to_vec(),
            closure,
        }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.name.lexeme
    }

    fn min_arity(&self) -> usize {
        self.params.len()
    }

    fn max_arity(&self) -> usize {
        self.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        _paren: &Token,
        arguments: Vec<EvaluatedArg>,
    ) -> Result<Value, RuntimeError> {
        let params: Vec<&str> = self.params.iter().map(|p| p.lexeme.as_str()).collect();
        let environment = bind_arguments(&params, arguments)?
            .with_enclosing(self.closure.clone())
            .as_shared();

        match interpreter.execute_block(&self.body, environment)? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.name.lexeme)
    }
}
