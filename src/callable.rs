use std::fmt::{Debug, Display};

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

/// The contract shared by user-defined functions and native functions.
/// Arity is a `[min, max]` range; the interpreter checks it before `call`
/// is ever invoked, so implementations may assume the argument count fits.
pub trait Callable: Debug + Display {
    fn name(&self) -> &str;
    fn min_arity(&self) -> usize;
    fn max_arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        paren: &Token,
        arguments: Vec<EvaluatedArg>,
    ) -> Result<Value, RuntimeError>;
}

/// An already-evaluated call argument, still keyed the way it was written:
/// by position or by parameter name.
#[derive(Debug, Clone)]
pub enum EvaluatedArg {
    Positional(Value),
    Named { name: Token, value: Value },
}

/// Bind evaluated arguments to declared parameter names, producing a bare
/// scope holding exactly the bound parameters. Positional entries bind
/// first, in order; named entries then have to name a declared parameter
/// that is not already set. The scope has no enclosing link yet, so its
/// `contains` is precisely the "already set" mark.
///
/// The caller has validated arity, so positional entries never outnumber
/// the declared parameters.
pub(crate) fn bind_arguments(
    params: &[&str],
    arguments: Vec<EvaluatedArg>,
) -> Result<Environment, RuntimeError> {
    let mut scope = Environment::new();

    let mut position = 0;
    for arg in &arguments {
        if let EvaluatedArg::Positional(value) = arg {
            scope.define(params[position], value.clone());
            position += 1;
        }
    }

    for arg in arguments {
        if let EvaluatedArg::Named { name, value } = arg {
            if !params.contains(&name.lexeme.as_str()) {
                return Err(RuntimeError::UnknownArgument { name });
            }
            if scope.contains(&name) {
                return Err(RuntimeError::DuplicateArgument { name });
            }
            scope.define(&name.lexeme, value);
        }
    }

    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn name(lexeme: &str) -> Token {
        Token::new(TokenType::Identifier, lexeme, None, 1, 1)
    }

    fn positional(v: i64) -> EvaluatedArg {
        EvaluatedArg::Positional(Value::Int(v))
    }

    fn named(n: &str, v: i64) -> EvaluatedArg {
        EvaluatedArg::Named {
            name: name(n),
            value: Value::Int(v),
        }
    }

    fn bound(params: &[&str], args: Vec<EvaluatedArg>) -> Vec<(String, Value)> {
        let mut pairs: Vec<_> = bind_arguments(params, args)
            .expect("binding should succeed")
            .into_values()
            .into_iter()
            .collect();
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        pairs
    }

    #[test]
    fn positional_and_named_binding_agree() {
        let by_position = bound(&["a", "b"], vec![positional(1), positional(2)]);
        let by_name = bound(&["a", "b"], vec![named("b", 2), named("a", 1)]);
        assert_eq!(by_position, by_name);
        assert_eq!(
            by_position,
            vec![
                ("a".to_owned(), Value::Int(1)),
                ("b".to_owned(), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn positional_entries_bind_before_named_ones() {
        // Written order puts the named argument first; binding still keys
        // the positional entry to the first parameter.
        let pairs = bound(&["a", "b"], vec![named("b", 2), positional(1)]);
        assert_eq!(
            pairs,
            vec![
                ("a".to_owned(), Value::Int(1)),
                ("b".to_owned(), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn named_twice_is_a_duplicate() {
        let res = bind_arguments(&["a"], vec![named("a", 1), named("a", 2)]);
        assert_eq!(
            res.unwrap_err(),
            RuntimeError::DuplicateArgument { name: name("a") }
        );
    }

    #[test]
    fn positional_then_named_same_parameter_is_a_duplicate() {
        let res = bind_arguments(&["a", "b"], vec![positional(1), named("a", 2)]);
        assert_eq!(
            res.unwrap_err(),
            RuntimeError::DuplicateArgument { name: name("a") }
        );
    }

    #[test]
    fn undeclared_name_is_unknown() {
        let res = bind_arguments(&["a"], vec![named("c", 1)]);
        assert_eq!(
            res.unwrap_err(),
            RuntimeError::UnknownArgument { name: name("c") }
        );
    }
}
