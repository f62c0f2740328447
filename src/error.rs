use thiserror::Error;

use crate::token::Token;

/// Errors raised before execution starts, by the scanner or the parser.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[line {}] Illegal token '{}'", .0.position(), .0.lexeme)]
    IllegalToken(Token),

    #[error("[line {}] Unexpected token '{}'", .0.position(), .0.lexeme)]
    UnexpectedToken(Token),

    #[error("{}{message}", position_prefix(.token))]
    Message {
        token: Option<Token>,
        message: String,
    },
}

impl ParseError {
    pub fn message(token: Option<Token>, message: impl Into<String>) -> Self {
        Self::Message {
            token,
            message: message.into(),
        }
    }
}

fn position_prefix(token: &Option<Token>) -> String {
    match token {
        Some(t) => format!("[line {}] ", t.position()),
        None => String::new(),
    }
}

/// Errors raised while a script is running. Every variant carries the token
/// that best localizes the fault; all of them unwind to the driver unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("[line {}] Undefined variable '{}'", .name.position(), .name.lexeme)]
    UnresolvedIdentifier { name: Token },

    #[error(
        "[line {}] {callee}() takes {} arguments, got {supplied}",
        .paren.position(),
        arity_range(.min, .max)
    )]
    ArityMismatch {
        paren: Token,
        callee: String,
        min: usize,
        max: usize,
        supplied: usize,
    },

    #[error("[line {}] Duplicate argument '{}'", .name.position(), .name.lexeme)]
    DuplicateArgument { name: Token },

    #[error("[line {}] Unknown argument '{}'", .name.position(), .name.lexeme)]
    UnknownArgument { name: Token },

    #[error(
        "[line {}] Argument '{param}' to {callee}() must be {expected}, got {found}",
        .token.position()
    )]
    InvalidArgumentType {
        token: Token,
        callee: String,
        param: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "[line {}] Undefined property '{}' on {type_name}",
        .name.position(),
        .name.lexeme
    )]
    UndefinedProperty {
        name: Token,
        type_name: &'static str,
    },

    #[error("[line {}] {message}", .operator.position())]
    InvalidOperand { operator: Token, message: String },
}

fn arity_range(min: &usize, max: &usize) -> String {
    if min == max {
        format!("{min}")
    } else {
        format!("{min} to {max}")
    }
}
