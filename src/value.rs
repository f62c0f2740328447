use crate::prelude::*;
use std::fmt::Display;
use std::rc::Rc;

/// A runtime value. The variant list is closed on purpose: every capability
/// (type names, properties, display forms) dispatches by matching on it.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Callable(Rc<dyn Callable>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Int(left), Self::Float(right)) => *left as f64 == *right,
            (Self::Float(left), Self::Int(right)) => *left == *right as f64,
            (Self::Str(left), Self::Str(right)) => left == right,
            (Self::Callable(left), Self::Callable(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl Value {
    /// The language-level type name, used in diagnostics and by `type()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Callable(_) => "function",
        }
    }

    pub fn int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view with int-to-float promotion.
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Resolve a property against the fixed per-type table.
    pub fn get_property(&self, name: &Token) -> Result<Value, RuntimeError> {
        let found = match self {
            Self::Str(s) => match name.lexeme.as_str() {
                "length" => Some(Value::Int(s.chars().count() as i64)),
                _ => None,
            },
            _ => None,
        };

        found.ok_or_else(|| RuntimeError::UndefinedProperty {
            name: name.clone(),
            type_name: self.type_name(),
        })
    }

    /// The display form for interactive echoing. Unlike `to_string` it keeps
    /// string values quoted, so `"1"` and `1` stay distinguishable at the
    /// prompt.
    pub fn echo(&self) -> String {
        match self {
            Self::Str(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
            Self::Callable(c) => write!(f, "{}", c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn property_token(name: &str) -> Token {
        Token::new(TokenType::Identifier, name, None, 1, 1)
    }

    #[test]
    fn string_length_counts_characters() {
        let value = Value::Str("héllo".to_owned());
        let res = value.get_property(&property_token("length"));
        assert_eq!(res, Ok(Value::Int(5)));
    }

    #[test]
    fn unknown_property_names_type_and_property() {
        let value = Value::Str("abc".to_owned());
        let res = value.get_property(&property_token("size"));
        assert_eq!(
            res,
            Err(RuntimeError::UndefinedProperty {
                name: property_token("size"),
                type_name: "string",
            })
        );
    }

    #[test]
    fn ints_have_no_properties() {
        let res = Value::Int(7).get_property(&property_token("length"));
        assert!(matches!(
            res,
            Err(RuntimeError::UndefinedProperty { type_name: "int", .. })
        ));
    }

    #[test]
    fn echo_quotes_strings_only() {
        assert_eq!(Value::Str("hi".to_owned()).echo(), "\"hi\"");
        assert_eq!(Value::Int(3).echo(), "3");
        assert_eq!(Value::Null.echo(), "null");
    }

    #[test]
    fn mixed_numeric_equality_promotes() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::Str("2".to_owned()));
    }
}
