use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// One scope in the name-resolution chain: a binding map plus a link to the
/// enclosing scope. Creation and destruction are the caller's business;
/// the enclosing link never changes once set.
#[derive(Debug, Default)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            enclosing: Some(enclosing),
            ..self
        }
    }

    pub fn as_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_owned(), value);
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if !self.values.contains_key(&name.lexeme) {
            // Ask one level above if possible
            if let Some(ref e) = self.enclosing {
                return e.borrow_mut().assign(name, value);
            }

            return Err(RuntimeError::UnresolvedIdentifier { name: name.clone() });
        }

        self.values.insert(name.lexeme.clone(), value);
        Ok(())
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        let value = self.values.get(&name.lexeme).map(|v| v.to_owned());
        // Ask one level above if possible
        if value.is_none() && self.enclosing.is_some() {
            let rc = self.enclosing.as_ref().unwrap();
            return rc.borrow().get(name);
        }

        value.ok_or_else(|| RuntimeError::UnresolvedIdentifier { name: name.clone() })
    }

    /// Same search as `get`, as a non-mutating predicate.
    pub fn contains(&self, name: &Token) -> bool {
        if self.values.contains_key(&name.lexeme) {
            return true;
        }

        match self.enclosing {
            Some(ref e) => e.borrow().contains(name),
            None => false,
        }
    }

    /// Consume the scope, keeping only its local bindings. Used to hand a
    /// bound argument map to native functions.
    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}
