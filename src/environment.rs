//! A chain of mutable scope frames. Each frame maps names to values and
//! optionally links to its enclosing frame; blocks and calls push a child
//! frame, closures keep an `Rc` to the frame that was current at their
//! declaration. A frame therefore lives as long as its longest-lived holder.

use crate::error::{Result, SkriftError};
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Environment<'a> {
    /// A root frame with no parent (the globals frame).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A child frame whose lookups fall through to `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this frame, overwriting any previous binding.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Chained lookup: this frame first, then each enclosing frame in turn.
    pub fn get(&self, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(SkriftError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Chained assignment: store into the nearest frame that already binds
    /// `name`; assigning to a name no frame binds is a runtime error.
    pub fn assign(&mut self, name: &Token<'a>, value: Value<'a>) -> Result<()> {
        if self.values.contains_key(name.lexeme) {
            self.values.insert(name.lexeme, value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(SkriftError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ))
        }
    }

    /// Read `name` in the frame exactly `distance` parent links above `env`.
    /// Used for resolver-bound locals; the distance was computed against the
    /// same nesting the interpreter reproduces at run time.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &Token<'a>,
    ) -> Result<Value<'a>> {
        let target = Environment::ancestor(env, distance, name)?;
        let value = target.borrow().values.get(name.lexeme).cloned();

        value.ok_or_else(|| {
            SkriftError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            )
        })
    }

    /// Store `value` for `name` in the frame exactly `distance` parent links
    /// above `env`.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &Token<'a>,
        value: Value<'a>,
    ) -> Result<()> {
        let target = Environment::ancestor(env, distance, name)?;
        target.borrow_mut().values.insert(name.lexeme, value);

        Ok(())
    }

    /// Lookup by plain name in this frame only. Test/introspection hook.
    pub fn get_local(&self, name: &str) -> Option<Value<'a>> {
        self.values.get(name).cloned()
    }

    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &Token<'a>,
    ) -> Result<Rc<RefCell<Environment<'a>>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let enclosing = current.borrow().enclosing.clone();

            current = enclosing.ok_or_else(|| {
                SkriftError::runtime(
                    name.line,
                    format!("Undefined variable '{}'.", name.lexeme),
                )
            })?;
        }

        Ok(current)
    }
}
