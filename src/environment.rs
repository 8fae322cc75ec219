//! The environment chain: mutable name → value scope frames.
//!
//! Environments are reference-counted, interior-mutable nodes.  Several
//! environments may share one enclosing environment (block entry, function
//! call, method binding), and a node stays alive as long as any closure or
//! bound method still references it — this is what makes closures work, so
//! environments are never modelled as strictly-owned parent→child trees.

use crate::error::{KestrelError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Introduce (or overwrite) a binding in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup: search this frame, then walk the enclosing chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(KestrelError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Dynamic assignment: the nearest frame already holding `name` wins.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(KestrelError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read a binding exactly `distance` links up the chain.  Used for every
    /// reference the resolver recorded a binding distance for.
    pub fn get_at(&self, distance: usize, name: &str, line: usize) -> Result<Value> {
        if distance == 0 {
            self.values.get(name).cloned().ok_or_else(|| {
                KestrelError::runtime(line, format!("Undefined variable '{}'.", name))
            })
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get_at(distance - 1, name, line)
        } else {
            Err(KestrelError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Write a binding exactly `distance` links up the chain.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value, line: usize) -> Result<()> {
        if distance == 0 {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign_at(distance - 1, name, value, line)
        } else {
            Err(KestrelError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }
}
