//! User-defined subroutines (closures and methods).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::Instance;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::parser::SubroutineDecl;
use crate::value::{Callable, Value};

/// A subroutine declaration paired with the environment it closed over.
///
/// Methods are produced by [`Subroutine::bind`], which interposes a one-frame
/// environment defining `this` between the closure and the body.
pub struct Subroutine {
    declaration: Rc<SubroutineDecl>,
    closure: Rc<RefCell<Environment>>,

    /// Constructors always return their instance, even through a bare
    /// `return;`.
    is_constructor: bool,
}

impl Subroutine {
    pub fn new(
        declaration: Rc<SubroutineDecl>,
        closure: Rc<RefCell<Environment>>,
        is_constructor: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_constructor,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Produce a copy of this subroutine whose closure has `this` bound to
    /// the given instance.
    pub fn bind(&self, instance: Rc<Instance>) -> Subroutine {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));

        Subroutine {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(env)),
            is_constructor: self.is_constructor,
        }
    }
}

impl Callable for Subroutine {
    fn arity(&self) -> Option<usize> {
        Some(self.declaration.params.len())
    }

    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
        debug!("Calling subroutine '{}'", self.name());

        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, arg) in self.declaration.params.iter().zip(args.iter()) {
            env.define(&param.lexeme, arg.clone());
        }

        let flow: Flow =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(env)))?;

        if self.is_constructor {
            // The constructor's own frame is gone, but `this` lives in the
            // bound closure at distance 0.
            return self
                .closure
                .borrow()
                .get_at(0, "this", self.declaration.name.line);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Zilch),
        }
    }
}

impl fmt::Debug for Subroutine {
    // Shallow on purpose: closures form reference cycles through their
    // environments.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subroutine")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.declaration.params.len())
            .field("is_constructor", &self.is_constructor)
            .finish()
    }
}
