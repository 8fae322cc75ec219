//! Runtime value model for the Kestrel interpreter.
//!
//! [`Value`] is the tagged union every expression evaluates to.  Arrays are
//! reference-shared (`Rc<RefCell<…>>`) so assigning a sequence elsewhere
//! aliases it; callables, classes and instances are `Rc`-shared as well and
//! compare by identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::{Instance, KestrelClass};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::native::NativeSubroutine;
use crate::subroutine::Subroutine;

/// The uniform contract every invocable value satisfies: native subroutines,
/// user subroutines and classes (constructible).
pub trait Callable {
    /// Declared argument count; `None` means variadic (any count accepted).
    fn arity(&self) -> Option<usize>;

    /// Invoke with already-evaluated arguments.
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value>;
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Double-precision number.
    Number(f64),

    /// Text string.
    Str(String),

    /// Boolean.
    Bool(bool),

    /// The null sentinel, spelled `zilch` in source.
    Zilch,

    /// Ordered sequence; mutable and reference-shared once produced.
    Array(Rc<RefCell<Vec<Value>>>),

    /// Host-provided callable.
    Native(Rc<NativeSubroutine>),

    /// User subroutine / closure.
    Subroutine(Rc<Subroutine>),

    /// Class value (constructible, carries static methods).
    Class(Rc<KestrelClass>),

    /// Instance of a user class.
    Instance(Rc<Instance>),
}

impl PartialEq for Value {
    /// `zilch` equals only `zilch`; primitives compare by value; everything
    /// reference-shaped compares by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Zilch, Value::Zilch) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Subroutine(a), Value::Subroutine(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The canonical "stringify" form used by `print`, `string(…)` and the
    /// REPL echo.  Numbers drop a trailing `.0`; infinities render as
    /// `+inf` / `-inf`; sequences render bracketed and comma-separated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Zilch => write!(f, "zilch"),

            Value::Number(n) => {
                if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "+inf" } else { "-inf" })
                } else if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Str(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Array(items) => {
                write!(f, "[")?;

                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }

                write!(f, "]")
            }

            Value::Native(_) => write!(f, "<native sub>"),

            Value::Subroutine(sub) => write!(f, "<sub {}>", sub.name()),

            Value::Class(class) => write!(f, "<{} class>", class.name),

            Value::Instance(instance) => write!(f, "<{} instance>", instance.class_name()),
        }
    }
}

/// Truthiness rule for conditional contexts: `zilch` and `false` are falsy,
/// **every** other value (including `0` and empty strings/sequences) is
/// truthy.
#[inline]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Zilch => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}
