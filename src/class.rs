//! Classes and instances.
//!
//! A class owns four method tables: plain methods, static methods, and the
//! computed-property `get`/`set` tables.  All four are inherited through the
//! single-superclass chain.  Instances hold a mutable field map; property
//! access defers to the computed-property tables only *outside* class bodies,
//! so methods always see raw field storage.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{KestrelError, Result};
use crate::interpreter::Interpreter;
use crate::subroutine::Subroutine;
use crate::token::Token;
use crate::value::{Callable, Value};

pub struct KestrelClass {
    pub name: String,
    pub superclass: Option<Rc<KestrelClass>>,

    methods: HashMap<String, Rc<Subroutine>>,
    static_methods: HashMap<String, Rc<Subroutine>>,
    get_methods: HashMap<String, Rc<Subroutine>>,
    set_methods: HashMap<String, Rc<Subroutine>>,
}

impl KestrelClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<KestrelClass>>,
        methods: HashMap<String, Rc<Subroutine>>,
        static_methods: HashMap<String, Rc<Subroutine>>,
        get_methods: HashMap<String, Rc<Subroutine>>,
        set_methods: HashMap<String, Rc<Subroutine>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
            static_methods,
            get_methods,
            set_methods,
        }
    }

    /// Walk the inheritance chain for an instance method.
    pub fn find_method(&self, name: &str) -> Option<Rc<Subroutine>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    pub fn find_static_method(&self, name: &str) -> Option<Rc<Subroutine>> {
        if let Some(method) = self.static_methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_static_method(name))
    }

    pub fn find_get_method(&self, name: &str) -> Option<Rc<Subroutine>> {
        if let Some(method) = self.get_methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_get_method(name))
    }

    pub fn find_set_method(&self, name: &str) -> Option<Rc<Subroutine>> {
        if let Some(method) = self.set_methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_set_method(name))
    }

    /// `Klass.name` — static methods are the only class-level properties.
    pub fn get_static(&self, name: &Token) -> Result<Value> {
        if let Some(method) = self.find_static_method(&name.lexeme) {
            return Ok(Value::Subroutine(method));
        }

        Err(KestrelError::runtime(
            name.line,
            format!("Undefined static method '{}'.", name.lexeme),
        ))
    }
}

impl Callable for Rc<KestrelClass> {
    fn arity(&self) -> Option<usize> {
        match self.find_method("construct") {
            Some(constructor) => constructor.arity(),
            None => Some(0),
        }
    }

    /// Constructing a class: allocate the instance, then run `construct` on
    /// it if the class declares one.
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value> {
        debug!("Constructing instance of '{}'", self.name);

        let instance = Rc::new(Instance::new(Rc::clone(self)));

        if let Some(constructor) = self.find_method("construct") {
            constructor.bind(Rc::clone(&instance)).call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for KestrelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KestrelClass")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|s| s.name.clone()),
            )
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .field("get_methods", &self.get_methods.len())
            .field("set_methods", &self.set_methods.len())
            .finish()
    }
}

/// A live object: a class pointer plus mutable field storage.
pub struct Instance {
    class: Rc<KestrelClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<KestrelClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property read.  A computed `get` method wins outside class bodies;
    /// inside them, access goes straight to raw storage.  A name that only
    /// has a `set` method is unreadable everywhere.
    pub fn get(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        name: &Token,
        in_method: bool,
    ) -> Result<Value> {
        let getter = self.class.find_get_method(&name.lexeme);

        if let Some(getter) = &getter {
            if !in_method {
                return getter.bind(Rc::clone(self)).call(interpreter, &[]);
            }
        }

        if getter.is_none() && self.class.find_set_method(&name.lexeme).is_some() {
            return Err(KestrelError::runtime(
                name.line,
                format!(
                    "Instance has a set method but no matching get method for '{}'.",
                    name.lexeme
                ),
            ));
        }

        self.get_field(name)
    }

    /// Raw lookup: stored field first, then a bound instance method.
    fn get_field(self: &Rc<Self>, name: &Token) -> Result<Value> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Subroutine(Rc::new(method.bind(Rc::clone(self)))));
        }

        Err(KestrelError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property write.  A computed `set` method intercepts the write outside
    /// class bodies; a name that only has a `get` method is unwritable
    /// everywhere.  Raw writes may create brand-new fields only from inside
    /// a class body.
    pub fn set(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        name: &Token,
        value: Value,
        in_method: bool,
    ) -> Result<()> {
        let setter = self.class.find_set_method(&name.lexeme);

        if let Some(setter) = &setter {
            if !in_method {
                setter.bind(Rc::clone(self)).call(interpreter, &[value])?;
                return Ok(());
            }
        }

        if setter.is_none() && self.class.find_get_method(&name.lexeme).is_some() {
            return Err(KestrelError::runtime(
                name.line,
                format!(
                    "Instance has a get method but no matching set method for '{}'.",
                    name.lexeme
                ),
            ));
        }

        let mut fields = self.fields.borrow_mut();

        if fields.contains_key(&name.lexeme) || in_method {
            fields.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        Err(KestrelError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }
}

impl fmt::Debug for Instance {
    // Field values may reference this very instance; keep it shallow.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
