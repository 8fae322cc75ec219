//! The tree-walking evaluator.
//!
//! Statements execute against a chain of [`Environment`] frames; expression
//! nodes the resolver annotated read and write through exact binding
//! distances, while everything else falls back to the global frame.
//! `break`/`continue`/`return` travel as [`Flow`] results up the statement
//! walk; `exit` travels as an error so it can escape nested calls all the
//! way to the driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::class::KestrelClass;
use crate::environment::Environment;
use crate::error::{KestrelError, Result};
use crate::native;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt, SubroutineDecl};
use crate::subroutine::Subroutine;
use crate::token::{Token, TokenKind};
use crate::value::{is_truthy, Callable, Value};

/// How a statement finished.  Everything except `Normal` unwinds to the
/// nearest enclosing loop or call.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,

    /// The innermost frame statements currently execute in.  Starts out as
    /// the global frame itself.
    environment: Rc<RefCell<Environment>>,

    /// Binding distances recorded by the resolver, keyed by AST node id.
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        info!("Interpreter created");

        let mut globals = Environment::new();
        native::install(&mut globals);

        let globals = Rc::new(RefCell::new(globals));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// The global frame, shared with the REPL and tests.
    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        Rc::clone(&self.globals)
    }

    /// Record a binding distance for an AST node (called by the resolver).
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Beginning evaluation of {} statements", statements.len());

        for statement in statements {
            self.execute(statement)?;
        }

        Ok(())
    }

    // ──────────────────────────── statements ──────────────────────

    fn execute(&mut self, statement: &Stmt) -> Result<Flow> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Zilch,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::Exit { keyword, code } => {
                let value = self.evaluate(code)?;

                match value {
                    Value::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                        Err(KestrelError::Exit { code: n as i32 })
                    }
                    Value::Number(_) => Err(KestrelError::runtime(
                        keyword.line,
                        "Exit code must be an integer.",
                    )),
                    _ => Err(KestrelError::runtime(
                        keyword.line,
                        "Exit code must be a number.",
                    )),
                }
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.evaluate(condition)?;

                if is_truthy(&condition) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                loop {
                    let condition = self.evaluate(condition)?;
                    if !is_truthy(&condition) {
                        break;
                    }

                    match self.execute(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                if let Some(initializer) = initializer {
                    self.execute(initializer)?;
                }

                loop {
                    let condition = self.evaluate(condition)?;
                    if !is_truthy(&condition) {
                        break;
                    }

                    match self.execute(body)? {
                        Flow::Break => break,
                        // `continue` skips the rest of the body but still
                        // runs the increment clause.
                        Flow::Continue | Flow::Normal => {}
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                    }

                    if let Some(increment) = increment {
                        self.evaluate(increment)?;
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Inc { id, name } => {
                self.step_variable(*id, name, 1.0)?;
                Ok(Flow::Normal)
            }

            Stmt::Dec { id, name } => {
                self.step_variable(*id, name, -1.0)?;
                Ok(Flow::Normal)
            }

            Stmt::Break => Ok(Flow::Break),

            Stmt::Continue => Ok(Flow::Continue),

            Stmt::Subroutine(decl) => {
                let subroutine =
                    Subroutine::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Subroutine(Rc::new(subroutine)));

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Zilch,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
                get_methods,
                set_methods,
            } => {
                self.execute_class(
                    name,
                    superclass.as_ref(),
                    methods,
                    static_methods,
                    get_methods,
                    set_methods,
                )?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Execute statements in the given frame, restoring the previous frame
    /// afterwards (also on error).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Flow::Normal);

        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<SubroutineDecl>],
        static_methods: &[Rc<SubroutineDecl>],
        get_methods: &[Rc<SubroutineDecl>],
        set_methods: &[Rc<SubroutineDecl>],
    ) -> Result<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<KestrelClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };
                    return Err(KestrelError::runtime(line, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Zilch);

        // Method closures capture a frame holding `super` when inheriting.
        let enclosing = Rc::clone(&self.environment);
        if let Some(ref superclass) = superclass {
            let mut env = Environment::with_enclosing(Rc::clone(&self.environment));
            env.define("super", Value::Class(Rc::clone(superclass)));
            self.environment = Rc::new(RefCell::new(env));
        }

        let closure = Rc::clone(&self.environment);

        let mut method_map = HashMap::new();
        for decl in methods {
            let is_constructor = decl.name.lexeme == "construct";
            method_map.insert(
                decl.name.lexeme.clone(),
                Rc::new(Subroutine::new(
                    Rc::clone(decl),
                    Rc::clone(&closure),
                    is_constructor,
                )),
            );
        }

        let mut static_map = HashMap::new();
        for decl in static_methods {
            static_map.insert(
                decl.name.lexeme.clone(),
                Rc::new(Subroutine::new(Rc::clone(decl), Rc::clone(&closure), false)),
            );
        }

        let mut get_map = HashMap::new();
        for decl in get_methods {
            get_map.insert(
                decl.name.lexeme.clone(),
                Rc::new(Subroutine::new(Rc::clone(decl), Rc::clone(&closure), false)),
            );
        }

        let mut set_map = HashMap::new();
        for decl in set_methods {
            set_map.insert(
                decl.name.lexeme.clone(),
                Rc::new(Subroutine::new(Rc::clone(decl), Rc::clone(&closure), false)),
            );
        }

        self.environment = enclosing;

        let class = KestrelClass::new(
            name.lexeme.clone(),
            superclass,
            method_map,
            static_map,
            get_map,
            set_map,
        );

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.line,
        )
    }

    // ─────────────────────────── expressions ──────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => self.evaluate_literal(literal),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.kind {
                    TokenKind::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(KestrelError::runtime(
                            operator.line,
                            "Operand must be a number.",
                        )),
                    },
                    _ => Ok(Value::Bool(!is_truthy(&right))),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                // Short-circuit: yield the deciding operand itself.
                match operator.kind {
                    TokenKind::OR if is_truthy(&left) => Ok(left),
                    TokenKind::AND if !is_truthy(&left) => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.evaluate(condition)?;

                if is_truthy(&condition) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            // Expression forms yield the value from *before* the step.
            Expr::Inc { id, name } => self.step_variable(*id, name, 1.0),
            Expr::Dec { id, name } => self.step_variable(*id, name, -1.0),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee, &args, paren)
            }

            Expr::Get {
                object,
                name,
                in_method,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => instance.get(self, name, *in_method),
                    Value::Class(class) => class.get_static(name),
                    _ => Err(KestrelError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
                in_method,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        instance.set(self, name, value.clone(), *in_method)?;
                        Ok(value)
                    }
                    _ => Err(KestrelError::runtime(
                        name.line,
                        "Only instances have fields.",
                    )),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => {
                let distance = *self.locals.get(id).ok_or_else(|| {
                    KestrelError::runtime(keyword.line, "Can't use 'super' here.")
                })?;

                let superclass = self
                    .environment
                    .borrow()
                    .get_at(distance, "super", keyword.line)?;

                // `this` lives one frame nearer than `super`.
                let this = self
                    .environment
                    .borrow()
                    .get_at(distance - 1, "this", keyword.line)?;

                let (superclass, instance) = match (superclass, this) {
                    (Value::Class(class), Value::Instance(instance)) => (class, instance),
                    _ => {
                        return Err(KestrelError::runtime(
                            keyword.line,
                            "Can't use 'super' here.",
                        ));
                    }
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Subroutine(Rc::new(found.bind(instance)))),
                    None => Err(KestrelError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    )),
                }
            }
        }
    }

    fn evaluate_literal(&mut self, literal: &LiteralValue) -> Result<Value> {
        match literal {
            LiteralValue::Number(n) => Ok(Value::Number(*n)),
            LiteralValue::Str(s) => Ok(Value::Str(s.clone())),
            LiteralValue::Bool(b) => Ok(Value::Bool(*b)),
            LiteralValue::Zilch => Ok(Value::Zilch),

            // Array literals build a fresh sequence on every evaluation.
            LiteralValue::Array(items) => {
                let mut values: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }

                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
        }
    }

    fn evaluate_binary(&mut self, operator: &Token, left: Value, right: Value) -> Result<Value> {
        match operator.kind {
            TokenKind::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                _ => Err(KestrelError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenKind::MINUS => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenKind::STAR => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            // Plain IEEE division: dividing by zero yields an infinity.
            TokenKind::SLASH => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }

            // Remainder keeps the dividend's sign: -1 mod 3 is -1.
            TokenKind::MOD => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a % b))
            }

            TokenKind::DIV => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number((a / b).floor()))
            }

            TokenKind::CARET => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Number(a.powf(b)))
            }

            TokenKind::GREATER => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenKind::GREATER_EQUAL => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenKind::LESS => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenKind::LESS_EQUAL => {
                let (a, b) = self.number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenKind::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenKind::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(KestrelError::runtime(
                operator.line,
                format!("Unknown binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            _ => Err(KestrelError::runtime(
                operator.line,
                "Operands must be numbers.",
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => self
                .environment
                .borrow()
                .get_at(distance, &name.lexeme, name.line),
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    /// Shared by `inc`/`dec` in both statement and expression form; returns
    /// the variable's value from before the step.
    fn step_variable(&mut self, id: ExprId, name: &Token, delta: f64) -> Result<Value> {
        let old = self.look_up_variable(id, name)?;

        let n = match old {
            Value::Number(n) => n,
            _ => {
                return Err(KestrelError::runtime(
                    name.line,
                    "Operand must be a number.",
                ));
            }
        };

        let stepped = Value::Number(n + delta);

        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow_mut().assign_at(
                distance,
                &name.lexeme,
                stepped,
                name.line,
            )?,
            None => self
                .globals
                .borrow_mut()
                .assign(&name.lexeme, stepped, name.line)?,
        }

        Ok(old)
    }

    /// Dispatch a call to any callable value, enforcing arity and pinning
    /// position-less native errors to the call site.
    fn call_value(&mut self, callee: Value, args: &[Value], paren: &Token) -> Result<Value> {
        let result = match &callee {
            Value::Native(native) => {
                self.check_arity(native.arity(), args.len(), paren)?;
                native.call(self, args)
            }

            Value::Subroutine(subroutine) => {
                self.check_arity(subroutine.arity(), args.len(), paren)?;
                subroutine.call(self, args)
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), args.len(), paren)?;
                class.call(self, args)
            }

            _ => Err(KestrelError::runtime(
                paren.line,
                "Can only call subroutine and classes.",
            )),
        };

        match result {
            Err(KestrelError::Runtime { message, line: 0 }) => {
                Err(KestrelError::Runtime {
                    message,
                    line: paren.line,
                })
            }
            other => other,
        }
    }

    fn check_arity(&self, arity: Option<usize>, got: usize, paren: &Token) -> Result<()> {
        match arity {
            Some(expected) if expected != got => Err(KestrelError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpreter {
    // The environment chain can reach closures and back again; stay shallow.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("locals", &self.locals.len())
            .finish()
    }
}
