//! Static resolution pass.
//!
//! Walks the AST between parsing and evaluation, mirroring the lexical scope
//! structure the interpreter will build at runtime.  Every local variable
//! reference gets a *binding distance* (how many environment frames up its
//! declaration lives) recorded on the interpreter; references that resolve
//! nowhere are left for the global environment.  The pass also rejects the
//! static errors the grammar cannot: reading a variable in its own
//! initializer, duplicate declarations in one scope, stray `this`/`super`,
//! and top-level `return`.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::KestrelError;
use crate::interpreter::Interpreter;
use crate::parser::{Expr, ExprId, LiteralValue, Stmt, SubroutineDecl};
use crate::token::Token;

/// What kind of subroutine body we are currently inside.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SubroutineKind {
    None,
    Subroutine,
    Constructor,
    Method,
    StaticMethod,
}

/// What kind of class body we are currently inside.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,

    /// Stack of lexical scopes.  `false` marks a name that is declared but
    /// whose initializer has not finished resolving.
    scopes: Vec<HashMap<String, bool>>,

    current_subroutine: SubroutineKind,
    current_class: ClassKind,

    errors: Vec<KestrelError>,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: Vec::new(),
            current_subroutine: SubroutineKind::None,
            current_class: ClassKind::None,
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program, accumulating every static error.
    pub fn resolve(
        mut self,
        statements: &[Stmt],
    ) -> std::result::Result<(), Vec<KestrelError>> {
        info!("Beginning resolution phase");

        for statement in statements {
            self.resolve_stmt(statement);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        debug!("Resolution error at '{}': {}", token.lexeme, message);

        self.errors.push(KestrelError::resolve(token, message));
    }

    // ───────────────────────── scope plumbing ─────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let duplicate = self
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(&name.lexeme));

        if duplicate {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Find the innermost scope holding `name` and record its distance for
    /// the AST node `id`.  Unfound names fall through to globals at runtime.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.note_local(id, depth);
                return;
            }
        }
    }

    // ──────────────────────────── statements ──────────────────────

    fn resolve_stmt(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                for statement in statements {
                    self.resolve_stmt(statement);
                }
                self.end_scope();
            }

            Stmt::Exit { code, .. } => self.resolve_expr(code),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            // `for` opens no scope of its own; its initializer declares into
            // the surrounding scope.
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                if let Some(initializer) = initializer {
                    self.resolve_stmt(initializer);
                }
                self.resolve_expr(condition);
                if let Some(increment) = increment {
                    self.resolve_expr(increment);
                }
                self.resolve_stmt(body);
            }

            Stmt::Inc { id, name } | Stmt::Dec { id, name } => {
                self.resolve_local(*id, name);
            }

            Stmt::Break | Stmt::Continue => {}

            Stmt::Subroutine(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_subroutine(decl, SubroutineKind::Subroutine);
            }

            Stmt::Return { keyword, value } => {
                if self.current_subroutine == SubroutineKind::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(value) = value {
                    if self.current_subroutine == SubroutineKind::Constructor {
                        self.error(keyword, "Can't return a value from a constructor.");
                    }

                    self.resolve_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
                get_methods,
                set_methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassKind::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if let Expr::Variable {
                        name: super_name, ..
                    } = superclass
                    {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }
                    }

                    self.current_class = ClassKind::Subclass;
                    self.resolve_expr(superclass);

                    // Models the runtime frame holding `super`.
                    self.begin_scope();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert("super".to_owned(), true);
                    }
                }

                // Statics never see `this`, so they resolve outside the
                // frame that `bind` interposes for instance methods.
                for method in static_methods {
                    self.resolve_subroutine(method, SubroutineKind::StaticMethod);
                }

                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this".to_owned(), true);
                }

                for method in methods {
                    let kind = if method.name.lexeme == "construct" {
                        SubroutineKind::Constructor
                    } else {
                        SubroutineKind::Method
                    };
                    self.resolve_subroutine(method, kind);
                }
                for method in get_methods.iter().chain(set_methods.iter()) {
                    self.resolve_subroutine(method, SubroutineKind::Method);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_subroutine(&mut self, decl: &SubroutineDecl, kind: SubroutineKind) {
        let enclosing = self.current_subroutine;
        self.current_subroutine = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for statement in &decl.body {
            self.resolve_stmt(statement);
        }
        self.end_scope();

        self.current_subroutine = enclosing;
    }

    // ─────────────────────────── expressions ──────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(LiteralValue::Array(items)) => {
                for item in items {
                    self.resolve_expr(item);
                }
            }

            Expr::Literal(_) => {}

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Inc { id, name } | Expr::Dec { id, name } => {
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(keyword, "Can't use 'this' outside of a class.");
                        return;
                    }
                    _ if self.current_subroutine == SubroutineKind::StaticMethod => {
                        self.error(keyword, "Can't use 'this' in a static method.");
                        return;
                    }
                    _ => {}
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super {
                id,
                keyword,
                ..
            } => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }
                    ClassKind::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }
}
