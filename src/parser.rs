/*!
Recursive-descent parser for the Kestrel language, plus the AST node
definitions it produces.

Grammar (EBNF — condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | subDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<-" IDENT )?
                 "{" ( ("static"|"get"|"set")? subroutine )* "}" ;
subDecl        → "sub" subroutine ;
subroutine     → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → ifStmt | whileStmt | forStmt | exitStmt | incStmt | decStmt
               | returnStmt | breakStmt | continueStmt | block | exprStmt ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
exitStmt       → "exit" expression? ";" ;
incStmt        → "inc" IDENT ";" ;           (dec likewise)
expression     → assignment ;
assignment     → ( call "." )? IDENT ( "=" | "+=" | "-=" | "*=" | "/=" | "^=" )
                 assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → conditional ( "and" conditional )* ;
conditional    → equality ( "?" expression ":" expression )? ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → exponent ( ( "/" | "*" | "mod" | "div" ) exponent )* ;
exponent       → unary ( "^" unary )* ;      (left-associative, deliberately)
unary          → ( "!" | "-" ) unary | call ;
call           → incdec ( "(" arguments? ")" | "." IDENT )* ;
incdec         → ( "inc" | "dec" ) primary | primary ;
primary        → NUMBER | STRING | "true" | "false" | "zilch" | "inf"
               | "[" array_items? "]" | "super" "." IDENT | "this"
               | IDENT | "(" expression ")" ;
```

Compound assignment desugars to `name = name <op> value` with a synthesized
operator token.  Parameter lists, argument lists and array literals are capped
at 255 entries; overflow is reported but does not abort the parse.

Error policy: a syntax error is recorded, then the parser *synchronizes* —
discarding tokens until a statement boundary — and keeps going, so one pass
collects every syntax diagnostic.  `parse` returns the accumulated error list
whenever it is non-empty; a script with any syntax error never reaches the
resolver.
*/

use std::rc::Rc;

use crate::error::{KestrelError, Result};
use crate::token::{Token, TokenKind};

use log::{debug, info};

/// Identity of a variable-referencing AST node.  Two syntactically identical
/// but distinct occurrences carry different ids, so the resolver can record
/// binding distances per occurrence.
pub type ExprId = usize;

/// A **literal constant** that appears directly in the source code.
///
/// `Array` holds the element *expressions*, not values: an array literal is
/// re-evaluated freshly on every visit (no memoization).
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal — stored as IEEE-754 `f64`.  `inf` arrives here as
    /// `f64::INFINITY`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// `true` / `false`.
    Bool(bool),

    /// The `zilch` literal (Kestrel's null).
    Zilch,

    /// `[` expr-list `]` — ordered sequence of element expressions.
    Array(Vec<Expr>),
}

/// **Abstract-syntax-tree node** representing every kind of *expression*.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant.
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!ready`, `-42`.
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression: `a + b`, `x <= y`, `n mod 2`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short-circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Ternary conditional: `cond ? a : b`.
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Parenthesised sub-expression.
    Grouping(Box<Expr>),

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`.
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Prefix `inc x` — yields the *pre*-increment value.
    Inc { id: ExprId, name: Token },

    /// Prefix `dec x` — yields the *pre*-decrement value.
    Dec { id: ExprId, name: Token },

    /// Call expression: `callee(args…)`.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token — retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.property`.  `in_method` records whether the access occurs
    /// syntactically inside a class body (getters are bypassed there).
    Get {
        object: Box<Expr>,
        name: Token,
        in_method: bool,
    },

    /// `object.property = value`.
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
        in_method: bool,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },
}

/// A subroutine declaration: shared between `sub` statements and the four
/// method groups of a class body.  `Rc`-shared so closures can hold the
/// declaration without cloning bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// **Abstract-syntax-tree node** for *statements*.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// Evaluate-and-echo.  Never produced by the grammar (`print` is a native
    /// subroutine); the REPL wraps a bare expression statement in this to
    /// display its value.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `exit <expr>;` — terminate the process with an integer status.
    /// Bare `exit;` defaults the code to literal `0`.
    Exit { keyword: Token, code: Expr },

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.
    While { condition: Expr, body: Box<Stmt> },

    /// `inc x;` statement form.
    Inc { id: ExprId, name: Token },

    /// `dec x;` statement form.
    Dec { id: ExprId, name: Token },

    /// `break;` — only legal lexically inside a loop.
    Break,

    /// `continue;` — only legal lexically inside a loop.
    Continue,

    /// C-style three-clause `for`.  A missing condition was already defaulted
    /// to literal `true` by the parser.  Note: `for` does *not* open a scope
    /// of its own; the initializer declares into the surrounding scope.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Expr,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// Subroutine declaration — becomes a first-class callable value.
    Subroutine(Rc<SubroutineDecl>),

    /// `return` statement inside a subroutine body.
    Return {
        /// The `return` keyword token (for diagnostics).
        keyword: Token,

        /// Optional expression to return.  Absent ⇒ `zilch`.
        value: Option<Expr>,
    },

    /// Class declaration with four method groups.
    Class {
        name: Token,

        /// Superclass reference (`<-` arrow); always an `Expr::Variable`.
        superclass: Option<Expr>,

        methods: Vec<Rc<SubroutineDecl>>,
        static_methods: Vec<Rc<SubroutineDecl>>,
        get_methods: Vec<Rc<SubroutineDecl>>,
        set_methods: Vec<Rc<SubroutineDecl>>,
    },
}

/// Top-level parser over an owned token vector.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,

    /// Lexically inside a loop?  Guards `break`/`continue`.
    in_loop: bool,

    /// Lexically inside a class body?  Stamped onto `Get`/`Set` nodes.
    in_method: bool,

    /// Next fresh [`ExprId`].
    next_id: ExprId,

    /// Accumulated syntax errors (synchronization keeps the parse going).
    errors: Vec<KestrelError>,
}

impl Parser {
    /// Construct a new parser.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_first_id(tokens, 0)
    }

    /// Construct a parser whose node ids start at `first_id`.  When several
    /// inputs feed one interpreter (the REPL), each parse must resume where
    /// the previous one stopped: node ids key the interpreter's binding
    /// distances, so reusing one would let a new node inherit a stale
    /// distance recorded for an earlier input.
    pub fn with_first_id(tokens: Vec<Token>, first_id: ExprId) -> Self {
        info!(
            "Parser created with {} tokens, ids from {}",
            tokens.len(),
            first_id
        );

        Self {
            tokens,
            current: 0,
            in_loop: false,
            in_method: false,
            next_id: first_id,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Returns the statement list, or every syntax
    /// error collected along the way.
    pub fn parse(self) -> std::result::Result<Vec<Stmt>, Vec<KestrelError>> {
        self.parse_resuming().map(|(statements, _)| statements)
    }

    /// Like [`Parser::parse`], but also yields the next unused node id so a
    /// follow-up parse can continue the sequence via
    /// [`Parser::with_first_id`].
    pub fn parse_resuming(
        mut self,
    ) -> std::result::Result<(Vec<Stmt>, ExprId), Vec<KestrelError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok((statements, self.next_id))
        } else {
            Err(self.errors)
        }
    }

    /// Mint a fresh node identity.
    fn new_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Record a non-fatal syntax error and keep parsing.
    fn report(&mut self, token: &Token, message: &str) {
        debug!("Non-fatal parse error at '{}': {}", token.lexeme, message);

        self.errors.push(KestrelError::parse(token, message));
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration");

        if self.matches(TokenKind::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenKind::SUB) {
            let decl = self.subroutine("subroutine")?;
            Ok(Stmt::Subroutine(decl))
        } else if self.matches(TokenKind::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let enclosing_in_method = self.in_method;
        self.in_method = true;

        let result = self.class_body();

        self.in_method = enclosing_in_method;
        result
    }

    fn class_body(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenKind::IDENTIFIER, "Expect class name.")?.clone();

        let superclass: Option<Expr> = if self.matches(TokenKind::LESS_MINUS) {
            let super_name = self
                .consume(TokenKind::IDENTIFIER, "Expect superclass name.")?
                .clone();

            Some(Expr::Variable {
                id: self.new_id(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(TokenKind::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<SubroutineDecl>> = Vec::new();
        let mut static_methods: Vec<Rc<SubroutineDecl>> = Vec::new();
        let mut get_methods: Vec<Rc<SubroutineDecl>> = Vec::new();
        let mut set_methods: Vec<Rc<SubroutineDecl>> = Vec::new();

        while !self.check(TokenKind::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenKind::STATIC) {
                static_methods.push(self.subroutine("method")?);
            } else if self.matches(TokenKind::GET) {
                get_methods.push(self.subroutine("get method")?);
            } else if self.matches(TokenKind::SET) {
                set_methods.push(self.subroutine("set method")?);
            } else {
                methods.push(self.subroutine("method")?);
            }
        }

        self.consume(TokenKind::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
            static_methods,
            get_methods,
            set_methods,
        })
    }

    fn subroutine(&mut self, kind: &str) -> Result<Rc<SubroutineDecl>> {
        let name: Token = self
            .consume(TokenKind::IDENTIFIER, &format!("Expect {} name.", kind))?
            .clone();

        self.consume(
            TokenKind::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenKind::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "More than 255 parameters is not allowed.");
                }

                params.push(
                    self.consume(TokenKind::IDENTIFIER, "Expect parameter name.")?
                        .clone(),
                );

                if !self.matches(TokenKind::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after parameters.")?;

        // Computed-property arity rules: reported, but parsing continues.
        if kind == "get method" && !params.is_empty() {
            let token = self.peek().clone();
            self.report(&token, "Get methods cannot take any arguments.");
        }
        if kind == "set method" && params.len() != 1 {
            let token = self.peek().clone();
            self.report(&token, "Set methods must take exactly one argument.");
        }

        self.consume(
            TokenKind::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        // A body starts a fresh loop context: `break` inside a subroutine
        // cannot target a loop outside it.
        let enclosing_in_loop = self.in_loop;
        self.in_loop = false;

        let body = self.block();

        self.in_loop = enclosing_in_loop;

        Ok(Rc::new(SubroutineDecl {
            name,
            params,
            body: body?,
        }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenKind::IDENTIFIER, "Expect variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenKind::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenKind::IF) {
            self.if_statement()
        } else if self.matches(TokenKind::WHILE) {
            self.while_statement()
        } else if self.matches(TokenKind::FOR) {
            self.for_statement()
        } else if self.matches(TokenKind::EXIT) {
            self.exit_statement()
        } else if self.matches(TokenKind::INC) {
            self.inc_statement()
        } else if self.matches(TokenKind::DEC) {
            self.dec_statement()
        } else if self.matches(TokenKind::RETURN) {
            self.return_statement()
        } else if self.matches(TokenKind::BREAK) {
            self.break_statement()
        } else if self.matches(TokenKind::CONTINUE) {
            self.continue_statement()
        } else if self.matches(TokenKind::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenKind::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let enclosing_in_loop = self.in_loop;
        self.in_loop = true;

        let result = (|| {
            self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'while'.")?;
            let condition: Expr = self.expression()?;
            self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after condition.")?;
            let body: Box<Stmt> = Box::new(self.statement()?);

            Ok(Stmt::While { condition, body })
        })();

        self.in_loop = enclosing_in_loop;
        result
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let enclosing_in_loop = self.in_loop;
        self.in_loop = true;

        let result = (|| {
            self.consume(TokenKind::LEFT_PAREN, "Expect '(' after 'for'.")?;

            let initializer: Option<Box<Stmt>> = if self.matches(TokenKind::SEMICOLON) {
                None
            } else if self.matches(TokenKind::VAR) {
                Some(Box::new(self.var_declaration()?))
            } else {
                Some(Box::new(self.expression_statement()?))
            };

            let condition: Expr = if !self.check(TokenKind::SEMICOLON) {
                self.expression()?
            } else {
                // Missing condition defaults to `true`.
                Expr::Literal(LiteralValue::Bool(true))
            };
            self.consume(TokenKind::SEMICOLON, "Expect ';' after loop condition.")?;

            let increment: Option<Expr> = if !self.check(TokenKind::RIGHT_PAREN) {
                Some(self.expression()?)
            } else {
                None
            };
            self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after for clauses.")?;

            let body: Box<Stmt> = Box::new(self.statement()?);

            Ok(Stmt::For {
                initializer,
                condition,
                increment,
                body,
            })
        })();

        self.in_loop = enclosing_in_loop;
        result
    }

    fn exit_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.matches(TokenKind::SEMICOLON) {
            return Ok(Stmt::Exit {
                keyword,
                code: Expr::Literal(LiteralValue::Number(0.0)),
            });
        }

        let code: Expr = self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Exit { keyword, code })
    }

    fn inc_statement(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenKind::IDENTIFIER, "Expect variable name after 'inc'.")?
            .clone();
        self.consume(TokenKind::SEMICOLON, "Expect ';' after variable name.")?;

        Ok(Stmt::Inc {
            id: self.new_id(),
            name,
        })
    }

    fn dec_statement(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenKind::IDENTIFIER, "Expect variable name after 'dec'.")?
            .clone();
        self.consume(TokenKind::SEMICOLON, "Expect ';' after variable name.")?;

        Ok(Stmt::Dec {
            id: self.new_id(),
            name,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if !self.check(TokenKind::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        if !self.in_loop {
            let token = self.previous().clone();
            return Err(KestrelError::parse(
                &token,
                "Break statement must occur inside loop.",
            ));
        }

        self.consume(TokenKind::SEMICOLON, "Expect ';' after break statement.")?;
        Ok(Stmt::Break)
    }

    fn continue_statement(&mut self) -> Result<Stmt> {
        if !self.in_loop {
            let token = self.previous().clone();
            return Err(KestrelError::parse(
                &token,
                "Continue statement must occur inside loop.",
            ));
        }

        self.consume(TokenKind::SEMICOLON, "Expect ';' after continue statement.")?;
        Ok(Stmt::Continue)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expect ';' after value.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenKind::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenKind::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenKind::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(Expr::Assign {
                        id: self.new_id(),
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Get {
                    object,
                    name,
                    in_method,
                } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                        in_method,
                    });
                }

                _ => {
                    self.report(&equals, "Invalid assignment target.");
                    return Ok(expr);
                }
            }
        } else if self.matches_any(&[
            TokenKind::PLUS_EQUAL,
            TokenKind::MINUS_EQUAL,
            TokenKind::STAR_EQUAL,
            TokenKind::SLASH_EQUAL,
            TokenKind::CARET_EQUAL,
        ]) {
            let equals: Token = self.previous().clone();

            let (op_kind, op_lexeme) = match equals.kind {
                TokenKind::MINUS_EQUAL => (TokenKind::MINUS, "-"),
                TokenKind::STAR_EQUAL => (TokenKind::STAR, "*"),
                TokenKind::SLASH_EQUAL => (TokenKind::SLASH, "/"),
                TokenKind::CARET_EQUAL => (TokenKind::CARET, "^"),
                _ => (TokenKind::PLUS, "+"),
            };

            let value: Expr = self.assignment()?;

            if let Expr::Variable { ref name, .. } = expr {
                let name = name.clone();
                let operator = Token::synthetic(op_kind, op_lexeme, equals.line);

                // name = name <op> value
                return Ok(Expr::Assign {
                    id: self.new_id(),
                    name,
                    value: Box::new(Expr::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(value),
                    }),
                });
            }

            self.report(&equals, "Invalid assignment target.");
            return Ok(expr);
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenKind::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.conditional()?;

        while self.matches(TokenKind::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.conditional()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr> {
        let expr: Expr = self.equality()?;

        if self.matches(TokenKind::QUESTION) {
            let then_branch: Expr = self.expression()?;
            self.consume(TokenKind::COLON, "Expect ':' after conditional branch.")?;
            let else_branch: Expr = self.expression()?;

            return Ok(Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches_any(&[TokenKind::BANG_EQUAL, TokenKind::EQUAL_EQUAL]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.term()?;

        while self.matches_any(&[
            TokenKind::GREATER,
            TokenKind::GREATER_EQUAL,
            TokenKind::LESS,
            TokenKind::LESS_EQUAL,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches_any(&[TokenKind::PLUS, TokenKind::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.exponent()?;

        while self.matches_any(&[
            TokenKind::SLASH,
            TokenKind::STAR,
            TokenKind::MOD,
            TokenKind::DIV,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.exponent()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// `^` parses in the same left-associative loop as the other binary
    /// rules: `2 ^ 3 ^ 2` is `(2 ^ 3) ^ 2`.
    fn exponent(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenKind::CARET) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches_any(&[TokenKind::BANG, TokenKind::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.inc_dec_expr()?;

        loop {
            if self.matches(TokenKind::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenKind::DOT) {
                let name: Token = self
                    .consume(TokenKind::IDENTIFIER, "Expect property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                    in_method: self.in_method,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenKind::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "More than 255 arguments is not allowed.");
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenKind::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenKind::RIGHT_PAREN, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn inc_dec_expr(&mut self) -> Result<Expr> {
        if self.matches_any(&[TokenKind::INC, TokenKind::DEC]) {
            let operator: Token = self.previous().clone();
            let operand: Expr = self.primary()?;

            if let Expr::Variable { name, .. } = operand {
                let id = self.new_id();

                return Ok(if operator.kind == TokenKind::INC {
                    Expr::Inc { id, name }
                } else {
                    Expr::Dec { id, name }
                });
            }

            return Err(KestrelError::parse(
                &operator,
                "Expect variable after increment/decrement instruction.",
            ));
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenKind::FALSE) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if self.matches(TokenKind::TRUE) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if self.matches(TokenKind::ZILCH) {
            return Ok(Expr::Literal(LiteralValue::Zilch));
        }
        if self.matches(TokenKind::INF) {
            return Ok(Expr::Literal(LiteralValue::Number(f64::INFINITY)));
        }

        if self.matches(TokenKind::NUMBER(0.0)) {
            if let TokenKind::NUMBER(n) = self.previous().kind {
                return Ok(Expr::Literal(LiteralValue::Number(n)));
            }
        }

        if let TokenKind::STRING(ref s) = self.peek().kind {
            let s = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenKind::LEFT_SQUARE) {
            return self.array_literal();
        }

        if self.matches(TokenKind::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenKind::DOT, "Expect '.' after 'super'.")?;
            let method: Token = self
                .consume(TokenKind::IDENTIFIER, "Expect superclass method name.")?
                .clone();

            return Ok(Expr::Super {
                id: self.new_id(),
                keyword,
                method,
            });
        }

        if self.matches(TokenKind::THIS) {
            return Ok(Expr::This {
                id: self.new_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenKind::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: self.new_id(),
                name: self.previous().clone(),
            });
        }

        if self.matches(TokenKind::LEFT_PAREN) {
            let expr: Expr = self.expression()?;
            self.consume(TokenKind::RIGHT_PAREN, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(KestrelError::parse(&token, "Expect expression."))
    }

    /// `[` expr-list `]` — elements parse at logical-or precedence so a bare
    /// assignment or ternary cannot swallow the commas.
    fn array_literal(&mut self) -> Result<Expr> {
        let mut items: Vec<Expr> = Vec::new();

        if !self.check(TokenKind::RIGHT_SQUARE) {
            loop {
                if items.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "More than 255 items is not allowed.");
                }

                items.push(self.logical_or()?);

                if !self.matches(TokenKind::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RIGHT_SQUARE, "Expect ']' after array items.")?;

        Ok(Expr::Literal(LiteralValue::Array(items)))
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn matches_any(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(kind.clone()) {
                self.advance();
                return true;
            }
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        let token = self.peek().clone();
        Err(KestrelError::parse(&token, message))
    }

    #[inline(always)]
    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().kind == kind
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().kind, TokenKind::SEMICOLON) {
                return;
            }

            match self.peek().kind {
                TokenKind::CLASS
                | TokenKind::SUB
                | TokenKind::VAR
                | TokenKind::FOR
                | TokenKind::IF
                | TokenKind::WHILE
                | TokenKind::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
