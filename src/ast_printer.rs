//! Parenthesized-prefix rendering of the AST, used by the `parse`
//! subcommand to dump what the parser produced.

use crate::parser::{Expr, LiteralValue, Stmt, SubroutineDecl};

pub struct AstPrinter;

impl AstPrinter {
    pub fn new() -> Self {
        Self
    }

    /// Render a whole program, one statement per line.
    pub fn print_program(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(expr {})", self.print(expr)),

            Stmt::Print(expr) => format!("(echo {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let inner = statements
                    .iter()
                    .map(|s| self.print_stmt(s))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("(block {})", inner)
            }

            Stmt::Exit { code, .. } => format!("(exit {})", self.print(code)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let init = initializer
                    .as_ref()
                    .map_or_else(|| "()".to_owned(), |s| self.print_stmt(s));
                let inc = increment
                    .as_ref()
                    .map_or_else(|| "()".to_owned(), |e| self.print(e));

                format!(
                    "(for {} {} {} {})",
                    init,
                    self.print(condition),
                    inc,
                    self.print_stmt(body)
                )
            }

            Stmt::Inc { name, .. } => format!("(inc {})", name.lexeme),

            Stmt::Dec { name, .. } => format!("(dec {})", name.lexeme),

            Stmt::Break => "(break)".to_owned(),

            Stmt::Continue => "(continue)".to_owned(),

            Stmt::Subroutine(decl) => self.print_subroutine("sub", decl),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_owned(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
                static_methods,
                get_methods,
                set_methods,
            } => {
                let mut out = format!("(class {}", name.lexeme);

                if let Some(superclass) = superclass {
                    out.push_str(&format!(" (<- {})", self.print(superclass)));
                }

                for method in methods {
                    out.push(' ');
                    out.push_str(&self.print_subroutine("method", method));
                }
                for method in static_methods {
                    out.push(' ');
                    out.push_str(&self.print_subroutine("static", method));
                }
                for method in get_methods {
                    out.push(' ');
                    out.push_str(&self.print_subroutine("get", method));
                }
                for method in set_methods {
                    out.push(' ');
                    out.push_str(&self.print_subroutine("set", method));
                }

                out.push(')');
                out
            }
        }
    }

    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => self.print_literal(literal),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => format!(
                "(? {} {} {})",
                self.print(condition),
                self.print(then_branch),
                self.print(else_branch)
            ),

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Inc { name, .. } => format!("(inc {})", name.lexeme),

            Expr::Dec { name, .. } => format!("(dec {})", name.lexeme),

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print(argument));
                }
                out.push(')');
                out
            }

            Expr::Get { object, name, .. } => {
                format!("(get {} {})", self.print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
                ..
            } => format!(
                "(set {} {} {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_owned(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    fn print_literal(&self, literal: &LiteralValue) -> String {
        match literal {
            LiteralValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    // Integral numbers keep an explicit decimal in AST dumps.
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }

            LiteralValue::Str(s) => s.clone(),

            LiteralValue::Bool(b) => b.to_string(),

            LiteralValue::Zilch => "zilch".to_owned(),

            LiteralValue::Array(items) => {
                let mut out = String::from("(array");
                for item in items {
                    out.push(' ');
                    out.push_str(&self.print(item));
                }
                out.push(')');
                out
            }
        }
    }

    fn print_subroutine(&self, kind: &str, decl: &SubroutineDecl) -> String {
        let params = decl
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let body = decl
            .body
            .iter()
            .map(|s| self.print_stmt(s))
            .collect::<Vec<_>>()
            .join(" ");

        format!("({} {} ({}) {})", kind, decl.name.lexeme, params, body)
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}
