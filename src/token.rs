use log::info;
use serde::Serialize;
use std::fmt;
use std::mem;

/// The different kinds of tokens recognized by the Kestrel scanner.
///
/// Variants without data represent single/double-character or keyword tokens.
/// `STRING(String)` and `NUMBER(f64)` carry their decoded literal values.
/// `IDENTIFIER` is used for user-defined names.
/// `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenKind {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_SQUARE,

    /// ']'
    RIGHT_SQUARE,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// '-'
    MINUS,

    /// '+'
    PLUS,

    /// ';'
    SEMICOLON,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '?'
    QUESTION,

    /// ':'
    COLON,

    /// '^'
    CARET,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '<-' (inheritance arrow)
    LESS_MINUS,

    /// '+='
    PLUS_EQUAL,

    /// '-='
    MINUS_EQUAL,

    /// '*='
    STAR_EQUAL,

    /// '/='
    SLASH_EQUAL,

    /// '^='
    CARET_EQUAL,

    /// A user-defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes)
    STRING(String),

    /// A numeric literal, already decoded to double precision
    #[serde(rename = "NUMBER")]
    NUMBER(f64),

    /// 'and'
    AND,

    /// 'class'
    CLASS,

    /// 'else'
    ELSE,

    /// 'false'
    FALSE,

    /// 'sub'
    SUB,

    /// 'for'
    FOR,

    /// 'if'
    IF,

    /// 'zilch'
    ZILCH,

    /// 'or'
    OR,

    /// 'return'
    RETURN,

    /// 'super'
    SUPER,

    /// 'this'
    THIS,

    /// 'true'
    TRUE,

    /// 'var'
    VAR,

    /// 'while'
    WHILE,

    /// 'exit'
    EXIT,

    /// 'inc'
    INC,

    /// 'dec'
    DEC,

    /// 'break'
    BREAK,

    /// 'continue'
    CONTINUE,

    /// 'mod'
    MOD,

    /// 'div'
    DIV,

    /// 'inf'
    INF,

    /// 'static'
    STATIC,

    /// 'get'
    GET,

    /// 'set'
    SET,

    /// End-of-file marker
    EOF,
}

impl PartialEq for TokenKind {
    /// Two TokenKinds are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenKind {
    /// Variant name without payloads, for token dumps.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::LEFT_PAREN => "LEFT_PAREN",
            TokenKind::RIGHT_PAREN => "RIGHT_PAREN",
            TokenKind::LEFT_BRACE => "LEFT_BRACE",
            TokenKind::RIGHT_BRACE => "RIGHT_BRACE",
            TokenKind::LEFT_SQUARE => "LEFT_SQUARE",
            TokenKind::RIGHT_SQUARE => "RIGHT_SQUARE",
            TokenKind::COMMA => "COMMA",
            TokenKind::DOT => "DOT",
            TokenKind::MINUS => "MINUS",
            TokenKind::PLUS => "PLUS",
            TokenKind::SEMICOLON => "SEMICOLON",
            TokenKind::SLASH => "SLASH",
            TokenKind::STAR => "STAR",
            TokenKind::QUESTION => "QUESTION",
            TokenKind::COLON => "COLON",
            TokenKind::CARET => "CARET",
            TokenKind::BANG => "BANG",
            TokenKind::BANG_EQUAL => "BANG_EQUAL",
            TokenKind::EQUAL => "EQUAL",
            TokenKind::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenKind::GREATER => "GREATER",
            TokenKind::GREATER_EQUAL => "GREATER_EQUAL",
            TokenKind::LESS => "LESS",
            TokenKind::LESS_EQUAL => "LESS_EQUAL",
            TokenKind::LESS_MINUS => "LESS_MINUS",
            TokenKind::PLUS_EQUAL => "PLUS_EQUAL",
            TokenKind::MINUS_EQUAL => "MINUS_EQUAL",
            TokenKind::STAR_EQUAL => "STAR_EQUAL",
            TokenKind::SLASH_EQUAL => "SLASH_EQUAL",
            TokenKind::CARET_EQUAL => "CARET_EQUAL",
            TokenKind::IDENTIFIER => "IDENTIFIER",
            TokenKind::STRING(_) => "STRING",
            TokenKind::NUMBER(_) => "NUMBER",
            TokenKind::AND => "AND",
            TokenKind::CLASS => "CLASS",
            TokenKind::ELSE => "ELSE",
            TokenKind::FALSE => "FALSE",
            TokenKind::SUB => "SUB",
            TokenKind::FOR => "FOR",
            TokenKind::IF => "IF",
            TokenKind::ZILCH => "ZILCH",
            TokenKind::OR => "OR",
            TokenKind::RETURN => "RETURN",
            TokenKind::SUPER => "SUPER",
            TokenKind::THIS => "THIS",
            TokenKind::TRUE => "TRUE",
            TokenKind::VAR => "VAR",
            TokenKind::WHILE => "WHILE",
            TokenKind::EXIT => "EXIT",
            TokenKind::INC => "INC",
            TokenKind::DEC => "DEC",
            TokenKind::BREAK => "BREAK",
            TokenKind::CONTINUE => "CONTINUE",
            TokenKind::MOD => "MOD",
            TokenKind::DIV => "DIV",
            TokenKind::INF => "INF",
            TokenKind::STATIC => "STATIC",
            TokenKind::GET => "GET",
            TokenKind::SET => "SET",
            TokenKind::EOF => "EOF",
        }
    }
}

/// A scanned token, including its kind, the original lexeme,
/// and the line number where it was found.  Immutable once produced.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    /// The category of this token.
    pub kind: TokenKind,

    /// The exact substring from the source that produced this token.
    pub lexeme: String,

    /// 1-based line number in the source.
    pub line: usize,
}

impl Token {
    /// Create a new Token with the given kind, lexeme, and line.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        let lexeme: String = lexeme.into();

        info!(
            "Creating new token: kind={:?}, lexeme={}, line={}",
            kind, lexeme, line
        );

        Self { kind, lexeme, line }
    }

    /// Synthesize a token that does not come from source text (used when the
    /// parser desugars compound assignment into a plain binary operator).
    pub fn synthetic(kind: TokenKind, lexeme: &str, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_owned(),
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Decoded literal column: strings print their contents, numbers print
        // with an explicit ".0" when integral, everything else prints "null".
        let literal: String = match &self.kind {
            TokenKind::STRING(s) => s.clone(),
            TokenKind::NUMBER(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    // 3 -> "3.0" (itoa avoids float formatting on this path)
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    format!("{}.0", buf.format(*n as i64))
                } else {
                    n.to_string()
                }
            }
            _ => "null".to_owned(),
        };

        write!(f, "{} {} {}", self.kind.name(), self.lexeme, literal)
    }
}
