//! Module `scanner` implements a one-pass, streaming UTF-8 lexer for the
//! Kestrel language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of [`Token`]s,
//! skipping whitespace and comments, and emitting exactly one `EOF` token at
//! the end.  Designed as a `FusedIterator`, it can be chained safely with
//! other iterator adapters.
//!
//! The scanner is error-tolerant: an unexpected character or malformed
//! literal yields an `Err` item and scanning continues with the next byte,
//! so a single pass collects every lexical diagnostic in the file.

use crate::error::{KestrelError, Result};
use crate::token::{Token, TokenKind};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenKind> = phf_map! {
    b"and"      => TokenKind::AND,
    b"class"    => TokenKind::CLASS,
    b"else"     => TokenKind::ELSE,
    b"false"    => TokenKind::FALSE,
    b"true"     => TokenKind::TRUE,
    b"for"      => TokenKind::FOR,
    b"sub"      => TokenKind::SUB,
    b"if"       => TokenKind::IF,
    b"zilch"    => TokenKind::ZILCH,
    b"or"       => TokenKind::OR,
    b"return"   => TokenKind::RETURN,
    b"super"    => TokenKind::SUPER,
    b"this"     => TokenKind::THIS,
    b"var"      => TokenKind::VAR,
    b"while"    => TokenKind::WHILE,
    b"exit"     => TokenKind::EXIT,
    b"inc"      => TokenKind::INC,
    b"dec"      => TokenKind::DEC,
    b"break"    => TokenKind::BREAK,
    b"continue" => TokenKind::CONTINUE,
    b"mod"      => TokenKind::MOD,
    b"div"      => TokenKind::DIV,
    b"inf"      => TokenKind::INF,
    b"static"   => TokenKind::STATIC,
    b"get"      => TokenKind::GET,
    b"set"      => TokenKind::SET,
};

/// Radix of a numeric literal, selected by its `0b`/`0x` prefix.
#[derive(Copy, Clone, PartialEq, Eq)]
enum NumBase {
    Binary,
    Decimal,
    Hexadecimal,
}

/// A single pass **scanner / lexer** that converts raw UTF-8 bytes into a
/// sequence of [`Token`]s.  The lifetime `'a` ties the scanner to the source
/// buffer; emitted tokens own their lexemes.
pub struct Scanner<'a> {
    src: &'a [u8],             // entire source file
    start: usize,              // index of the *first* byte of the current lexeme
    curr: usize,               // index *one past* the last byte examined
    line: usize,               // 1-based line counter (\n increments)
    pending: Option<TokenKind>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input slice.
    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Higher-level code always guards with
    /// [`Self::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past EOF
    /// to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`Self::peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    /// Returns `true` on success so callers can branch inline without an else.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces
    /// an actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenKind::LEFT_PAREN),
            b')' => self.pending = Some(TokenKind::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenKind::LEFT_BRACE),
            b'}' => self.pending = Some(TokenKind::RIGHT_BRACE),
            b'[' => self.pending = Some(TokenKind::LEFT_SQUARE),
            b']' => self.pending = Some(TokenKind::RIGHT_SQUARE),
            b',' => self.pending = Some(TokenKind::COMMA),
            b'.' => self.pending = Some(TokenKind::DOT),
            b';' => self.pending = Some(TokenKind::SEMICOLON),
            b'?' => self.pending = Some(TokenKind::QUESTION),
            b':' => self.pending = Some(TokenKind::COLON),

            // ── operators with an optional '=' suffix ─────────────────────
            b'+' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::PLUS_EQUAL
                } else {
                    TokenKind::PLUS
                };

                self.pending = Some(tt);
            }

            b'-' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::MINUS_EQUAL
                } else {
                    TokenKind::MINUS
                };

                self.pending = Some(tt);
            }

            b'*' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::STAR_EQUAL
                } else {
                    TokenKind::STAR
                };

                self.pending = Some(tt);
            }

            b'^' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::CARET_EQUAL
                } else {
                    TokenKind::CARET
                };

                self.pending = Some(tt);
            }

            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::BANG_EQUAL
                } else {
                    TokenKind::BANG
                };

                self.pending = Some(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::EQUAL_EQUAL
                } else {
                    TokenKind::EQUAL
                };

                self.pending = Some(tt);
            }

            // '<' is greedy longest-match: '<=' then '<-' then '<'.
            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::LESS_EQUAL
                } else if self.match_byte(b'-') {
                    TokenKind::LESS_MINUS
                } else {
                    TokenKind::LESS
                };

                self.pending = Some(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenKind::GREATER_EQUAL
                } else {
                    TokenKind::GREATER
                };

                self.pending = Some(tt);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(()); // skip insignificants
            }

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(());
            }

            // ── comments (// … until newline) and '/' '/=' ───────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to next newline using `memchr`.
                    // If none found, skip to EOF.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                let tt = if self.match_byte(b'=') {
                    TokenKind::SLASH_EQUAL
                } else {
                    TokenKind::SLASH
                };

                self.pending = Some(tt);
            }

            // ── string literal, either quote character ───────────────────
            b'"' => {
                return self.parse_string(b'"');
            }

            b'\'' => {
                return self.parse_string(b'\'');
            }

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => {
                return self.parse_number();
            }

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(KestrelError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        }

        Ok(())
    }

    /// Parse a string literal delimited by `quote`.
    ///
    /// * `self.start` still points to the opening quote.
    /// * When we return, `self.curr` points **past** the closing quote.
    ///
    /// Strings may span lines; the line counter keeps tracking.
    fn parse_string(&mut self, quote: u8) -> Result<()> {
        while !self.is_at_end() && self.peek() != quote {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(KestrelError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];
        let s: String = String::from_utf8_lossy(slice).into_owned();

        self.pending = Some(TokenKind::STRING(s));

        Ok(())
    }

    /// Parse a numeric literal: decimal (`123`, `3.14`), binary (`0b1010`) or
    /// hexadecimal (`0xff`).  Explicit-base literals decode through a 64-bit
    /// integer so values wider than 32 bits survive; every number ends up as
    /// an `f64`.
    fn parse_number(&mut self) -> Result<()> {
        let mut base = NumBase::Decimal;

        if self.src[self.start] == b'0' && self.peek() == b'b' {
            self.advance();
            base = NumBase::Binary;
        } else if self.src[self.start] == b'0' && self.peek() == b'x' {
            self.advance();
            base = NumBase::Hexadecimal;
        }

        if base != NumBase::Decimal && !is_digit_in_base(self.peek(), base) {
            return Err(KestrelError::lex(
                self.line,
                "invalid character following base literal.",
            ));
        }

        while is_digit_in_base(self.peek(), base) {
            self.advance();
        }

        // Optional fractional part, decimal literals only.
        if base == NumBase::Decimal && self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let slice: &[u8] = &self.src[self.start..self.curr];
        // Lexeme bytes are ASCII by construction.
        let s: &str = std::str::from_utf8(slice).unwrap_or("0");

        let n: f64 = match base {
            NumBase::Decimal => s.parse::<f64>().unwrap_or(0.0),
            NumBase::Binary => u64::from_str_radix(&s[2..], 2)
                .map_err(|_| KestrelError::lex(self.line, "Binary literal out of range."))?
                as f64,
            NumBase::Hexadecimal => u64::from_str_radix(&s[2..], 16)
                .map_err(|_| KestrelError::lex(self.line, "Hexadecimal literal out of range."))?
                as f64,
        };

        self.pending = Some(TokenKind::NUMBER(n));

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenKind = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenKind::IDENTIFIER);

        self.pending = Some(tt);
    }
}

/// Membership test for a digit under the given radix.
#[inline(always)]
fn is_digit_in_base(c: u8, base: NumBase) -> bool {
    match base {
        NumBase::Binary => c == b'0' || c == b'1',
        NumBase::Decimal => c.is_ascii_digit(),
        NumBase::Hexadecimal => c.is_ascii_hexdigit(),
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenKind::EOF, "", self.line)));
            }

            // 2. Reset per-token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let slice: &[u8] = &self.src[self.start..self.curr];
                let lex: String = String::from_utf8_lossy(slice).into_owned();
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lex, self.line)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
