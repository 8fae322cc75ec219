#[cfg(test)]
mod scanner_tests {
    use kestrel::scanner::*;
    use kestrel::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenKind, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_kind, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.kind, *expected_kind);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})[]?:^",
            &[
                (TokenKind::LEFT_PAREN, "("),
                (TokenKind::LEFT_BRACE, "{"),
                (TokenKind::STAR, "*"),
                (TokenKind::DOT, "."),
                (TokenKind::COMMA, ","),
                (TokenKind::PLUS, "+"),
                (TokenKind::STAR, "*"),
                (TokenKind::RIGHT_BRACE, "}"),
                (TokenKind::RIGHT_PAREN, ")"),
                (TokenKind::LEFT_SQUARE, "["),
                (TokenKind::RIGHT_SQUARE, "]"),
                (TokenKind::QUESTION, "?"),
                (TokenKind::COLON, ":"),
                (TokenKind::CARET, "^"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_less_disambiguation() {
        assert_token_sequence(
            "< <= <- <",
            &[
                (TokenKind::LESS, "<"),
                (TokenKind::LESS_EQUAL, "<="),
                (TokenKind::LESS_MINUS, "<-"),
                (TokenKind::LESS, "<"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_compound_assignment_operators() {
        assert_token_sequence(
            "+= -= *= /= ^= = ==",
            &[
                (TokenKind::PLUS_EQUAL, "+="),
                (TokenKind::MINUS_EQUAL, "-="),
                (TokenKind::STAR_EQUAL, "*="),
                (TokenKind::SLASH_EQUAL, "/="),
                (TokenKind::CARET_EQUAL, "^="),
                (TokenKind::EQUAL, "="),
                (TokenKind::EQUAL_EQUAL, "=="),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_keywords() {
        assert_token_sequence(
            "sub zilch exit inc dec break continue mod div inf static get set",
            &[
                (TokenKind::SUB, "sub"),
                (TokenKind::ZILCH, "zilch"),
                (TokenKind::EXIT, "exit"),
                (TokenKind::INC, "inc"),
                (TokenKind::DEC, "dec"),
                (TokenKind::BREAK, "break"),
                (TokenKind::CONTINUE, "continue"),
                (TokenKind::MOD, "mod"),
                (TokenKind::DIV, "div"),
                (TokenKind::INF, "inf"),
                (TokenKind::STATIC, "static"),
                (TokenKind::GET, "get"),
                (TokenKind::SET, "set"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_keyword_prefixed_identifiers() {
        assert_token_sequence(
            "subroutine classy modulo increment",
            &[
                (TokenKind::IDENTIFIER, "subroutine"),
                (TokenKind::IDENTIFIER, "classy"),
                (TokenKind::IDENTIFIER, "modulo"),
                (TokenKind::IDENTIFIER, "increment"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_decimal_numbers() {
        let scanner = Scanner::new(b"42 3.14" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::NUMBER(0.0));
        assert!(matches!(tokens[0].kind, TokenKind::NUMBER(n) if n == 42.0));
        assert!(matches!(tokens[1].kind, TokenKind::NUMBER(n) if n == 3.14));
    }

    #[test]
    fn test_scanner_07_based_numbers() {
        let scanner = Scanner::new(b"0xFF 0b101" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[0].kind, TokenKind::NUMBER(n) if n == 255.0));
        assert!(matches!(tokens[1].kind, TokenKind::NUMBER(n) if n == 5.0));
    }

    #[test]
    fn test_scanner_08_bad_base_literal() {
        let scanner = Scanner::new(b"0xZ" as &[u8]);
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("invalid character following base literal."));
    }

    #[test]
    fn test_scanner_09_both_quote_styles() {
        let scanner = Scanner::new(br#""double" 'single'"# as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0].kind, TokenKind::STRING(s) if s == "double"));
        assert!(matches!(&tokens[1].kind, TokenKind::STRING(s) if s == "single"));
    }

    #[test]
    fn test_scanner_10_multiline_string_advances_line() {
        let scanner = Scanner::new(b"\"a\nb\" x" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert!(matches!(&tokens[0].kind, TokenKind::STRING(s) if s == "a\nb"));
        // The identifier after the string sits on line 2.
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_scanner_11_unterminated_string() {
        let scanner = Scanner::new(b"\"oops" as &[u8]);
        let errors: Vec<_> = scanner.filter_map(Result::err).collect();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unterminated string."));
    }

    #[test]
    fn test_scanner_12_comments_skipped() {
        assert_token_sequence(
            "var x; // trailing comment\n// whole-line comment\nx;",
            &[
                (TokenKind::VAR, "var"),
                (TokenKind::IDENTIFIER, "x"),
                (TokenKind::SEMICOLON, ";"),
                (TokenKind::IDENTIFIER, "x"),
                (TokenKind::SEMICOLON, ";"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_13_unexpected_character_recovers() {
        let scanner = Scanner::new(b",$." as &[u8]);
        let results: Vec<_> = scanner.collect();

        assert_eq!(results.len(), 4); // comma, error, dot, EOF

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 1);

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(err.to_string().contains("Unexpected character"));
        }
    }

    #[test]
    fn test_scanner_14_line_tracking() {
        let scanner = Scanner::new(b"a\nb\n\nc" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_scanner_15_token_display_format() {
        let scanner = Scanner::new(b"3 'hi'" as &[u8]);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens[0].to_string(), "NUMBER 3 3.0");
        assert_eq!(tokens[1].to_string(), "STRING 'hi' hi");
        assert_eq!(tokens[2].to_string(), "EOF  null");
    }
}
