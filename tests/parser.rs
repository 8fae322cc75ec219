#[cfg(test)]
mod parser_tests {
    use kestrel::ast_printer::AstPrinter;
    use kestrel::error::KestrelError;
    use kestrel::parser::{Parser, Stmt};
    use kestrel::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<KestrelError>> {
        let tokens: Vec<_> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("source should scan cleanly");

        Parser::new(tokens).parse()
    }

    fn parse_to_string(source: &str) -> String {
        let statements = parse(source).expect("source should parse cleanly");
        AstPrinter::new().print_program(&statements)
    }

    fn parse_errors(source: &str) -> Vec<String> {
        parse(source)
            .expect_err("source should fail to parse")
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_parser_01_arithmetic_precedence() {
        assert_eq!(parse_to_string("1 + 2 * 3;"), "(expr (+ 1.0 (* 2.0 3.0)))");
    }

    #[test]
    fn test_parser_02_exponent_is_left_associative() {
        assert_eq!(
            parse_to_string("2 ^ 3 ^ 2;"),
            "(expr (^ (^ 2.0 3.0) 2.0))"
        );
    }

    #[test]
    fn test_parser_03_exponent_binds_tighter_than_factor() {
        assert_eq!(
            parse_to_string("2 * 3 ^ 2;"),
            "(expr (* 2.0 (^ 3.0 2.0)))"
        );
    }

    #[test]
    fn test_parser_04_mod_div_at_factor_precedence() {
        assert_eq!(
            parse_to_string("1 + 7 mod 3;"),
            "(expr (+ 1.0 (mod 7.0 3.0)))"
        );
        assert_eq!(
            parse_to_string("10 div 3 - 1;"),
            "(expr (- (div 10.0 3.0) 1.0))"
        );
    }

    #[test]
    fn test_parser_05_compound_assignment_desugars() {
        assert_eq!(parse_to_string("x += 1;"), "(expr (= x (+ x 1.0)))");
        assert_eq!(parse_to_string("x ^= 2;"), "(expr (= x (^ x 2.0)))");
    }

    #[test]
    fn test_parser_06_ternary() {
        assert_eq!(parse_to_string("a ? 1 : 2;"), "(expr (? a 1.0 2.0))");
    }

    #[test]
    fn test_parser_07_array_literals() {
        assert_eq!(parse_to_string("[1, 2, 3];"), "(expr (array 1.0 2.0 3.0))");
        assert_eq!(parse_to_string("[];"), "(expr (array))");
    }

    #[test]
    fn test_parser_08_for_with_empty_clauses() {
        assert_eq!(
            parse_to_string("for (;;) break;"),
            "(for () true () (break))"
        );
    }

    #[test]
    fn test_parser_09_exit_defaults_to_zero() {
        assert_eq!(parse_to_string("exit;"), "(exit 0.0)");
        assert_eq!(parse_to_string("exit 64;"), "(exit 64.0)");
    }

    #[test]
    fn test_parser_10_class_with_method_groups() {
        let out = parse_to_string(
            "class Point <- Base { construct(x) { } static origin() { } get size() { } set size(v) { } }",
        );

        assert!(out.starts_with("(class Point (<- Base)"));
        assert!(out.contains("(method construct (x) )"));
        assert!(out.contains("(static origin () )"));
        assert!(out.contains("(get size () )"));
        assert!(out.contains("(set size (v) )"));
    }

    #[test]
    fn test_parser_11_break_outside_loop_is_error() {
        let errors = parse_errors("break;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Break statement must occur inside loop."));
    }

    #[test]
    fn test_parser_12_continue_only_inside_loop() {
        assert!(parse("while (true) { continue; }").is_ok());

        let errors = parse_errors("sub f() { continue; }");
        assert!(errors[0].contains("Continue statement must occur inside loop."));
    }

    #[test]
    fn test_parser_13_loop_context_does_not_leak_into_subroutines() {
        // A subroutine body nested in a loop is not itself a loop.
        let errors = parse_errors("while (true) { sub f() { break; } }");

        assert!(errors[0].contains("Break statement must occur inside loop."));
    }

    #[test]
    fn test_parser_14_invalid_assignment_target() {
        let errors = parse_errors("1 = 2;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Invalid assignment target."));
    }

    #[test]
    fn test_parser_15_inc_requires_variable_operand() {
        let errors = parse_errors("var a = inc 1;");

        assert!(errors[0].contains("Expect variable after increment/decrement instruction."));
    }

    #[test]
    fn test_parser_16_getter_and_setter_arity() {
        let errors = parse_errors("class A { get x(a) { } }");
        assert!(errors[0].contains("Get methods cannot take any arguments."));

        let errors = parse_errors("class A { set x() { } }");
        assert!(errors[0].contains("Set methods must take exactly one argument."));
    }

    #[test]
    fn test_parser_17_synchronize_collects_multiple_errors() {
        let errors = parse_errors("var = 1; var y = 2; var = 3;");

        assert_eq!(errors.len(), 2);
        for error in &errors {
            assert!(error.contains("Expect variable name."));
        }
    }

    #[test]
    fn test_parser_18_error_location_formatting() {
        let errors = parse_errors("var = 1;");
        assert!(errors[0].starts_with("[line 1] Error at '=':"));

        let errors = parse_errors("1 +");
        assert!(errors[0].contains(" at end"));
    }

    #[test]
    fn test_parser_19_super_and_this() {
        let out = parse_to_string("class B <- A { m() { return super.m; } n() { return this; } }");

        assert!(out.contains("(return (super m))"));
        assert!(out.contains("(return this)"));
    }

    #[test]
    fn test_parser_20_property_chains() {
        assert_eq!(
            parse_to_string("a.b.c = a.b(1).d;"),
            "(expr (set (get a b) c (get (call (get a b) 1.0) d)))"
        );
    }
}
