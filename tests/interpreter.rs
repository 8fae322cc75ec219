#[cfg(test)]
mod interpreter_tests {
    use kestrel::error::KestrelError;
    use kestrel::interpreter::Interpreter;
    use kestrel::parser::Parser;
    use kestrel::resolver::Resolver;
    use kestrel::scanner::Scanner;
    use kestrel::value::Value;

    /// Run a program through the whole pipeline, returning the interpreter so
    /// tests can inspect the global frame afterwards.
    fn run(source: &str) -> Result<Interpreter, KestrelError> {
        let tokens: Vec<_> = Scanner::new(source.as_bytes())
            .collect::<Result<_, _>>()
            .expect("source should scan cleanly");

        let statements = Parser::new(tokens)
            .parse()
            .expect("source should parse cleanly");

        let mut interpreter = Interpreter::new();

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("source should resolve cleanly");

        interpreter.interpret(&statements)?;
        Ok(interpreter)
    }

    fn global(interpreter: &Interpreter, name: &str) -> Value {
        interpreter
            .globals()
            .borrow()
            .get(name, 0)
            .unwrap_or_else(|_| panic!("global '{}' should exist", name))
    }

    fn run_error(source: &str) -> String {
        run(source).expect_err("program should fail").to_string()
    }

    #[test]
    fn test_interp_01_arithmetic_operators() {
        let interpreter = run(
            "var q = 1 div 2;
             var m = -1 mod 3;
             var p = 2 ^ 10;
             var chained = 2 ^ 3 ^ 2;
             var neg_floor = -7 div 2;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "q"), Value::Number(0.0));
        // Remainder keeps the dividend's sign.
        assert_eq!(global(&interpreter, "m"), Value::Number(-1.0));
        assert_eq!(global(&interpreter, "p"), Value::Number(1024.0));
        // Left-associative exponent: (2 ^ 3) ^ 2.
        assert_eq!(global(&interpreter, "chained"), Value::Number(64.0));
        // Floor division rounds toward negative infinity.
        assert_eq!(global(&interpreter, "neg_floor"), Value::Number(-4.0));
    }

    #[test]
    fn test_interp_02_division_by_zero_yields_infinity() {
        let interpreter = run("var p = 1 / 0; var n = -1 / 0;").unwrap();

        assert_eq!(global(&interpreter, "p"), Value::Number(f64::INFINITY));
        assert_eq!(global(&interpreter, "n"), Value::Number(f64::NEG_INFINITY));
        assert_eq!(global(&interpreter, "p").to_string(), "+inf");
        assert_eq!(global(&interpreter, "n").to_string(), "-inf");
    }

    #[test]
    fn test_interp_03_zero_is_truthy() {
        let interpreter = run(
            "var a = 0 ? \"yes\" : \"no\";
             var b = \"\" ? \"yes\" : \"no\";
             var c = zilch ? \"yes\" : \"no\";
             var d = false ? \"yes\" : \"no\";",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "a"), Value::Str("yes".into()));
        assert_eq!(global(&interpreter, "b"), Value::Str("yes".into()));
        assert_eq!(global(&interpreter, "c"), Value::Str("no".into()));
        assert_eq!(global(&interpreter, "d"), Value::Str("no".into()));
    }

    #[test]
    fn test_interp_04_string_concatenation_and_plus_errors() {
        let interpreter = run("var s = \"foo\" + 'bar';").unwrap();
        assert_eq!(global(&interpreter, "s"), Value::Str("foobar".into()));

        let message = run_error("var s = \"foo\" + 1;");
        assert!(message.contains("Operands must be two numbers or two strings."));
    }

    #[test]
    fn test_interp_05_logical_operators_yield_operands() {
        let interpreter = run(
            "var a = zilch or \"fallback\";
             var b = \"first\" or \"second\";
             var c = zilch and \"unreached\";",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "a"), Value::Str("fallback".into()));
        assert_eq!(global(&interpreter, "b"), Value::Str("first".into()));
        assert_eq!(global(&interpreter, "c"), Value::Zilch);
    }

    #[test]
    fn test_interp_06_stringify() {
        let interpreter = run(
            "var n = string(3.0);
             var f = string(2.5);
             var z = string(zilch);
             var arr = string([1, 2]);
             var t = string(true);",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "n"), Value::Str("3".into()));
        assert_eq!(global(&interpreter, "f"), Value::Str("2.5".into()));
        assert_eq!(global(&interpreter, "z"), Value::Str("zilch".into()));
        assert_eq!(global(&interpreter, "arr"), Value::Str("[1, 2]".into()));
        assert_eq!(global(&interpreter, "t"), Value::Str("true".into()));
    }

    #[test]
    fn test_interp_07_inc_dec_yield_previous_value() {
        let interpreter = run(
            "var x = 5;
             var before = inc x;
             var y = 3;
             var before2 = dec y;
             inc x;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "before"), Value::Number(5.0));
        assert_eq!(global(&interpreter, "x"), Value::Number(7.0));
        assert_eq!(global(&interpreter, "before2"), Value::Number(3.0));
        assert_eq!(global(&interpreter, "y"), Value::Number(2.0));
    }

    #[test]
    fn test_interp_08_compound_assignment() {
        let interpreter = run(
            "var x = 10;
             x += 5;
             x -= 3;
             x *= 2;
             x /= 4;
             x ^= 2;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "x"), Value::Number(36.0));
    }

    #[test]
    fn test_interp_09_closures_capture_environments() {
        let interpreter = run(
            "sub make_counter() {
                 var count = 0;
                 sub tick() {
                     count = count + 1;
                     return count;
                 }
                 return tick;
             }
             var counter = make_counter();
             counter();
             counter();
             var third = counter();
             var fresh = make_counter()();",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "third"), Value::Number(3.0));
        assert_eq!(global(&interpreter, "fresh"), Value::Number(1.0));
    }

    #[test]
    fn test_interp_10_static_scoping_survives_shadowing() {
        let interpreter = run(
            "var a = \"outer\";
             var r1 = zilch;
             var r2 = zilch;
             {
                 sub show() { return a; }
                 r1 = show();
                 var a = \"inner\";
                 r2 = show();
             }",
        )
        .unwrap();

        // The closure is bound to the declaration visible where it was
        // defined, not to whatever later shadows the name.
        assert_eq!(global(&interpreter, "r1"), Value::Str("outer".into()));
        assert_eq!(global(&interpreter, "r2"), Value::Str("outer".into()));
    }

    #[test]
    fn test_interp_11_array_identity() {
        let interpreter = run(
            "var a = [1, 2];
             var b = a;
             var same = a == b;
             var fresh = a == [1, 2];",
        )
        .unwrap();

        // Assignment aliases; a second literal is a distinct sequence.
        assert_eq!(global(&interpreter, "same"), Value::Bool(true));
        assert_eq!(global(&interpreter, "fresh"), Value::Bool(false));
    }

    #[test]
    fn test_interp_12_array_literals_rebuild_each_evaluation() {
        let interpreter = run(
            "var n = 1;
             var a = [n, n + 1];
             n = 10;
             var b = [n, n + 1];
             var first = string(a);
             var second = string(b);",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "first"), Value::Str("[1, 2]".into()));
        assert_eq!(global(&interpreter, "second"), Value::Str("[10, 11]".into()));
    }

    #[test]
    fn test_interp_13_while_break_continue() {
        let interpreter = run(
            "var sum = 0;
             var i = 0;
             while (true) {
                 i = i + 1;
                 if (i > 10) break;
                 if (i mod 2 == 0) continue;
                 sum = sum + i;
             }",
        )
        .unwrap();

        // 1 + 3 + 5 + 7 + 9
        assert_eq!(global(&interpreter, "sum"), Value::Number(25.0));
    }

    #[test]
    fn test_interp_14_for_continue_still_runs_increment() {
        let interpreter = run(
            "var sum = 0;
             for (var i = 0; i < 5; i = i + 1) {
                 if (i == 2) continue;
                 sum = sum + i;
             }
             var leaked = i;",
        )
        .unwrap();

        // 0 + 1 + 3 + 4
        assert_eq!(global(&interpreter, "sum"), Value::Number(8.0));
        // The loop variable lives in the surrounding scope.
        assert_eq!(global(&interpreter, "leaked"), Value::Number(5.0));
    }

    #[test]
    fn test_interp_15_classes_fields_and_methods() {
        let interpreter = run(
            "class Point {
                 construct(x, y) {
                     this.x = x;
                     this.y = y;
                 }
                 sum() { return this.x + this.y; }
             }
             var p = Point(3, 4);
             var s = p.sum();
             var shown = string(p);
             var class_shown = string(Point);",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "s"), Value::Number(7.0));
        assert_eq!(
            global(&interpreter, "shown"),
            Value::Str("<Point instance>".into())
        );
        assert_eq!(
            global(&interpreter, "class_shown"),
            Value::Str("<Point class>".into())
        );
    }

    #[test]
    fn test_interp_16_constructor_always_yields_instance() {
        let interpreter = run(
            "class A {
                 construct() {
                     this.ready = true;
                     return;
                 }
             }
             var a = A();
             var ready = a.ready;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "ready"), Value::Bool(true));
    }

    #[test]
    fn test_interp_17_inheritance_and_super() {
        let interpreter = run(
            "class Animal {
                 construct(name) { this.name = name; }
                 speak() { return this.name + \" makes a sound\"; }
             }
             class Dog <- Animal {
                 construct(name) { this.name = name; }
                 speak() { return super.speak() + \": woof\"; }
             }
             var said = Dog(\"Rex\").speak();",
        )
        .unwrap();

        assert_eq!(
            global(&interpreter, "said"),
            Value::Str("Rex makes a sound: woof".into())
        );
    }

    #[test]
    fn test_interp_18_static_methods() {
        let interpreter = run(
            "class MathUtil {
                 static square(n) { return n * n; }
             }
             class Extended <- MathUtil { }
             var a = MathUtil.square(6);
             var b = Extended.square(5);",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "a"), Value::Number(36.0));
        // Static methods are inherited through the superclass chain.
        assert_eq!(global(&interpreter, "b"), Value::Number(25.0));

        let message = run_error("class A { } var x = A.missing;");
        assert!(message.contains("Undefined static method 'missing'."));
    }

    #[test]
    fn test_interp_19_getters_and_setters() {
        let interpreter = run(
            "class Circle {
                 construct(r) { this.r = r; }
                 get area() { return this.r * this.r * 3; }
                 set area(a) { this.r = sqrt(a / 3); }
             }
             var c = Circle(2);
             var area = c.area;
             c.area = 27;
             var r = c.r;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "area"), Value::Number(12.0));
        // The write went through the setter and recomputed the radius.
        assert_eq!(global(&interpreter, "r"), Value::Number(3.0));
    }

    #[test]
    fn test_interp_20_methods_bypass_computed_properties() {
        // Outside the class the getter intercepts the read; inside the class
        // (including the getter's own body) access goes to raw storage, so a
        // getter backed by a same-named field does not recurse.
        let interpreter = run(
            "class Box {
                 construct(v) { this.v = v; }
                 get v() { return \"wrapped:\" + this.v; }
                 raw() { return this.v; }
             }
             var b = Box(\"x\");
             var outside = b.v;
             var inside = b.raw();",
        )
        .unwrap();

        assert_eq!(
            global(&interpreter, "outside"),
            Value::Str("wrapped:x".into())
        );
        assert_eq!(global(&interpreter, "inside"), Value::Str("x".into()));
    }

    #[test]
    fn test_interp_21_mismatched_computed_properties() {
        let message = run_error(
            "class A { set x(v) { } }
             var a = A();
             var v = a.x;",
        );
        assert!(message.contains("Instance has a set method but no matching get method for 'x'."));

        let message = run_error(
            "class A { get x() { return 1; } }
             var a = A();
             a.x = 2;",
        );
        assert!(message.contains("Instance has a get method but no matching set method for 'x'."));
    }

    #[test]
    fn test_interp_22_field_creation_rules() {
        // Outside class bodies, assignment may only update existing fields.
        let message = run_error(
            "class A { }
             var a = A();
             a.fresh = 1;",
        );
        assert!(message.contains("Undefined property 'fresh'."));

        // Methods can mint new fields freely.
        let interpreter = run(
            "class A {
                 init_later() { this.fresh = 41; }
             }
             var a = A();
             a.init_later();
             a.fresh = a.fresh + 1;
             var v = a.fresh;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "v"), Value::Number(42.0));
    }

    #[test]
    fn test_interp_23_exit_propagates_from_nested_calls() {
        let result = run(
            "sub deep() { exit 7; }
             sub shallow() { deep(); }
             shallow();",
        );

        assert!(matches!(result, Err(KestrelError::Exit { code: 7 })));
    }

    #[test]
    fn test_interp_24_exit_code_validation() {
        assert!(matches!(run("exit;"), Err(KestrelError::Exit { code: 0 })));

        let message = run_error("exit 1.5;");
        assert!(message.contains("Exit code must be an integer."));

        let message = run_error("exit \"bye\";");
        assert!(message.contains("Exit code must be a number."));
    }

    #[test]
    fn test_interp_25_runtime_error_formats() {
        let message = run_error("var v = missing;");
        assert_eq!(message, "Undefined variable 'missing'.\n[line 1]");

        let message = run_error("var v = -\"str\";");
        assert!(message.contains("Operand must be a number."));

        let message = run_error("var v = 1 < \"two\";");
        assert!(message.contains("Operands must be numbers."));
    }

    #[test]
    fn test_interp_26_call_errors() {
        let message = run_error("sub f(a) { } f(1, 2);");
        assert!(message.contains("Expected 1 arguments but got 2."));

        let message = run_error("var x = 1; x();");
        assert!(message.contains("Can only call subroutine and classes."));

        let message = run_error("class A <- A_missing { }");
        assert!(message.contains("Undefined variable 'A_missing'."));

        let message = run_error("var notclass = 1; class A <- notclass { }");
        assert!(message.contains("Superclass must be a class."));
    }

    #[test]
    fn test_interp_27_native_round_and_sqrt() {
        let interpreter = run(
            "var half_up = round(2.5);
             var half_down = round(-2.5);
             var digits = round(3.14159, 2);
             var root = sqrt(81);",
        )
        .unwrap();

        // Rounding is half away from zero, not banker's rounding.
        assert_eq!(global(&interpreter, "half_up"), Value::Number(3.0));
        assert_eq!(global(&interpreter, "half_down"), Value::Number(-3.0));
        assert_eq!(global(&interpreter, "digits"), Value::Number(3.14));
        assert_eq!(global(&interpreter, "root"), Value::Number(9.0));
    }

    #[test]
    fn test_interp_28_native_errors_carry_call_site_line() {
        let message = run_error("var x = 1;\nvar y = sqrt(\"nope\");");

        assert!(message.contains("Argument to 'sqrt' must be a number."));
        assert!(message.contains("[line 2]"));
    }

    #[test]
    fn test_interp_29_subroutines_are_values() {
        let interpreter = run(
            "sub twice(f, v) { return f(f(v)); }
             sub add_one(n) { return n + 1; }
             var r = twice(add_one, 5);
             var shown = string(add_one);",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "r"), Value::Number(7.0));
        assert_eq!(
            global(&interpreter, "shown"),
            Value::Str("<sub add_one>".into())
        );
    }

    #[test]
    fn test_interp_30_bound_methods_remember_their_instance() {
        let interpreter = run(
            "class Greeter {
                 construct(name) { this.name = name; }
                 greet() { return \"hi \" + this.name; }
             }
             var method = Greeter(\"ada\").greet;
             var said = method();",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "said"), Value::Str("hi ada".into()));
    }

    #[test]
    fn test_interp_31_implicit_returns_are_zilch() {
        let interpreter = run(
            "sub nothing() { }
             sub bare() { return; }
             var a = nothing();
             var b = bare();",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "a"), Value::Zilch);
        assert_eq!(global(&interpreter, "b"), Value::Zilch);
    }

    #[test]
    fn test_interp_32_equality_semantics() {
        let interpreter = run(
            "var num = 1 == 1;
             var mixed = 1 == \"1\";
             var nils = zilch == zilch;
             var not = 1 != 2;",
        )
        .unwrap();

        assert_eq!(global(&interpreter, "num"), Value::Bool(true));
        assert_eq!(global(&interpreter, "mixed"), Value::Bool(false));
        assert_eq!(global(&interpreter, "nils"), Value::Bool(true));
        assert_eq!(global(&interpreter, "not"), Value::Bool(true));
    }

    #[test]
    fn test_interp_33_inf_literal() {
        let interpreter = run("var i = inf; var n = -inf; var cmp = inf > 1e308;").unwrap();

        assert_eq!(global(&interpreter, "i"), Value::Number(f64::INFINITY));
        assert_eq!(global(&interpreter, "n"), Value::Number(f64::NEG_INFINITY));
        assert_eq!(global(&interpreter, "cmp"), Value::Bool(true));
    }

    #[test]
    fn test_interp_34_based_literals_evaluate() {
        let interpreter = run("var h = 0xFF + 1; var b = 0b1010;").unwrap();

        assert_eq!(global(&interpreter, "h"), Value::Number(256.0));
        assert_eq!(global(&interpreter, "b"), Value::Number(10.0));
    }

    #[test]
    fn test_interp_35_sequential_inputs_share_one_interpreter() {
        // An interactive session feeds inputs one at a time into a single
        // interpreter.  The binding-distance map keyed by node id persists
        // across inputs, so the id counter must carry over too: a block in an
        // earlier input must not poison a global reference in a later one.
        let mut interpreter = Interpreter::new();
        let mut next_id = 0;

        for source in [
            "{ var a = 1; { var b = a; } }",
            "var x = 7;",
            "var y = x;",
        ] {
            let tokens: Vec<_> = Scanner::new(source.as_bytes())
                .collect::<Result<_, _>>()
                .expect("source should scan cleanly");

            let (statements, resume_id) = Parser::with_first_id(tokens, next_id)
                .parse_resuming()
                .expect("source should parse cleanly");
            next_id = resume_id;

            Resolver::new(&mut interpreter)
                .resolve(&statements)
                .expect("source should resolve cleanly");

            interpreter
                .interpret(&statements)
                .expect("input should execute cleanly");
        }

        assert_eq!(global(&interpreter, "y"), Value::Number(7.0));
    }

    #[test]
    fn test_interp_36_break_exits_only_innermost_loop() {
        let interpreter = run(
            "var sum = 0;
             for (var i = 0; i < 3; i = i + 1) {
                 var j = 0;
                 while (true) {
                     j = j + 1;
                     if (j == 2) break;
                 }
                 sum = sum + j;
             }",
        )
        .unwrap();

        // The inner break never touches the outer loop: three full passes.
        assert_eq!(global(&interpreter, "sum"), Value::Number(6.0));
        assert_eq!(global(&interpreter, "i"), Value::Number(3.0));
    }
}
