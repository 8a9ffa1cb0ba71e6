use jackc::error::{CompileError, Diagnostics};
use jackc::lex::{Lexer, Token};
use jackc::semantic::SemanticError;
use jackc::source::{self, Located};
use jackc::vm;

fn tokens(text: &str) -> Vec<Token> {
    let (start, stream) = source::consume(text, "test");
    Lexer::new(start, stream)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(Located::into_inner)
        .collect()
}

fn compile_to_text(name: &str, text: &str) -> String {
    let commands = jackc::compile(name, text).unwrap();

    let mut buffer = Vec::new();
    vm::write(&commands, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[test]
fn a_full_unit_compiles_to_its_vm_text() {
    let text = compile_to_text(
        "Main.jack",
        "class Main {
            function void main() {
                var int x;
                let x = 42;
                do Output.printInt(x);
                return;
            }
        }",
    );

    assert_eq!(
        text,
        "function Main.main 1\n\
         push constant 42\n\
         pop local 0\n\
         push local 0\n\
         call Output.printInt 1\n\
         pop temp 0\n\
         push constant 0\n\
         return\n"
    );
}

#[test]
fn compilation_is_deterministic() {
    let text = "class Gauge {
        static int count;
        field int value;

        constructor Gauge new(int start) {
            let value = start;
            let count = count + 1;
            return this;
        }

        method int read() {
            var int copy;
            let copy = value;
            return copy;
        }
    }";

    let first = jackc::compile("Gauge.jack", text).unwrap();
    let second = jackc::compile("Gauge.jack", text).unwrap();

    assert_eq!(first, second);
}

#[test]
fn every_variable_category_lands_in_its_segment() {
    let text = compile_to_text(
        "Gauge.jack",
        "class Gauge {
            static int count;
            field int value;

            constructor Gauge new(int start) {
                let value = start;
                let count = count + 1;
                return this;
            }

            method int read() {
                var int copy;
                let copy = value;
                return copy;
            }
        }",
    );

    assert!(text.contains("pop this 0"));
    assert!(text.contains("push static 0"));
    assert!(text.contains("pop static 0"));
    assert!(text.contains("pop local 0"));
    assert!(text.contains("push argument 0"));
}

#[test]
fn methods_shift_user_arguments_by_one() {
    let text = compile_to_text(
        "Point.jack",
        "class Point {
            field int x;

            method int plus(int dx) {
                return x + dx;
            }
        }",
    );

    assert!(text.contains("push argument 0\npop pointer 0\n"));
    assert!(text.contains("push argument 1"));
}

#[test]
fn relexing_emitted_lexemes_preserves_the_token_stream() {
    let text = "class Main {
        function void main() {
            var Array a;
            let a = Array.new(3);
            let a[0] = -1;
            if (true & false) { do Output.printString(\"yes\"); }
            while (~(a = null)) { let a = null; }
            return;
        }
    }";

    let original = tokens(text);
    let emitted = original
        .iter()
        .map(Token::lexeme)
        .collect::<Vec<_>>()
        .join(" ");

    assert_eq!(tokens(&emitted), original);
}

#[test]
fn branch_labels_come_in_matched_pairs() {
    let text = compile_to_text(
        "Main.jack",
        "class Main {
            function int pick(int n) {
                if (n < 0) {
                    return 0;
                } else {
                    while (n > 10) { let n = n - 1; }
                    return n;
                }
            }
        }",
    );

    assert_eq!(text.matches("if-goto IF_ELSE_0").count(), 1);
    assert_eq!(text.matches("label IF_ELSE_0").count(), 1);
    assert_eq!(text.matches("goto IF_END_0").count(), 1);
    assert_eq!(text.matches("label IF_END_0").count(), 1);
    assert_eq!(text.matches("label WHILE_TOP_1").count(), 1);
    assert_eq!(text.matches("goto WHILE_TOP_1").count(), 1);
    assert_eq!(text.matches("label WHILE_END_1").count(), 1);
}

#[test]
fn oversized_integers_fail_during_lexing() {
    let error = jackc::compile(
        "Main.jack",
        "class Main {
            function void f() {
                do Output.printInt(32768);
                return;
            }
        }",
    )
    .unwrap_err();

    assert!(matches!(error, CompileError::Lex(_)));
}

#[test]
fn undefined_symbols_fail_during_lowering() {
    let error = jackc::compile(
        "Main.jack",
        "class Main {
            function int f() { return missing; }
        }",
    )
    .unwrap_err();

    match error {
        CompileError::Semantic(located) => {
            assert!(matches!(located.into_inner(), SemanticError::Undefined(_)));
        }

        other => panic!("expected a semantic error, found {}", other),
    }
}

#[test]
fn duplicate_symbols_fail_during_lowering() {
    let error = jackc::compile(
        "Main.jack",
        "class Main {
            function void f(int a) {
                var int a;
                return;
            }
        }",
    )
    .unwrap_err();

    match error {
        CompileError::Semantic(located) => {
            assert!(matches!(located.into_inner(), SemanticError::Duplicate(_)));
        }

        other => panic!("expected a semantic error, found {}", other),
    }
}

#[test]
fn errors_carry_their_position_into_diagnostics() {
    let error = jackc::compile("Main.jack", "class Main { $ }").unwrap_err();
    let report = Diagnostics::from(error).to_string();

    assert!(report.contains("Lexical error:"));
    assert!(report.contains("--> Main.jack:1:14"));
    assert!(report.contains("class Main { $ }"));
    assert!(report.contains("Build failed with 1 error"));
}

#[test]
fn compile_errors_chain_their_causes() {
    use std::error::Error;

    let error = jackc::compile(
        "Main.jack",
        "class Main { function void f() { do Output.printInt(32768); return; } }",
    )
    .unwrap_err();

    assert!(error.to_string().contains("Integer literal overflow"));

    let located = error.source().expect("compile errors wrap a located cause");
    assert_eq!(located.to_string(), error.to_string());

    let cause = located.source().expect("located errors expose their payload");
    assert!(cause.to_string().contains("Integer literal overflow"));
    assert!(!cause.to_string().contains("Main.jack"));
}

#[test]
fn a_unit_with_a_late_error_produces_nothing() {
    let error = jackc::compile(
        "Main.jack",
        "class Main {
            function void ok() { return; }
        }
        class Extra { }",
    )
    .unwrap_err();

    assert!(matches!(error, CompileError::Syntax(_)));
}
