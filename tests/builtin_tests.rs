//! The built-in operations, exercised from full programs.

mod common;

use common::{run_err, run_ok};
use tua::Error;

#[test]
fn test_type_builtin() {
    let output = run_ok(
        r#"
        function f(): nil end
        print(type(1), type(1.5), type(true), type("s"), type(nil))
        print(type({1}), type({}), type(f))
        "#,
    );
    assert_eq!(output, "int float bool string nil\nList[int] List[] function\n");
}

#[test]
fn test_len_builtin() {
    assert_eq!(run_ok("print(len({1, 2, 3}), len({}))"), "3 0\n");

    let err = run_err("print(len(5))");
    assert!(matches!(err, Error::InvalidArguments { .. }));
    assert!(err.to_string().contains("len"));
}

#[test]
fn test_concat_builtin() {
    let output = run_ok(
        r#"
        let a: List[int] = {1, 2}
        let b: List[int] = {3}
        let c: List[int] = concat(a, b)
        print(len(c), len(a), len(b))
        print(c[0], c[1], c[2])
        print(type(c))
        "#,
    );
    assert_eq!(output, "3 2 1\n1 2 3\nList[int]\n");
}

#[test]
fn test_concat_leaves_inputs_untouched() {
    let output = run_ok(
        r#"
        let a: List[int] = {1}
        let c: List[int] = concat(a, a)
        c[0] = 9
        print(a[0], c[0], c[1])
        "#,
    );
    assert_eq!(output, "1 9 1\n");
}

#[test]
fn test_concat_type_mismatch() {
    let err = run_err(
        r#"
        let a: List[int] = {1}
        let b: List[string] = {"x"}
        concat(a, b)
        "#,
    );
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_append_then_pop_restores_list() {
    let output = run_ok(
        r#"
        let xs: List[int] = {1, 2}
        append(xs, 7)
        let popped: int = pop(xs)
        print(popped, len(xs), xs[0], xs[1])
        "#,
    );
    assert_eq!(output, "7 2 1 2\n");
}

#[test]
fn test_append_type_mismatch() {
    let err = run_err("let xs: List[int] = {1} append(xs, true)");
    assert_eq!(
        err,
        Error::TypeMismatch {
            expected: "int".to_string(),
            got: "bool".to_string(),
        }
    );
}

#[test]
fn test_pop_empty_list_fails() {
    let err = run_err("let xs: List[int] = {} pop(xs)");
    assert_eq!(
        err,
        Error::EmptyList {
            operation: "pop".to_string(),
        }
    );
}

#[test]
fn test_ipairs_yields_zero_based_keys() {
    let output = run_ok(
        r#"
        let keys: List[int] = {}
        let xs: List[string] = {"a", "b", "c"}
        for k, v in ipairs(xs) do append(keys, k) end
        print(keys[0], keys[1], keys[2], len(keys))
        "#,
    );
    assert_eq!(output, "0 1 2 3\n");
}

#[test]
fn test_ipairs_is_lazy_over_the_live_list() {
    // growth during iteration is observed by later pulls
    let output = run_ok(
        r#"
        let xs: List[int] = {1, 2}
        let n: int = 0
        for k, v in ipairs(xs) do
            if k == 0 then append(xs, 3) end
            n = n + 1
        end
        print(n, len(xs))
        "#,
    );
    assert_eq!(output, "3 3\n");
}

#[test]
fn test_ipairs_requires_a_list() {
    let err = run_err("for k, v in ipairs(1) do end");
    assert!(matches!(err, Error::InvalidArguments { .. }));
}

#[test]
fn test_builtin_arity_checked() {
    let err = run_err("print(len({1}, {2}))");
    assert!(matches!(err, Error::InvalidArguments { .. }));

    let err = run_err("let xs: List[int] = {1} pop()");
    assert!(matches!(err, Error::InvalidArguments { .. }));
}

#[test]
fn test_print_returns_nil() {
    let output = run_ok(
        r#"
        let x: nil = print("side effect")
        print(type(x))
        "#,
    );
    assert_eq!(output, "side effect\nnil\n");
}

#[test]
fn test_dump_stack_is_an_observable_no_op() {
    let output = run_ok(
        r#"
        let x: int = 1
        dump_stack()
        print(x)
        "#,
    );
    assert_eq!(output, "1\n");
}

#[test]
fn test_builtins_shadow_user_bindings() {
    // a variable may reuse a built-in's name, but calls still reach the built-in
    let output = run_ok(
        r#"
        let len: int = 99
        print(len({1, 2}))
        "#,
    );
    assert_eq!(output, "2\n");
}
