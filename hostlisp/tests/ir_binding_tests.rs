mod shared;

use hostlisp::ast::{Form, Symbol};
use hostlisp::ir::core::Node;
use hostlisp::ir::Context;
use pretty_assertions::assert_eq;
use shared::{analyze_expr, analyzer, error_message, literal_value, unwrap_do};

fn names(symbols: &[Symbol]) -> Vec<String> {
    symbols.iter().map(|s| s.name().to_string()).collect()
}

#[test]
fn test_let_shadows_binding() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(let [a 1] a)").expect("let should analyze");
    let Node::Let { bindings, body, .. } = node else {
        panic!("Expected let node");
    };
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].symbol.name(), "a");
    assert_eq!(bindings[0].shadow().name(), "a_1");
    assert_eq!(literal_value(&bindings[0].init), &Form::Int(1));

    match unwrap_do(&body) {
        Node::LocalVar { name, shadow, .. } => {
            assert_eq!(name.name(), "a");
            assert_eq!(shadow.as_ref().map(|s| s.name()), Some("a_1"));
        }
        other => panic!("Expected local var, got {}", other.kind_name()),
    }
}

#[test]
fn test_let_later_binding_shadows_for_later_initializers_only() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(let [a 1 b a a (inc a) c a] c)").expect("let");
    let Node::Let { bindings, .. } = node else {
        panic!("Expected let node");
    };
    let shadow_of = |node: &Node| match node {
        Node::LocalVar { shadow, .. } => shadow.as_ref().map(|s| s.name().to_string()),
        Node::Call { args, .. } => match &args[0] {
            Node::LocalVar { shadow, .. } => shadow.as_ref().map(|s| s.name().to_string()),
            other => panic!("Expected local var, got {}", other.kind_name()),
        },
        other => panic!("Unexpected {}", other.kind_name()),
    };

    assert_eq!(shadow_of(&bindings[1].init).as_deref(), Some("a_1"));
    assert_eq!(shadow_of(&bindings[2].init).as_deref(), Some("a_1"));
    assert_eq!(bindings[2].shadow().name(), "a_3");
    assert_eq!(shadow_of(&bindings[3].init).as_deref(), Some("a_3"));
}

#[test]
fn test_let_initializers_are_expressions_without_recur() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(let [a (inc 1)] a)").expect("let");
    let Node::Let { env, bindings, body, .. } = node else {
        panic!("Expected let node");
    };
    assert_eq!(env.context(), Context::Expression);
    assert_eq!(bindings[0].init.env().context(), Context::Expression);
    assert!(bindings[0].init.env().current_recur_frame().is_none());
    assert_eq!(bindings[0].env.bound_to(), "a");
    assert_eq!(body.env().context(), Context::Return);
}

#[test]
fn test_let_destructures_vectors() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(let [[x & xs] [1 2 3]] xs)").expect("let");
    let Node::Let { bindings, .. } = node else {
        panic!("Expected let node");
    };
    let symbols: Vec<&str> = bindings.iter().map(|b| b.symbol.name()).collect();
    assert_eq!(symbols, vec!["__tmp_1", "x", "xs"]);

    let Node::Call { callee, args, .. } = bindings[2].init.as_ref() else {
        panic!("Expected drop call");
    };
    match callee.as_ref() {
        Node::GlobalVar {
            namespace, name, ..
        } => {
            assert_eq!(namespace, "core");
            assert_eq!(name.name(), "drop");
        }
        other => panic!("Expected core/drop, got {}", other.kind_name()),
    }
    assert_eq!(literal_value(&args[0]), &Form::Int(1));
}

#[test]
fn test_let_validation_messages() {
    let analyzer = analyzer();
    assert_eq!(
        error_message(&analyzer, "(let)"),
        "At least one argument is required for 'let"
    );
    assert_eq!(
        error_message(&analyzer, "(let (a 1) a)"),
        "Binding parameter must be a vector"
    );
    assert_eq!(
        error_message(&analyzer, "(let [a 1 b] a)"),
        "Bindings must be a even number of parameters"
    );
    assert_eq!(
        error_message(&analyzer, "(let [[a & b c] [1]] a)"),
        "Unsupported binding form, only one symbol can follow the & parameter"
    );
}

#[test]
fn test_loop_installs_frame() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(loop [i 0 acc 1] (if (< i 10) (recur (inc i) (+ acc i)) acc))")
        .expect("loop");
    let Node::Loop {
        bindings, frame, ..
    } = node
    else {
        panic!("Expected loop node");
    };
    assert_eq!(names(frame.params()), vec!["i", "acc"]);
    assert!(frame.is_active());
    assert_eq!(bindings.len(), 2);
}

#[test]
fn test_loop_with_destructuring_rebinds_temporaries() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(loop [[a b] [1 2] n 0] (recur [b a] (inc n)))")
        .expect("loop");
    let Node::Let {
        bindings: outer,
        body,
        ..
    } = node
    else {
        panic!("Expected outer let");
    };
    let outer_names: Vec<&str> = outer.iter().map(|b| b.symbol.name()).collect();
    assert_eq!(outer_names, vec!["__tmp_1", "__tmp_2", "a", "b", "n"]);

    let Node::Loop {
        bindings,
        frame,
        body,
        ..
    } = unwrap_do(&body)
    else {
        panic!("Expected loop node");
    };
    assert_eq!(names(frame.params()), vec!["__tmp_1", "n"]);
    assert_eq!(bindings[0].symbol.name(), "__tmp_1");
    assert!(matches!(
        bindings[0].init.as_ref(),
        Node::LocalVar { shadow, .. } if shadow.as_ref().map(|s| s.name()) == Some("__tmp_1_3")
    ));
    assert!(frame.is_active());

    let Node::Let {
        bindings: inner, ..
    } = unwrap_do(body)
    else {
        panic!("Expected nested let");
    };
    let inner_names: Vec<&str> = inner.iter().map(|b| b.symbol.name()).collect();
    assert!(inner_names[0].starts_with("__tmp_"));
    assert_eq!(&inner_names[1..], &["a", "b"]);
}

#[test]
fn test_loop_initializers_see_destructured_names() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(loop [[a] [1] b a] b)").expect("loop");
    let Node::Let { bindings, .. } = node else {
        panic!("Expected outer let");
    };
    let a = bindings.iter().find(|b| b.symbol.name() == "a").expect("a binding");
    let b = bindings.iter().find(|b| b.symbol.name() == "b").expect("b binding");
    match b.init.as_ref() {
        Node::LocalVar { name, shadow, .. } => {
            assert_eq!(name.name(), "a");
            assert_eq!(shadow.as_ref(), Some(a.shadow()));
        }
        other => panic!("Expected local var, got {}", other.kind_name()),
    }

    let node = analyze_expr(&analyzer, "(let [a 100] (loop [[a] [1] b a] b))").expect("let");
    let Node::Let { bindings, body, .. } = node else {
        panic!("Expected let node");
    };
    let outer_a = bindings[0].shadow().clone();
    let Node::Let { bindings, .. } = unwrap_do(&body) else {
        panic!("Expected rewritten loop");
    };
    let a = bindings.iter().find(|b| b.symbol.name() == "a").expect("a binding");
    let b = bindings.iter().find(|b| b.symbol.name() == "b").expect("b binding");
    let Node::LocalVar { shadow, .. } = b.init.as_ref() else {
        panic!("Expected local var");
    };
    assert_eq!(shadow.as_ref(), Some(a.shadow()));
    assert_ne!(shadow.as_ref(), Some(&outer_a));
}

#[test]
fn test_loop_destructuring_sees_earlier_simple_bindings() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(loop [n 2 [x] [n]] (recur (dec n) [x]))").expect("loop");
    let Node::Let { bindings, body, .. } = node else {
        panic!("Expected outer let");
    };
    assert_eq!(bindings[0].symbol.name(), "n");
    let Node::Vector { elements, .. } = bindings[1].init.as_ref() else {
        panic!("Expected vector initializer");
    };
    assert!(matches!(
        &elements[0],
        Node::LocalVar { shadow, .. } if shadow.as_ref() == Some(bindings[0].shadow())
    ));
    let Node::Loop { frame, .. } = unwrap_do(&body) else {
        panic!("Expected loop node");
    };
    assert_eq!(frame.params()[0].name(), "n");
}

#[test]
fn test_loop_validation_messages() {
    let analyzer = analyzer();
    assert_eq!(
        error_message(&analyzer, "(loop)"),
        "At least one argument is required for 'loop"
    );
    assert_eq!(
        error_message(&analyzer, "(loop [a] a)"),
        "Bindings must be a even number of parameters"
    );
}

#[test]
fn test_fn_uses_are_parent_locals_minus_params() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(let [a 1 b 2] (fn [b c] (+ a b c)))").expect("let");
    let Node::Let { body, .. } = node else {
        panic!("Expected let node");
    };
    let Node::Fn(function) = unwrap_do(&body) else {
        panic!("Expected fn node");
    };
    assert_eq!(names(function.uses()), vec!["a"]);
    assert_eq!(names(&function.captured_names()), vec!["a_1"]);
    assert_eq!(names(&function.params), vec!["b", "c"]);

    // Parameters render under their own names even when an outer let shadowed them.
    let Node::Call { args, .. } = unwrap_do(&function.body) else {
        panic!("Expected call");
    };
    match &args[1] {
        Node::LocalVar { name, shadow, .. } => {
            assert_eq!(name.name(), "b");
            assert!(shadow.is_none());
        }
        other => panic!("Expected local var, got {}", other.kind_name()),
    }
}

#[test]
fn test_fn_variadic_and_placeholder() {
    let analyzer = analyzer();
    let Node::Fn(variadic) = analyze_expr(&analyzer, "(fn [a & rest] rest)").expect("fn") else {
        panic!("Expected fn node");
    };
    assert!(variadic.is_variadic);
    assert_eq!(names(&variadic.params), vec!["a", "rest"]);

    let Node::Fn(placeholder) = analyze_expr(&analyzer, "(fn [a &] a)").expect("fn") else {
        panic!("Expected fn node");
    };
    assert!(placeholder.is_variadic);
    assert_eq!(names(&placeholder.params), vec!["a", "__tmp_1"]);
}

#[test]
fn test_fn_destructured_param_wraps_body_in_let() {
    let analyzer = analyzer();
    let Node::Fn(function) = analyze_expr(&analyzer, "(fn [[a b]] (+ a b))").expect("fn") else {
        panic!("Expected fn node");
    };
    assert_eq!(names(&function.params), vec!["__tmp_1"]);
    let Node::Let { bindings, .. } = unwrap_do(&function.body) else {
        panic!("Expected let in body");
    };
    let bound: Vec<&str> = bindings.iter().map(|b| b.symbol.name()).collect();
    assert_eq!(bound, vec!["__tmp_2", "a", "b"]);
}

#[test]
fn test_fn_body_is_return_context() {
    let analyzer = analyzer();
    let Node::Fn(function) = analyze_expr(&analyzer, "(fn [] (println 1) 2)").expect("fn") else {
        panic!("Expected fn node");
    };
    let Node::Do { stmts, ret, .. } = function.body.as_ref() else {
        panic!("Expected do body");
    };
    assert_eq!(stmts[0].env().context(), Context::Statement);
    assert_eq!(ret.env().context(), Context::Return);
}

#[test]
fn test_fn_validation_messages() {
    let analyzer = analyzer();
    assert_eq!(
        error_message(&analyzer, "(fn)"),
        "'fn requires at least one argument"
    );
    assert_eq!(
        error_message(&analyzer, "(fn (a) a)"),
        "Second argument of 'fn must be a vector"
    );
    assert_eq!(
        error_message(&analyzer, "(fn [& a b] a)"),
        "Unsupported binding form, only one symbol can follow the & parameter"
    );
}

#[test]
fn test_foreach_value_and_key() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(foreach [k v {:a 1}] (println k v))").expect("foreach");
    let Node::Foreach {
        key_symbol,
        value_symbol,
        coll,
        body,
        ..
    } = node
    else {
        panic!("Expected foreach node");
    };
    assert_eq!(key_symbol.map(|k| k.name().to_string()).as_deref(), Some("k"));
    assert_eq!(value_symbol.name(), "v");
    assert!(matches!(coll.as_ref(), Node::Map { .. }));
    assert_eq!(body.env().context(), Context::Statement);
    assert!(body.env().current_recur_frame().is_none());
}

#[test]
fn test_foreach_destructures_value() {
    let analyzer = analyzer();
    let node = analyze_expr(&analyzer, "(foreach [[a b] [[1 2]]] (println a b))").expect("foreach");
    let Node::Foreach {
        value_symbol, body, ..
    } = node
    else {
        panic!("Expected foreach node");
    };
    assert_eq!(value_symbol.name(), "__tmp_1");
    assert!(matches!(unwrap_do(&body), Node::Let { .. }));
}

#[test]
fn test_foreach_validation_messages() {
    let analyzer = analyzer();
    assert_eq!(
        error_message(&analyzer, "(foreach)"),
        "'foreach requires at least one argument"
    );
    assert_eq!(
        error_message(&analyzer, "(foreach (x xs) x)"),
        "First argument of 'foreach must be a vector"
    );
    assert_eq!(
        error_message(&analyzer, "(foreach [x] x)"),
        "Vector of 'foreach must have exactly two or three elements"
    );
}
