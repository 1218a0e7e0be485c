mod shared;

use hostlisp::ast::{Form, FormMap};
use hostlisp::compiler::{FnMacroHost, HostCallError};
use hostlisp::ir::core::Node;
use hostlisp::ir::Analyzer;
use pretty_assertions::assert_eq;
use shared::{analyze_source, analyzer, error_message, literal_value, macro_analyzer, unwrap_do};
use std::error::Error;

fn flags(keys: &[&str]) -> FormMap {
    keys.iter()
        .map(|key| (Form::keyword(key), Form::Bool(true)))
        .collect()
}

/// `(when test body...)` => `(if test (do body...))`
fn when_macro(args: Vec<Form>) -> Result<Form, HostCallError> {
    let mut args = args.into_iter();
    let test = args
        .next()
        .ok_or_else(|| HostCallError::Failed("when needs a test".to_string()))?;
    let body = Form::list(std::iter::once(Form::symbol("do")).chain(args));
    Ok(Form::list(vec![Form::symbol("if"), test, body]))
}

fn analyzer_with_when() -> Analyzer {
    let host = FnMacroHost::new().with_macro("core", "when", |args, _ctx| when_macro(args));
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "when", flags(&["macro"]))
        .expect("macro definition");
    analyzer
}

#[test]
fn test_macro_expansion_is_analyzed() {
    let analyzer = analyzer_with_when();
    let node = analyze_source(&analyzer, "(when true 1 2)").expect("when should expand");
    let Node::If {
        test, then_branch, ..
    } = node
    else {
        panic!("Expected if node");
    };
    assert_eq!(literal_value(&test), &Form::Bool(true));
    let Node::Do { stmts, ret, .. } = then_branch.as_ref() else {
        panic!("Expected do in then branch");
    };
    assert_eq!(stmts.len(), 1);
    assert_eq!(literal_value(ret), &Form::Int(2));
}

#[test]
fn test_expansion_takes_call_site_location() {
    let analyzer = analyzer_with_when();
    let node = analyze_source(&analyzer, "\n  (when true 1)").expect("when should expand");
    let span = node.span().expect("expansion should be located");
    assert_eq!((span.start_line, span.start_column), (2, 3));
}

#[test]
fn test_errors_inside_expansion_point_at_call_site() {
    let host = FnMacroHost::new().with_macro("core", "broken", |_args, _ctx| {
        Ok(Form::list(vec![Form::symbol("undefined-thing")]))
    });
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "broken", flags(&["macro"]))
        .unwrap();

    let err = analyze_source(&analyzer, "\n  (broken)").expect_err("unresolved");
    assert_eq!(err.message(), "Cannot resolve symbol 'undefined-thing'");
    let start = err.start_location().expect("location");
    assert_eq!((start.line, start.column), (2, 3));
}

#[test]
fn test_macro_failure_is_wrapped() {
    let host = FnMacroHost::new().with_macro("core", "fail", |_args, _ctx| {
        Err(HostCallError::Failed("boom".to_string()))
    });
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "fail", flags(&["macro"]))
        .unwrap();

    let err = analyze_source(&analyzer, "(fail 1)").expect_err("macro failure");
    assert_eq!(err.message(), "Error in expanding macro \"core/fail\": boom");
    assert_eq!(err.start_location().map(|l| l.column), Some(1));
    assert!(err.source().is_some());
}

#[test]
fn test_unbound_macro_host() {
    let analyzer = analyzer();
    analyzer
        .registry()
        .add_definition("core", "when", flags(&["macro"]))
        .unwrap();
    assert_eq!(
        error_message(&analyzer, "(when true 1)"),
        "Error in expanding macro \"core/when\": no host function bound for macro core/when"
    );
}

#[test]
fn test_macro_receives_unevaluated_forms_and_namespace() {
    let host = FnMacroHost::new()
        .with_macro("core", "quote-args", |args, _ctx| {
            Ok(Form::list(vec![Form::symbol("quote"), Form::vector(args)]))
        })
        .with_macro("core", "current-ns", |_args, ctx| Ok(Form::string(ctx.namespace())));
    let analyzer = macro_analyzer(host);
    for name in ["quote-args", "current-ns"] {
        analyzer
            .registry()
            .add_definition("core", name, flags(&["macro"]))
            .unwrap();
    }

    let Node::Quote { value, .. } =
        analyze_source(&analyzer, "(quote-args (not-defined x) y)").expect("quote-args")
    else {
        panic!("Expected quote node");
    };
    assert_eq!(value.to_string(), "[(not-defined x) y]");

    let node = analyze_source(&analyzer, "(ns app.macros) (current-ns)").expect("current-ns");
    assert_eq!(literal_value(&node), &Form::string("app.macros"));
}

#[test]
fn test_locals_shadow_macros() {
    let analyzer = analyzer_with_when();
    let node = analyze_source(&analyzer, "(let [when inc] (when 2))").expect("let");
    let Node::Let { body, .. } = node else {
        panic!("Expected let node");
    };
    let Node::Call { callee, .. } = unwrap_do(&body) else {
        panic!("Expected plain call");
    };
    assert!(matches!(callee.as_ref(), Node::LocalVar { .. }));
}

#[test]
fn test_nested_expansion() {
    let host = FnMacroHost::new()
        .with_macro("core", "when", |args, _ctx| when_macro(args))
        .with_macro("core", "when-not", |args, _ctx| {
            let mut args = args.into_iter();
            let test = args.next().unwrap_or(Form::Nil);
            let negated = Form::list(vec![Form::symbol("nil?"), test]);
            Ok(Form::list(
                std::iter::once(Form::symbol("when"))
                    .chain(std::iter::once(negated))
                    .chain(args),
            ))
        });
    let analyzer = macro_analyzer(host);
    for name in ["when", "when-not"] {
        analyzer
            .registry()
            .add_definition("core", name, flags(&["macro"]))
            .unwrap();
    }

    let Node::If { test, .. } = analyze_source(&analyzer, "(when-not nil 1)").expect("expand")
    else {
        panic!("Expected if node");
    };
    assert!(matches!(test.as_ref(), Node::Call { .. }));
}

#[test]
fn test_def_with_macro_meta_expands_through_host() {
    let host = FnMacroHost::new().with_macro("user", "twice", |args, _ctx| {
        let arg = args.into_iter().next().unwrap_or(Form::Nil);
        Ok(Form::list(vec![Form::symbol("do"), arg.clone(), arg]))
    });
    let analyzer = macro_analyzer(host);
    let node = analyze_source(
        &analyzer,
        "(def ^:macro twice (fn [x] x)) (twice (println 1))",
    )
    .expect("twice");
    let Node::Do { stmts, .. } = node else {
        panic!("Expected do node");
    };
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_inline_expansion_respects_arity_predicate() {
    let host = FnMacroHost::new()
        .with_inline("core", "double", |args, _ctx| {
            let arg = args.into_iter().next().unwrap_or(Form::Nil);
            Ok(Form::list(vec![Form::symbol("+"), arg.clone(), arg]))
        })
        .with_inline_arity("core", "double", |args, _ctx| {
            Ok(Form::Bool(args == vec![Form::Int(1)]))
        });
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "double", flags(&["inline", "inline-arity"]))
        .unwrap();

    let callee_name = |source: &str| match analyze_source(&analyzer, source).expect("call") {
        Node::Call { callee, .. } => match *callee {
            Node::GlobalVar { name, .. } => name.name().to_string(),
            other => panic!("Expected global callee, got {}", other.kind_name()),
        },
        other => panic!("Expected call, got {}", other.kind_name()),
    };
    assert_eq!(callee_name("(double 2)"), "+");
    assert_eq!(callee_name("(double 2 3)"), "double");
}

#[test]
fn test_inline_without_arity_predicate_always_expands() {
    let host = FnMacroHost::new().with_inline("core", "always", |_args, _ctx| Ok(Form::Int(7)));
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "always", flags(&["inline"]))
        .unwrap();
    let node = analyze_source(&analyzer, "(always 1 2 3)").expect("inline");
    assert_eq!(literal_value(&node), &Form::Int(7));
}

#[test]
fn test_inline_failures_are_wrapped() {
    let host = FnMacroHost::new()
        .with_inline("core", "bad-inline", |_args, _ctx| {
            Err(HostCallError::Failed("nope".to_string()))
        })
        .with_inline_arity("core", "bad-arity", |_args, _ctx| {
            Err(HostCallError::Failed("nope".to_string()))
        });
    let analyzer = macro_analyzer(host);
    analyzer
        .registry()
        .add_definition("core", "bad-inline", flags(&["inline"]))
        .unwrap();
    analyzer
        .registry()
        .add_definition("core", "bad-arity", flags(&["inline", "inline-arity"]))
        .unwrap();

    assert_eq!(
        error_message(&analyzer, "(bad-inline 1)"),
        "Error in expanding inline function of \"core/bad-inline\": nope"
    );
    assert_eq!(
        error_message(&analyzer, "(bad-arity 1)"),
        "Error in checking inline arity of \"core/bad-arity\": nope"
    );
}

#[test]
fn test_reanalysis_is_stable() {
    let analyzer = analyzer_with_when();
    let first = analyze_source(&analyzer, "(when (< 1 2) (println 1))").expect("first");
    let second = analyze_source(&analyzer, "(when (< 1 2) (println 1))").expect("second");
    assert_eq!(first.kind_name(), second.kind_name());
    assert_eq!(first.children().len(), second.children().len());
}
