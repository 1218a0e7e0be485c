//! Compile-time expansion of macros and inline functions.
//!
//! The analyzer never runs user code itself. When an invocation resolves to a
//! definition flagged `:macro` or `:inline`, the unevaluated argument forms are
//! handed to a [`MacroHost`], which knows how to call the compiled expander.
//! The returned form gets the call-site location on every sub-form that has
//! none and is then analyzed like hand-written code.

use crate::ast::{Form, MapForm, Seq};
use crate::error_reporting::SourceSpan;
use crate::ir::converter::Analyzer;
use crate::ir::error::{AnalyzerError, AnalyzerResult};
use std::collections::HashMap;
use std::fmt;

/// Which compile-time function of a definition is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionKind {
    /// The macro body itself.
    Macro,
    /// The `:inline` transformer stored in the definition's metadata.
    Inline,
    /// The `:inline-arity` predicate, called with the argument count.
    InlineArity,
}

impl ExpansionKind {
    fn describe(self) -> &'static str {
        match self {
            ExpansionKind::Macro => "macro",
            ExpansionKind::Inline => "inline function",
            ExpansionKind::InlineArity => "inline arity check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostCallable {
    pub kind: ExpansionKind,
    pub namespace: String,
    pub name: String,
}

impl HostCallable {
    pub fn new(kind: ExpansionKind, namespace: &str, name: &str) -> Self {
        HostCallable {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for HostCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.describe(), self.full_name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostCallError {
    #[error("no host function bound for {0}")]
    Unbound(HostCallable),
    #[error("{0}")]
    Failed(String),
}

/// State a host function may use while expanding: the analyzer (to re-enter
/// analysis or reach the namespace registry) and the call-site location.
pub struct MacroContext<'a> {
    analyzer: &'a Analyzer,
    namespace: String,
    call_site: Option<&'a SourceSpan>,
}

impl<'a> MacroContext<'a> {
    pub fn new(analyzer: &'a Analyzer, namespace: String, call_site: Option<&'a SourceSpan>) -> Self {
        MacroContext {
            analyzer,
            namespace,
            call_site,
        }
    }

    pub fn analyzer(&self) -> &'a Analyzer {
        self.analyzer
    }

    /// Namespace the expansion is happening in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn call_site(&self) -> Option<&'a SourceSpan> {
        self.call_site
    }
}

/// Capability used to run compiled macros and inline transformers.
pub trait MacroHost: fmt::Debug {
    fn invoke(
        &self,
        callable: &HostCallable,
        args: Vec<Form>,
        ctx: &MacroContext<'_>,
    ) -> Result<Form, HostCallError>;
}

/// Host for analyses that never expand anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMacroHost;

impl MacroHost for NoMacroHost {
    fn invoke(
        &self,
        callable: &HostCallable,
        _args: Vec<Form>,
        _ctx: &MacroContext<'_>,
    ) -> Result<Form, HostCallError> {
        Err(HostCallError::Unbound(callable.clone()))
    }
}

pub type HostFn = Box<dyn Fn(Vec<Form>, &MacroContext<'_>) -> Result<Form, HostCallError> + Send + Sync>;

/// Host backed by native closures, keyed by definition and expansion kind.
#[derive(Default)]
pub struct FnMacroHost {
    functions: HashMap<HostCallable, HostFn>,
}

impl fmt::Debug for FnMacroHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<String> = self.functions.keys().map(ToString::to_string).collect();
        bound.sort();
        f.debug_struct("FnMacroHost").field("functions", &bound).finish()
    }
}

impl FnMacroHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: ExpansionKind, namespace: &str, name: &str, function: F)
    where
        F: Fn(Vec<Form>, &MacroContext<'_>) -> Result<Form, HostCallError> + Send + Sync + 'static,
    {
        self.functions
            .insert(HostCallable::new(kind, namespace, name), Box::new(function));
    }

    pub fn with_macro<F>(mut self, namespace: &str, name: &str, function: F) -> Self
    where
        F: Fn(Vec<Form>, &MacroContext<'_>) -> Result<Form, HostCallError> + Send + Sync + 'static,
    {
        self.register(ExpansionKind::Macro, namespace, name, function);
        self
    }

    pub fn with_inline<F>(mut self, namespace: &str, name: &str, function: F) -> Self
    where
        F: Fn(Vec<Form>, &MacroContext<'_>) -> Result<Form, HostCallError> + Send + Sync + 'static,
    {
        self.register(ExpansionKind::Inline, namespace, name, function);
        self
    }

    pub fn with_inline_arity<F>(mut self, namespace: &str, name: &str, function: F) -> Self
    where
        F: Fn(Vec<Form>, &MacroContext<'_>) -> Result<Form, HostCallError> + Send + Sync + 'static,
    {
        self.register(ExpansionKind::InlineArity, namespace, name, function);
        self
    }
}

impl MacroHost for FnMacroHost {
    fn invoke(
        &self,
        callable: &HostCallable,
        args: Vec<Form>,
        ctx: &MacroContext<'_>,
    ) -> Result<Form, HostCallError> {
        match self.functions.get(callable) {
            Some(function) => function(args, ctx),
            None => Err(HostCallError::Unbound(callable.clone())),
        }
    }
}

/// Calls `callable` and turns a host failure into a located analyzer error.
pub fn expand(
    host: &dyn MacroHost,
    callable: &HostCallable,
    args: Vec<Form>,
    ctx: &MacroContext<'_>,
) -> AnalyzerResult<Form> {
    log::debug!("Expanding {} at {:?}", callable, ctx.call_site());
    host.invoke(callable, args, ctx).map_err(|e| {
        let message = match callable.kind {
            ExpansionKind::Macro => {
                format!("Error in expanding macro \"{}\": {}", callable.full_name(), e)
            }
            ExpansionKind::Inline => format!(
                "Error in expanding inline function of \"{}\": {}",
                callable.full_name(),
                e
            ),
            ExpansionKind::InlineArity => format!(
                "Error in checking inline arity of \"{}\": {}",
                callable.full_name(),
                e
            ),
        };
        AnalyzerError::at_span(message, ctx.call_site()).with_cause(e)
    })
}

/// Gives every located form in the tree without a span of its own the
/// call-site span. Forms that already carry a location keep it, but their
/// children are still visited.
pub fn enrich_location(form: Form, span: Option<&SourceSpan>) -> Form {
    let Some(span) = span else {
        return form;
    };
    enrich(form, span)
}

fn enrich(form: Form, span: &SourceSpan) -> Form {
    let own = |current: Option<&SourceSpan>| Some(current.unwrap_or(span).clone());
    match form {
        Form::Symbol(sym) => {
            let located = own(sym.span());
            Form::Symbol(sym.with_span(located))
        }
        Form::List(seq) => Form::List(enrich_seq(seq, span)),
        Form::Vector(seq) => Form::Vector(enrich_seq(seq, span)),
        Form::Map(map) => {
            let located = own(map.span());
            let meta = map.meta().clone();
            let entries = map
                .iter()
                .map(|(k, v)| (enrich(k.clone(), span), enrich(v.clone(), span)))
                .collect::<Vec<_>>();
            Form::Map(MapForm::new(entries).with_span(located).with_meta(meta))
        }
        other => other,
    }
}

fn enrich_seq(seq: Seq, span: &SourceSpan) -> Seq {
    let located = Some(seq.span().unwrap_or(span).clone());
    let meta = seq.meta().clone();
    Seq::new(seq.iter().map(|item| enrich(item.clone(), span)))
        .with_span(located)
        .with_meta(meta)
}
