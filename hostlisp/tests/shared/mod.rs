// Shared helpers for analyzer integration tests
// A small reader producing spanned forms, plus analyzers over a registry
// preloaded with the core functions the tests call.
#![allow(dead_code)]

use hostlisp::ast::{Form, FormMap, MapForm, Seq, Symbol};
use hostlisp::compiler::{FnMacroHost, MacroHost, NoMacroHost};
use hostlisp::config::AnalyzerConfig;
use hostlisp::error_reporting::SourceSpan;
use hostlisp::ir::core::Node;
use hostlisp::ir::{Analyzer, AnalyzerResult, NodeEnvironment};
use hostlisp::registry::NamespaceRegistry;
use std::sync::Arc;

pub const CORE_FUNCTIONS: &[&str] = &[
    "+", "-", "*", "/", "==", "<", ">", "=", "get", "drop", "str", "count", "first", "rest",
    "inc", "dec", "println", "vector", "hash-map", "nil?",
];

// --- Reader ---

struct Reader {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Reader {
    fn new(source: &str) -> Self {
        Reader {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn span_from(&self, line: usize, column: usize) -> SourceSpan {
        SourceSpan::new(line, column, self.line, self.column)
    }

    fn read_form(&mut self) -> Result<Option<Form>, String> {
        self.skip_whitespace();
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let form = match c {
            '(' | '[' | '{' => {
                self.bump();
                let close = match c {
                    '(' => ')',
                    '[' => ']',
                    _ => '}',
                };
                let items = self.read_until(close)?;
                let span = Some(self.span_from(line, column));
                match c {
                    '(' => Form::List(Seq::new(items).with_span(span)),
                    '[' => Form::Vector(Seq::new(items).with_span(span)),
                    _ => {
                        if items.len() % 2 != 0 {
                            return Err(format!("odd map literal at {}:{}", line, column));
                        }
                        let entries: Vec<(Form, Form)> = items
                            .chunks(2)
                            .map(|pair| (pair[0].clone(), pair[1].clone()))
                            .collect();
                        Form::Map(MapForm::new(entries).with_span(span))
                    }
                }
            }
            ')' | ']' | '}' => return Err(format!("unexpected '{}' at {}:{}", c, line, column)),
            '\'' => {
                self.bump();
                let quoted = self.read_form()?.ok_or("nothing to quote")?;
                let span = Some(self.span_from(line, column));
                Form::List(Seq::new(vec![Form::symbol("quote"), quoted]).with_span(span))
            }
            '^' => {
                self.bump();
                let meta = match self.read_form()?.ok_or("missing metadata")? {
                    Form::Keyword(kw) => FormMap::unit(Form::Keyword(kw), Form::Bool(true)),
                    Form::Map(map) => map.entries().clone(),
                    other => return Err(format!("bad metadata {}", other)),
                };
                match self.read_form()?.ok_or("missing metadata target")? {
                    Form::Symbol(sym) => {
                        let merged = meta.union(sym.meta().clone());
                        Form::Symbol(sym.with_meta(merged))
                    }
                    other => other,
                }
            }
            '"' => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(other) => text.push(other),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                Form::Str(text)
            }
            _ => {
                let mut token = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || "()[]{},;\"".contains(c) {
                        break;
                    }
                    token.push(c);
                    self.bump();
                }
                self.atom(&token, Some(self.span_from(line, column)))
            }
        };
        Ok(Some(form))
    }

    fn read_until(&mut self, close: char) -> Result<Vec<Form>, String> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(_) => {
                    let form = self.read_form()?.ok_or("unterminated collection")?;
                    items.push(form);
                }
                None => return Err(format!("missing '{}'", close)),
            }
        }
    }

    fn atom(&self, token: &str, span: Option<SourceSpan>) -> Form {
        match token {
            "nil" => return Form::Nil,
            "true" => return Form::Bool(true),
            "false" => return Form::Bool(false),
            _ => {}
        }
        if let Some(keyword) = token.strip_prefix(':') {
            return match Symbol::parse(keyword) {
                sym if sym.is_qualified() => Form::Keyword(hostlisp::ast::Keyword::qualified(
                    sym.namespace().unwrap_or_default(),
                    sym.name(),
                )),
                sym => Form::keyword(sym.name()),
            };
        }
        if let Ok(int) = token.parse::<i64>() {
            return Form::Int(int);
        }
        let numeric_start = token
            .trim_start_matches('-')
            .starts_with(|c: char| c.is_ascii_digit());
        if numeric_start {
            if let Ok(float) = token.parse::<f64>() {
                return Form::float(float);
            }
        }
        Form::Symbol(Symbol::parse(token).with_span(span))
    }
}

/// Reads every form in `source`.
pub fn read_all(source: &str) -> Vec<Form> {
    let mut reader = Reader::new(source);
    let mut forms = Vec::new();
    while let Some(form) = reader.read_form().expect("read error") {
        forms.push(form);
    }
    forms
}

/// Reads exactly one form.
pub fn read(source: &str) -> Form {
    let mut forms = read_all(source);
    assert_eq!(forms.len(), 1, "expected a single form in {:?}", source);
    forms.remove(0)
}

// --- Analyzers ---

/// Registry in namespace `user` with the core functions defined.
pub fn core_registry() -> Arc<NamespaceRegistry> {
    let registry = NamespaceRegistry::from_config(&AnalyzerConfig::default());
    for name in CORE_FUNCTIONS {
        registry
            .add_definition("core", name, FormMap::new())
            .expect("core definition");
    }
    Arc::new(registry)
}

pub fn analyzer() -> Analyzer {
    analyzer_with_host(NoMacroHost)
}

pub fn analyzer_with_host(host: impl MacroHost + 'static) -> Analyzer {
    Analyzer::new(core_registry(), Arc::new(host))
}

pub fn macro_analyzer(host: FnMacroHost) -> Analyzer {
    analyzer_with_host(host)
}

/// Analyzes every form in `source` at top level and returns the last node.
pub fn analyze_source(analyzer: &Analyzer, source: &str) -> AnalyzerResult<Node> {
    let mut last = None;
    for form in read_all(source) {
        last = Some(analyzer.analyze_top_level(&form)?);
    }
    Ok(last.expect("empty source"))
}

/// Analyzes one form in expression context with fresh numbering.
pub fn analyze_expr(analyzer: &Analyzer, source: &str) -> AnalyzerResult<Node> {
    analyzer.reset_gensym();
    analyzer.analyze(&read(source), &NodeEnvironment::empty().with_expression_context())
}

/// Message of the error produced by analyzing `source` at top level.
pub fn error_message(analyzer: &Analyzer, source: &str) -> String {
    match analyze_source(analyzer, source) {
        Ok(node) => panic!("Expected an error, got {}", node.kind_name()),
        Err(e) => e.message().to_string(),
    }
}

/// Value of a literal node, panicking otherwise.
pub fn literal_value(node: &Node) -> &Form {
    match node {
        Node::Literal { value, .. } => value,
        other => panic!("Expected literal, got {}", other.kind_name()),
    }
}

/// Strips a `do` wrapper that holds a single expression.
pub fn unwrap_do(node: &Node) -> &Node {
    match node {
        Node::Do { stmts, ret, .. } if stmts.is_empty() => ret.as_ref(),
        other => other,
    }
}
