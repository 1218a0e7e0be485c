//! Reader forms consumed by the analyzer.
//!
//! Forms are plain data. Symbols and composite forms (lists, vectors, maps)
//! carry the source span and metadata map set by the reader; both are ignored
//! by equality, ordering and hashing so two forms compare equal whenever their
//! printed representation does.

use crate::error_reporting::SourceSpan;
use im::{OrdMap, Vector};
use ordered_float::OrderedFloat;
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Persistent map used for map forms and metadata.
pub type FormMap = OrdMap<Form, Form>;

// --- Symbol, Keyword ---

#[derive(Debug, Clone)]
pub struct Symbol {
    namespace: Option<String>,
    name: String,
    span: Option<SourceSpan>,
    meta: FormMap,
}

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol {
            namespace: None,
            name: name.to_string(),
            span: None,
            meta: FormMap::new(),
        }
    }

    pub fn qualified(namespace: &str, name: &str) -> Self {
        Symbol {
            namespace: Some(namespace.to_string()),
            ..Symbol::new(name)
        }
    }

    /// Reads `ns/name` notation. Only treated as qualified when there is
    /// content on both sides of the first `/`, so `/` itself stays a bare name.
    pub fn parse(text: &str) -> Self {
        match text.find('/') {
            Some(index) if index > 0 && index < text.len() - 1 => {
                Symbol::qualified(&text[..index], &text[index + 1..])
            }
            _ => Symbol::new(text),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace.is_some()
    }

    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn with_span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    pub fn meta(&self) -> &FormMap {
        &self.meta
    }

    pub fn with_meta(mut self, meta: FormMap) -> Self {
        self.meta = meta;
        self
    }

    /// True for an unqualified symbol with exactly this name.
    pub fn is(&self, name: &str) -> bool {
        self.namespace.is_none() && self.name == name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.namespace, &self.name).cmp(&(&other.namespace, &other.name))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword {
    namespace: Option<String>,
    name: String,
}

impl Keyword {
    pub fn new(name: &str) -> Self {
        Keyword {
            namespace: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(namespace: &str, name: &str) -> Self {
        Keyword {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, ":{}/{}", ns, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

// --- Composite forms ---

/// Ordered sequence of forms, used for both lists and vectors.
#[derive(Debug, Clone, Default)]
pub struct Seq {
    items: Vector<Form>,
    span: Option<SourceSpan>,
    meta: FormMap,
}

impl Seq {
    pub fn new(items: impl IntoIterator<Item = Form>) -> Self {
        Seq {
            items: items.into_iter().collect(),
            span: None,
            meta: FormMap::new(),
        }
    }

    pub fn items(&self) -> &Vector<Form> {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Form> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&Form> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Form> {
        self.items.iter()
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn with_span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    pub fn meta(&self) -> &FormMap {
        &self.meta
    }

    pub fn with_meta(mut self, meta: FormMap) -> Self {
        self.meta = meta;
        self
    }
}

impl PartialEq for Seq {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for Seq {}

impl Hash for Seq {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.hash(state);
    }
}

impl PartialOrd for Seq {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Seq {
    fn cmp(&self, other: &Self) -> Ordering {
        self.items.cmp(&other.items)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapForm {
    entries: FormMap,
    span: Option<SourceSpan>,
    meta: FormMap,
}

impl MapForm {
    pub fn new(entries: impl IntoIterator<Item = (Form, Form)>) -> Self {
        MapForm {
            entries: entries.into_iter().collect(),
            span: None,
            meta: FormMap::new(),
        }
    }

    pub fn entries(&self) -> &FormMap {
        &self.entries
    }

    pub fn get(&self, key: &Form) -> Option<&Form> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> im::ordmap::Iter<'_, Form, Form> {
        self.entries.iter()
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn with_span(mut self, span: Option<SourceSpan>) -> Self {
        self.span = span;
        self
    }

    pub fn meta(&self) -> &FormMap {
        &self.meta
    }

    pub fn with_meta(mut self, meta: FormMap) -> Self {
        self.meta = meta;
        self
    }
}

impl PartialEq for MapForm {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for MapForm {}

impl Hash for MapForm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl PartialOrd for MapForm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapForm {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entries.cmp(&other.entries)
    }
}

// --- Form ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Form {
    Nil,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Keyword(Keyword),
    Symbol(Symbol),
    List(Seq),
    Vector(Seq),
    Map(MapForm),
}

impl Form {
    pub fn symbol(text: &str) -> Form {
        Form::Symbol(Symbol::parse(text))
    }

    pub fn keyword(name: &str) -> Form {
        Form::Keyword(Keyword::new(name))
    }

    pub fn string(text: &str) -> Form {
        Form::Str(text.to_string())
    }

    pub fn float(value: f64) -> Form {
        Form::Float(OrderedFloat(value))
    }

    pub fn list(items: impl IntoIterator<Item = Form>) -> Form {
        Form::List(Seq::new(items))
    }

    pub fn vector(items: impl IntoIterator<Item = Form>) -> Form {
        Form::Vector(Seq::new(items))
    }

    pub fn map(entries: impl IntoIterator<Item = (Form, Form)>) -> Form {
        Form::Map(MapForm::new(entries))
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Form::Symbol(sym) => sym.span(),
            Form::List(seq) | Form::Vector(seq) => seq.span(),
            Form::Map(map) => map.span(),
            _ => None,
        }
    }

    /// Attaches a span. Scalars and keywords carry no location and are
    /// returned unchanged.
    pub fn with_span(self, span: Option<SourceSpan>) -> Form {
        match self {
            Form::Symbol(sym) => Form::Symbol(sym.with_span(span)),
            Form::List(seq) => Form::List(seq.with_span(span)),
            Form::Vector(seq) => Form::Vector(seq.with_span(span)),
            Form::Map(map) => Form::Map(map.with_span(span)),
            other => other,
        }
    }

    pub fn meta(&self) -> Option<&FormMap> {
        match self {
            Form::Symbol(sym) => Some(sym.meta()),
            Form::List(seq) | Form::Vector(seq) => Some(seq.meta()),
            Form::Map(map) => Some(map.meta()),
            _ => None,
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Form::Nil | Form::Bool(false))
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Form::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn is_symbol_named(&self, name: &str) -> bool {
        matches!(self, Form::Symbol(sym) if sym.is(name))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Form::Nil => "nil",
            Form::Bool(_) => "boolean",
            Form::Int(_) => "integer",
            Form::Float(_) => "float",
            Form::Str(_) => "string",
            Form::Keyword(_) => "keyword",
            Form::Symbol(_) => "symbol",
            Form::List(_) => "list",
            Form::Vector(_) => "vector",
            Form::Map(_) => "map",
        }
    }
}

impl From<Symbol> for Form {
    fn from(sym: Symbol) -> Self {
        Form::Symbol(sym)
    }
}

impl From<Keyword> for Form {
    fn from(keyword: Keyword) -> Self {
        Form::Keyword(keyword)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_seq(f: &mut fmt::Formatter<'_>, seq: &Seq, open: &str, close: &str) -> fmt::Result {
            write!(f, "{}", open)?;
            for (i, item) in seq.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, "{}", close)
        }

        match self {
            Form::Nil => write!(f, "nil"),
            Form::Bool(b) => write!(f, "{}", b),
            Form::Int(i) => write!(f, "{}", i),
            Form::Float(x) => write!(f, "{:?}", x.into_inner()),
            Form::Str(s) => write!(f, "{:?}", s),
            Form::Keyword(k) => write!(f, "{}", k),
            Form::Symbol(sym) => write!(f, "{}", sym),
            Form::List(seq) => write_seq(f, seq, "(", ")"),
            Form::Vector(seq) => write_seq(f, seq, "[", "]"),
            Form::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{} {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// --- Symbol generation ---

/// Produces symbols that cannot collide within one analysis run.
///
/// Numbering is shared by every prefix, so `next("a")` followed by
/// `temp()` yields `a_1` and `__tmp_2`.
#[derive(Debug, Default)]
pub struct SymbolGenerator {
    counter: Cell<u64>,
}

impl SymbolGenerator {
    pub const TEMP_PREFIX: &'static str = "__tmp";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str) -> Symbol {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        Symbol::new(&format!("{}_{}", prefix, n))
    }

    pub fn temp(&self) -> Symbol {
        self.next(Self::TEMP_PREFIX)
    }

    pub fn reset(&self) {
        self.counter.set(0);
    }
}
