//! Lowering of binding patterns into flat sequential bindings.
//!
//! `[[a b] & rest]` bound to `v` becomes
//!
//! ```text
//! __tmp_1 v
//! __tmp_2 (core/get __tmp_1 0)
//! a       (core/get __tmp_2 0)
//! b       (core/get __tmp_2 1)
//! rest    (core/drop 1 __tmp_1)
//! ```
//!
//! Map patterns `{:key pattern}` look values up with `(core/get tmp :key)`.

use crate::ast::{Form, MapForm, Seq, Symbol, SymbolGenerator};
use crate::error_reporting::SourceSpan;
use crate::ir::error::{AnalyzerError, AnalyzerResult};

pub const REST_MARKER: &str = "&";
pub const IGNORE_MARKER: &str = "_";

/// True when `pattern` binds directly without any lowering.
pub fn is_simple_binding(pattern: &Form) -> bool {
    matches!(pattern, Form::Symbol(sym) if !sym.is_qualified())
}

pub struct Destructurer<'a> {
    gensym: &'a SymbolGenerator,
    core_namespace: &'a str,
    bindings: Vec<(Symbol, Form)>,
}

impl<'a> Destructurer<'a> {
    pub fn new(gensym: &'a SymbolGenerator, core_namespace: &'a str) -> Self {
        Destructurer {
            gensym,
            core_namespace,
            bindings: Vec::new(),
        }
    }

    /// Flattens every `(pattern, value)` pair in order.
    pub fn run(mut self, pairs: &[(Form, Form)]) -> AnalyzerResult<Vec<(Symbol, Form)>> {
        for (pattern, value) in pairs {
            self.destructure(pattern, value.clone())?;
        }
        Ok(self.bindings)
    }

    fn destructure(&mut self, pattern: &Form, value: Form) -> AnalyzerResult<()> {
        match pattern {
            Form::Symbol(sym) if !sym.is_qualified() => {
                self.bindings.push((sym.clone(), value));
                Ok(())
            }
            Form::Vector(items) => self.destructure_vector(items, value),
            Form::Map(entries) => self.destructure_map(entries, value),
            other => Err(AnalyzerError::at(
                format!("Cannot destructure {}", other.type_name()),
                other,
            )),
        }
    }

    fn bind_temp(&mut self, value: Form, span: Option<&SourceSpan>) -> Symbol {
        let temp = self.gensym.temp().with_span(span.cloned());
        self.bindings.push((temp.clone(), value));
        temp
    }

    fn accessor(&self, name: &str, args: Vec<Form>, span: Option<&SourceSpan>) -> Form {
        let head = Form::Symbol(Symbol::qualified(self.core_namespace, name).with_span(span.cloned()));
        Form::List(Seq::new(std::iter::once(head).chain(args)).with_span(span.cloned()))
    }

    fn destructure_vector(&mut self, pattern: &Seq, value: Form) -> AnalyzerResult<()> {
        let span = pattern.span();
        let temp = Form::Symbol(self.bind_temp(value, span));

        let mut items = pattern.iter();
        let mut index: i64 = 0;
        while let Some(item) = items.next() {
            if item.is_symbol_named(REST_MARKER) {
                let rest: Vec<&Form> = items.by_ref().collect();
                match rest.as_slice() {
                    [] => {}
                    [rest_pattern] => {
                        if !rest_pattern.is_symbol_named(IGNORE_MARKER) {
                            let access =
                                self.accessor("drop", vec![Form::Int(index), temp.clone()], span);
                            self.destructure(rest_pattern, access)?;
                        }
                    }
                    _ => {
                        return Err(AnalyzerError::at_span(
                            "Unsupported binding form, only one symbol can follow the & parameter",
                            span,
                        ))
                    }
                }
                break;
            }

            if !item.is_symbol_named(IGNORE_MARKER) {
                let access = self.accessor("get", vec![temp.clone(), Form::Int(index)], span);
                self.destructure(item, access)?;
            }
            index += 1;
        }
        Ok(())
    }

    fn destructure_map(&mut self, pattern: &MapForm, value: Form) -> AnalyzerResult<()> {
        let span = pattern.span();
        let temp = Form::Symbol(self.bind_temp(value, span));
        for (key, sub_pattern) in pattern.iter() {
            if sub_pattern.is_symbol_named(IGNORE_MARKER) {
                continue;
            }
            let access = self.accessor("get", vec![temp.clone(), key.clone()], span);
            self.destructure(sub_pattern, access)?;
        }
        Ok(())
    }
}
