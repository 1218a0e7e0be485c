use super::Analyzer;
use crate::ast::{Form, Seq};
use crate::compiler::expander::{self, enrich_location, ExpansionKind, HostCallable, MacroContext};
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};
use crate::registry::Definition;

impl Analyzer {
    pub(super) fn analyze_invoke(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let head = list
            .first()
            .ok_or_else(|| AnalyzerError::at_span("Cannot invoke an empty list", list.span()))?;

        if let Form::Symbol(sym) = head {
            if let Some(def) = self.expandable_definition(sym, env)? {
                if let Some(expanded) = self.try_expand(&def, list)? {
                    return self.analyze(&expanded, env);
                }
            }
        }

        let arg_env = Self::argument_env(env);
        let callee = self.analyze(head, &arg_env)?;
        let args = self.analyze_all(list.iter().skip(1), &arg_env)?;
        Ok(Node::Call {
            env: env.clone(),
            callee: Box::new(callee),
            args,
            span: list.span().cloned(),
        })
    }

    /// Expanded form for a macro or inline call, or `None` for a plain call.
    fn try_expand(&self, def: &Definition, list: &Seq) -> AnalyzerResult<Option<Form>> {
        let kind = if def.is_macro() {
            ExpansionKind::Macro
        } else if def.is_inline() && self.inline_arity_matches(def, list)? {
            ExpansionKind::Inline
        } else {
            return Ok(None);
        };

        let callable = HostCallable::new(kind, &def.namespace, &def.name);
        let args = Self::tail_forms(list, 1);
        let expanded = expander::expand(self.host.as_ref(), &callable, args, &self.macro_context(list)?)?;
        Ok(Some(enrich_location(expanded, list.span())))
    }

    fn inline_arity_matches(&self, def: &Definition, list: &Seq) -> AnalyzerResult<bool> {
        if !def.has_inline_arity() {
            return Ok(true);
        }
        let argc = list.len().saturating_sub(1) as i64;
        let callable = HostCallable::new(ExpansionKind::InlineArity, &def.namespace, &def.name);
        let verdict = expander::expand(
            self.host.as_ref(),
            &callable,
            vec![Form::Int(argc)],
            &self.macro_context(list)?,
        )?;
        Ok(verdict.is_truthy())
    }

    fn macro_context<'a>(&'a self, list: &'a Seq) -> AnalyzerResult<MacroContext<'a>> {
        let namespace = self.registry.current_namespace()?;
        Ok(MacroContext::new(self, namespace, list.span()))
    }

    pub(super) fn analyze_apply(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() < 3 {
            return Err(AnalyzerError::at_span(
                "At least two arguments are required for 'apply",
                list.span(),
            ));
        }
        let arg_env = Self::argument_env(env);
        let callee = self.analyze(&list.items()[1], &arg_env)?;
        let args = self.analyze_all(list.iter().skip(2), &arg_env)?;
        Ok(Node::Apply {
            env: env.clone(),
            callee: Box::new(callee),
            args,
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_all<'f>(
        &self,
        forms: impl Iterator<Item = &'f Form>,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<Vec<Node>> {
        forms.map(|form| self.analyze(form, env)).collect()
    }
}
