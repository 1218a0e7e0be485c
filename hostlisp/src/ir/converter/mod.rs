//! Form to AST analysis.
//!
//! `Analyzer::analyze` is the single entry point. Lists whose head names a
//! special form are routed to that form's analyzer (see `special_forms`);
//! every other list is an invocation, expanded first when its head denotes a
//! macro or inline function. Every recursive call receives a derived
//! [`NodeEnvironment`] chosen for the position being analyzed.

mod bindings;
mod control;
mod definitions;
mod interop;
mod invoke;
mod namespace;
mod special_forms;
mod symbols;

pub use special_forms::SpecialForm;

use crate::ast::{Form, MapForm, Seq, SymbolGenerator};
use crate::compiler::expander::{MacroHost, NoMacroHost};
use crate::config::AnalyzerConfig;
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::AnalyzerResult;
use crate::registry::NamespaceRegistry;
use std::sync::Arc;

/// Namespace of host-platform references (`php/strlen`, `php/new`, ...).
pub const HOST_NAMESPACE: &str = "php";

#[derive(Debug)]
pub struct Analyzer {
    registry: Arc<NamespaceRegistry>,
    host: Arc<dyn MacroHost>,
    config: AnalyzerConfig,
    gensym: SymbolGenerator,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::with_config(AnalyzerConfig::default(), Arc::new(NoMacroHost))
    }
}

impl Analyzer {
    pub fn new(registry: Arc<NamespaceRegistry>, host: Arc<dyn MacroHost>) -> Self {
        Analyzer::from_parts(registry, host, AnalyzerConfig::default())
    }

    /// Analyzer over a fresh registry built from `config`.
    pub fn with_config(config: AnalyzerConfig, host: Arc<dyn MacroHost>) -> Self {
        let registry = Arc::new(NamespaceRegistry::from_config(&config));
        Analyzer::from_parts(registry, host, config)
    }

    pub fn from_parts(
        registry: Arc<NamespaceRegistry>,
        host: Arc<dyn MacroHost>,
        config: AnalyzerConfig,
    ) -> Self {
        Analyzer {
            registry,
            host,
            config,
            gensym: SymbolGenerator::new(),
        }
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub fn host(&self) -> &Arc<dyn MacroHost> {
        &self.host
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn gensym(&self) -> &SymbolGenerator {
        &self.gensym
    }

    /// Restarts shadow and temporary numbering.
    pub fn reset_gensym(&self) {
        self.gensym.reset();
    }

    pub fn core_namespace(&self) -> &str {
        &self.config.core_namespace
    }

    /// Analyzes a form at the top level of a file.
    pub fn analyze_top_level(&self, form: &Form) -> AnalyzerResult<Node> {
        self.analyze(form, &NodeEnvironment::empty())
    }

    pub fn analyze(&self, form: &Form, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        match form {
            Form::Symbol(sym) => self.analyze_symbol(sym, env),
            Form::List(list) if list.is_empty() => Ok(self.literal(form, env)),
            Form::List(list) => self.analyze_list(list, env),
            Form::Vector(items) => self.analyze_vector(items, env),
            Form::Map(map) => self.analyze_map(map, env),
            _ => Ok(self.literal(form, env)),
        }
    }

    fn analyze_list(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let special = list
            .first()
            .and_then(Form::as_symbol)
            .and_then(SpecialForm::from_symbol);
        match special {
            Some(special) => {
                log::trace!("Analyzing special form '{}'", special.name());
                self.analyze_special_form(special, list, env)
            }
            None => self.analyze_invoke(list, env),
        }
    }

    fn literal(&self, form: &Form, env: &NodeEnvironment) -> Node {
        Node::Literal {
            env: env.clone(),
            value: form.clone(),
            span: form.span().cloned(),
        }
    }

    fn analyze_vector(&self, items: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let element_env = Self::argument_env(env);
        let elements = items
            .iter()
            .map(|item| self.analyze(item, &element_env))
            .collect::<AnalyzerResult<Vec<_>>>()?;
        Ok(Node::Vector {
            env: env.clone(),
            elements,
            span: items.span().cloned(),
        })
    }

    fn analyze_map(&self, map: &MapForm, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let entry_env = Self::argument_env(env);
        let entries = map
            .iter()
            .map(|(key, value)| {
                Ok((
                    self.analyze(key, &entry_env)?,
                    self.analyze(value, &entry_env)?,
                ))
            })
            .collect::<AnalyzerResult<Vec<_>>>()?;
        Ok(Node::Map {
            env: env.clone(),
            entries,
            span: map.span().cloned(),
        })
    }

    /// Environment for positions that are never tail positions: call
    /// arguments, collection elements, tests and initializers.
    fn argument_env(env: &NodeEnvironment) -> NodeEnvironment {
        env.with_expression_context().with_disallow_recur_frame()
    }

    /// Every form after the first `skip` elements of `list`.
    fn tail_forms(list: &Seq, skip: usize) -> Vec<Form> {
        list.iter().skip(skip).cloned().collect()
    }
}
