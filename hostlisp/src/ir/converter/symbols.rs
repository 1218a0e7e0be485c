// Symbol resolution
//
// Precedence, first match wins:
//   1. host escapes: `php/name` and `\Fully\Qualified` class names
//   2. locals (including shadowed ones)
//   3. use-aliases of the current namespace
//   4. `prefix/name`: prefix through require-aliases, no core fallback
//   5. bare names: current namespace, refers, core

use super::{Analyzer, HOST_NAMESPACE};
use crate::ast::Symbol;
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};
use crate::registry::Definition;

impl Analyzer {
    pub(super) fn analyze_symbol(&self, sym: &Symbol, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let span = sym.span().cloned();

        if let Some(node) = self.host_reference(sym, env) {
            return Ok(node);
        }

        if Self::is_local_symbol(sym, env) {
            return Ok(Node::LocalVar {
                env: env.clone(),
                name: sym.clone(),
                shadow: env.shadowed(sym).cloned(),
                span,
            });
        }

        if let Some(class) = self.use_alias(sym)? {
            return Ok(Node::HostClassName {
                env: env.clone(),
                name: class,
                span,
            });
        }

        match self.resolve_global(sym)? {
            Some(def) => Ok(Node::GlobalVar {
                env: env.clone(),
                namespace: def.namespace,
                name: sym.clone(),
                meta: def.meta,
                span,
            }),
            None => Err(AnalyzerError::at_span(
                format!("Cannot resolve symbol '{}'", sym.full_name()),
                sym.span(),
            )),
        }
    }

    fn host_reference(&self, sym: &Symbol, env: &NodeEnvironment) -> Option<Node> {
        let span = sym.span().cloned();
        match sym.namespace() {
            Some(HOST_NAMESPACE) => Some(Node::HostVar {
                env: env.clone(),
                name: sym.name().to_string(),
                span,
            }),
            None if sym.name().starts_with('\\') => Some(Node::HostClassName {
                env: env.clone(),
                name: sym.name().to_string(),
                span,
            }),
            _ => None,
        }
    }

    pub(super) fn is_local_symbol(sym: &Symbol, env: &NodeEnvironment) -> bool {
        !sym.is_qualified() && (env.is_local(sym) || env.shadowed(sym).is_some())
    }

    fn use_alias(&self, sym: &Symbol) -> AnalyzerResult<Option<String>> {
        if sym.is_qualified() {
            return Ok(None);
        }
        let current = self.registry.current_namespace()?;
        Ok(self.registry.use_alias(&current, sym.name())?)
    }

    /// Definition a symbol denotes, ignoring locals and host references.
    pub(super) fn resolve_global(&self, sym: &Symbol) -> AnalyzerResult<Option<Definition>> {
        let current = self.registry.current_namespace()?;
        let found = match sym.namespace() {
            Some(prefix) => {
                let namespace = self
                    .registry
                    .require_alias(&current, prefix)?
                    .unwrap_or_else(|| prefix.to_string());
                self.registry.definition(&namespace, sym.name())?
            }
            None => self.resolve_unqualified(&current, sym.name())?,
        };

        match found {
            Some(def) if def.is_private() && def.namespace != current => Err(AnalyzerError::at_span(
                format!("Cannot access private definition '{}'", def.full_name()),
                sym.span(),
            )),
            other => Ok(other),
        }
    }

    fn resolve_unqualified(&self, current: &str, name: &str) -> AnalyzerResult<Option<Definition>> {
        if let Some(def) = self.registry.definition(current, name)? {
            return Ok(Some(def));
        }
        if let Some(source) = self.registry.refer(current, name)? {
            if let Some(def) = self.registry.definition(&source, name)? {
                return Ok(Some(def));
            }
        }
        Ok(self.registry.definition(self.core_namespace(), name)?)
    }

    /// Definition an invocation head may expand through. Locals, host
    /// references and use-aliases never do.
    pub(super) fn expandable_definition(
        &self,
        sym: &Symbol,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<Option<Definition>> {
        if sym.namespace() == Some(HOST_NAMESPACE)
            || sym.name().starts_with('\\')
            || Self::is_local_symbol(sym, env)
            || self.use_alias(sym)?.is_some()
        {
            return Ok(None);
        }
        self.resolve_global(sym)
    }
}
