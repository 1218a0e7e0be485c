use super::Analyzer;
use crate::ast::{Form, Seq, Symbol};
use crate::error_reporting::SourceSpan;
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};
use crate::registry::NamespaceRegistry;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NAMESPACE_SEGMENT: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").unwrap();
}

/// Clauses collected from an `ns` form. Nothing reaches the registry until
/// every clause has been validated.
#[derive(Default)]
struct NsImports {
    requires: Vec<Symbol>,
    require_files: Vec<String>,
    use_aliases: Vec<(String, String)>,
    require_aliases: Vec<(String, String)>,
    refers: Vec<(String, String)>,
}

impl NsImports {
    fn register(&self, registry: &NamespaceRegistry, namespace: &str) -> AnalyzerResult<()> {
        registry.set_current_namespace(namespace)?;
        for (alias, class_name) in &self.use_aliases {
            registry.add_use_alias(namespace, alias, class_name)?;
        }
        for (alias, target) in &self.require_aliases {
            registry.add_require_alias(namespace, alias, target)?;
        }
        for (name, source) in &self.refers {
            registry.add_refer(namespace, name, source)?;
        }
        Ok(())
    }
}

impl Analyzer {
    /// `(ns name (:use ...) (:require ...) (:require-file ...))`
    pub(super) fn analyze_ns(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let name = match list.get(1) {
            Some(Form::Symbol(sym)) if !sym.is_qualified() => sym,
            Some(other) => {
                return Err(AnalyzerError::at("First argument of 'ns must be a Symbol", other))
            }
            None => {
                return Err(AnalyzerError::at_span(
                    "'ns requires at least one argument",
                    list.span(),
                ))
            }
        };
        let namespace = name.name().to_string();
        self.validate_namespace(&namespace, name.span())?;

        let mut imports = NsImports::default();
        if namespace != self.core_namespace() {
            imports.requires.push(Symbol::new(self.core_namespace()));
        }
        for clause in list.iter().skip(2) {
            self.analyze_ns_clause(clause, &mut imports)?;
        }
        imports.register(&self.registry, &namespace)?;

        Ok(Node::Ns {
            env: env.clone(),
            namespace,
            requires: imports.requires,
            require_files: imports.require_files,
            span: list.span().cloned(),
        })
    }

    fn analyze_ns_clause(&self, clause: &Form, imports: &mut NsImports) -> AnalyzerResult<()> {
        let (kind, args) = match clause {
            Form::List(seq) => match seq.first() {
                Some(Form::Keyword(kind)) if kind.namespace().is_none() => {
                    (kind.name().to_string(), Self::tail_forms(seq, 1))
                }
                _ => return Err(AnalyzerError::at("Invalid 'ns clause", clause)),
            },
            _ => return Err(AnalyzerError::at("Invalid 'ns clause", clause)),
        };

        match kind.as_str() {
            "use" => analyze_use_clause(&args, clause, imports),
            "require" => self.analyze_require_clause(&args, clause, imports),
            "require-file" => {
                for arg in &args {
                    match arg {
                        Form::Str(path) => imports.require_files.push(path.clone()),
                        other => {
                            return Err(AnalyzerError::at(
                                "Arguments of :require-file must be Strings",
                                other,
                            ))
                        }
                    }
                }
                Ok(())
            }
            other => Err(AnalyzerError::at(
                format!("Unexpected 'ns clause :{}", other),
                clause,
            )),
        }
    }

    /// `(:require some.ns :as alias :refer [a b])`
    fn analyze_require_clause(
        &self,
        args: &[Form],
        clause: &Form,
        imports: &mut NsImports,
    ) -> AnalyzerResult<()> {
        let (required, options) = match args.split_first() {
            Some((Form::Symbol(sym), options)) if !sym.is_qualified() => (sym, options),
            _ => {
                return Err(AnalyzerError::at(
                    "First argument of :require must be a Symbol",
                    clause,
                ))
            }
        };
        self.validate_namespace(required.name(), required.span())?;

        let mut alias = last_segment(required.name()).to_string();
        let mut refers = Vec::new();
        for option in options.chunks(2) {
            match option {
                [key, Form::Symbol(sym)] if is_keyword(key, "as") && !sym.is_qualified() => {
                    alias = sym.name().to_string();
                }
                [key, Form::Vector(names)] if is_keyword(key, "refer") => {
                    for name in names.iter() {
                        match name {
                            Form::Symbol(sym) if !sym.is_qualified() => refers.push(sym.clone()),
                            other => {
                                return Err(AnalyzerError::at(
                                    "Values of :refer must be Symbols",
                                    other,
                                ))
                            }
                        }
                    }
                }
                _ => {
                    return Err(AnalyzerError::at(
                        "Options of :require must be :as Symbol or :refer Vector",
                        clause,
                    ))
                }
            }
        }

        imports
            .require_aliases
            .push((alias, required.name().to_string()));
        imports.refers.extend(
            refers
                .iter()
                .map(|sym| (sym.name().to_string(), required.name().to_string())),
        );
        imports.requires.push(required.clone());
        Ok(())
    }

    /// `(in-ns name)` with a symbol, string or quoted symbol.
    pub(super) fn analyze_in_ns(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() != 2 {
            return Err(AnalyzerError::at_span(
                "Exactly one argument is required for 'in-ns",
                list.span(),
            ));
        }
        let arg = &list.items()[1];
        let namespace = match arg {
            Form::Symbol(sym) if !sym.is_qualified() => sym.name().to_string(),
            Form::Str(name) => name.clone(),
            Form::List(quoted) if quoted.len() == 2 && quoted.first().map_or(false, |h| h.is_symbol_named("quote")) => {
                match quoted.get(1) {
                    Some(Form::Symbol(sym)) if !sym.is_qualified() => sym.name().to_string(),
                    _ => {
                        return Err(AnalyzerError::at(
                            "First argument of 'in-ns must be a Symbol or a String",
                            arg,
                        ))
                    }
                }
            }
            _ => {
                return Err(AnalyzerError::at(
                    "First argument of 'in-ns must be a Symbol or a String",
                    arg,
                ))
            }
        };
        self.validate_namespace(&namespace, arg.span().or(list.span()))?;
        self.registry.set_current_namespace(&namespace)?;

        Ok(Node::InNs {
            env: env.clone(),
            namespace,
            span: list.span().cloned(),
        })
    }

    /// Every dot-separated segment must be an identifier and must not be a
    /// reserved word of the host platform.
    pub fn validate_namespace(&self, namespace: &str, span: Option<&SourceSpan>) -> AnalyzerResult<()> {
        for part in namespace.split('.') {
            if self.config.is_reserved_word(part) {
                return Err(AnalyzerError::at_span(
                    format!(
                        "The namespace is not valid. The part '{}' can not be used because it is a reserved keyword.",
                        part
                    ),
                    span,
                ));
            }
            if !NAMESPACE_SEGMENT.is_match(part) {
                return Err(AnalyzerError::at_span(
                    "The namespace is not valid. A valid namespace name starts with a letter or underscore, followed by any number of letters, numbers, or dashes. Elements are separated by a dot.",
                    span,
                ));
            }
        }
        Ok(())
    }
}

/// `(:use Vendor.Library :as Alias Other.Class ...)`
fn analyze_use_clause(args: &[Form], clause: &Form, imports: &mut NsImports) -> AnalyzerResult<()> {
    let mut index = 0;
    while index < args.len() {
        let class = match &args[index] {
            Form::Symbol(sym) if !sym.is_qualified() => sym,
            other => return Err(AnalyzerError::at("Arguments of :use must be Symbols", other)),
        };
        index += 1;

        let mut alias = last_segment(class.name()).to_string();
        if args.get(index).map_or(false, |f| is_keyword(f, "as")) {
            match args.get(index + 1) {
                Some(Form::Symbol(sym)) if !sym.is_qualified() => alias = sym.name().to_string(),
                _ => return Err(AnalyzerError::at("Alias of :use must be a Symbol", clause)),
            }
            index += 2;
        }

        let class_name = format!("\\{}", class.name().trim_start_matches('\\').replace('.', "\\"));
        imports.use_aliases.push((alias, class_name));
    }
    Ok(())
}

fn last_segment(name: &str) -> &str {
    name.rsplit(['.', '\\']).next().unwrap_or(name)
}

fn is_keyword(form: &Form, name: &str) -> bool {
    matches!(form, Form::Keyword(kw) if kw.namespace().is_none() && kw.name() == name)
}
