use super::Analyzer;
use crate::ast::{Form, FormMap, MapForm, Seq, Symbol};
use crate::error_reporting::SourceSpan;
use crate::ir::core::{InterfaceMethod, Node, StructInterfaceImpl, StructMethod};
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};
use itertools::Itertools;

/// Parent class of every exception declared with `defexception*`.
pub const EXCEPTION_BASE_CLASS: &str = "\\Exception";

impl Analyzer {
    /// `(def name meta? init)`
    pub(super) fn analyze_def(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if !env.is_def_allowed() {
            return Err(AnalyzerError::at_span(
                "'def inside of a 'def is forbidden",
                list.span(),
            ));
        }
        let forms = Self::tail_forms(list, 2);
        let (meta_form, init) = match forms.as_slice() {
            [meta, init] => (Some(meta), init),
            [init] => (None, init),
            _ => {
                return Err(AnalyzerError::at_span(
                    format!(
                        "Two or three arguments are required for 'def. Got {}",
                        list.len().saturating_sub(1)
                    ),
                    list.span(),
                ))
            }
        };
        let name = self.definition_name(list, "def")?;

        let mut meta = name.meta().clone();
        if let Some(meta_form) = meta_form {
            meta = normalize_meta(meta_form)?.union(meta);
        }
        if let Some(span) = list.span() {
            meta = meta.union(location_meta(span));
        }

        let namespace = self.registry.current_namespace()?;
        let previous = self
            .registry
            .add_definition(&namespace, name.name(), meta.clone())
            .map_err(|e| AnalyzerError::from(e).or_span(name.span()))?;

        let init_env = Self::argument_env(env)
            .with_def_allowed(false)
            .with_bound_to(format!("{}\\{}", namespace, name.name()));
        let analyzed = self
            .analyze(
                &Form::Map(MapForm::new(meta.clone()).with_span(list.span().cloned())),
                &init_env,
            )
            .and_then(|meta_node| Ok((meta_node, self.analyze(init, &init_env)?)));
        let (meta_node, init) = match analyzed {
            Ok(nodes) => nodes,
            Err(err) => {
                self.registry
                    .restore_definition(&namespace, name.name(), previous)?;
                return Err(err);
            }
        };

        Ok(Node::Def {
            env: env.clone(),
            namespace,
            name,
            meta,
            meta_node: Box::new(meta_node),
            init: Box::new(init),
            span: list.span().cloned(),
        })
    }

    /// Unqualified name in second position of a defining form.
    fn definition_name(&self, list: &Seq, form_name: &str) -> AnalyzerResult<Symbol> {
        match list.get(1) {
            Some(Form::Symbol(sym)) if !sym.is_qualified() => Ok(sym.clone()),
            other => Err(AnalyzerError::at_span(
                format!("First argument of '{} must be a Symbol.", form_name),
                other.and_then(Form::span).or(list.span()),
            )),
        }
    }

    /// `(set! name value)`
    pub(super) fn analyze_set_var(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() != 3 {
            return Err(AnalyzerError::at_span(
                "Exactly two arguments are required for 'set!",
                list.span(),
            ));
        }
        let arg_env = Self::argument_env(env);
        let target = match list.get(1) {
            Some(Form::Symbol(sym)) => self.analyze_symbol(sym, &arg_env)?,
            other => {
                return Err(AnalyzerError::at_span(
                    "First argument of 'set! must be a Symbol",
                    other.and_then(Form::span).or(list.span()),
                ))
            }
        };
        if !matches!(target, Node::GlobalVar { .. }) {
            return Err(AnalyzerError::at_span(
                "Only global definitions can be changed with 'set!",
                target.span().or(list.span()),
            ));
        }
        let value = self.analyze(&list.items()[2], &arg_env)?;
        Ok(Node::SetVar {
            env: env.clone(),
            target: Box::new(target),
            value: Box::new(value),
            span: list.span().cloned(),
        })
    }

    /// `(definterface* Name (method [this args...] "doc"?) ...)`
    pub(super) fn analyze_def_interface(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() < 2 {
            return Err(AnalyzerError::at_span(
                "At least one argument is required for 'definterface*",
                list.span(),
            ));
        }
        let name = self.definition_name(list, "definterface*")?;
        let methods = list
            .iter()
            .skip(2)
            .map(parse_interface_method)
            .collect::<AnalyzerResult<Vec<_>>>()?;

        let namespace = self.registry.current_namespace()?;
        let meta = flag_meta("interface").union(list.span().map(location_meta).unwrap_or_default());
        self.registry
            .add_definition(&namespace, name.name(), meta)
            .map_err(|e| AnalyzerError::from(e).or_span(name.span()))?;
        self.registry.add_interface(
            &namespace,
            name.name(),
            methods.iter().map(|m| m.name.name().to_string()).collect(),
        )?;

        Ok(Node::DefInterface {
            env: env.clone(),
            namespace,
            name,
            methods,
            span: list.span().cloned(),
        })
    }

    /// `(defstruct* Name [fields...] Interface (method [this args...] body...) ...)`
    pub(super) fn analyze_def_struct(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() < 3 {
            return Err(AnalyzerError::at_span(
                "At least two arguments are required for 'defstruct*",
                list.span(),
            ));
        }
        let name = self.definition_name(list, "defstruct*")?;
        let fields = match list.get(2) {
            Some(Form::Vector(fields)) => fields
                .iter()
                .map(|field| match field {
                    Form::Symbol(sym) if !sym.is_qualified() => Ok(sym.clone()),
                    other => Err(AnalyzerError::at("Struct fields must be Symbols", other)),
                })
                .collect::<AnalyzerResult<Vec<_>>>()?,
            other => {
                return Err(AnalyzerError::at_span(
                    "Second argument of 'defstruct* must be a vector",
                    other.and_then(Form::span).or(list.span()),
                ))
            }
        };

        let namespace = self.registry.current_namespace()?;
        let meta = flag_meta("struct").union(list.span().map(location_meta).unwrap_or_default());
        self.registry
            .add_definition(&namespace, name.name(), meta)
            .map_err(|e| AnalyzerError::from(e).or_span(name.span()))?;

        let method_env = env
            .with_merged_locals(&fields)
            .with_unshadowed_locals(&fields)
            .with_bound_to(format!("{}\\{}", namespace, name.name()));
        let interfaces = self
            .group_struct_methods(list)?
            .into_iter()
            .map(|(iface, methods)| self.analyze_struct_interface(iface, methods, &method_env))
            .collect::<AnalyzerResult<Vec<_>>>()?;

        Ok(Node::DefStruct {
            env: env.clone(),
            namespace,
            name,
            fields,
            interfaces,
            span: list.span().cloned(),
        })
    }

    /// Groups the trailing forms of `defstruct*` by the interface symbol that
    /// precedes them.
    fn group_struct_methods<'a>(&self, list: &'a Seq) -> AnalyzerResult<Vec<(&'a Symbol, Vec<&'a Seq>)>> {
        let mut groups: Vec<(&Symbol, Vec<&Seq>)> = Vec::new();
        for form in list.iter().skip(3) {
            match form {
                Form::Symbol(iface) => groups.push((iface, Vec::new())),
                Form::List(method) => match groups.last_mut() {
                    Some((_, methods)) => methods.push(method),
                    None => {
                        return Err(AnalyzerError::at(
                            "Struct methods must follow an interface name",
                            form,
                        ))
                    }
                },
                other => {
                    return Err(AnalyzerError::at(
                        format!("Unexpected {} in 'defstruct*", other.type_name()),
                        other,
                    ))
                }
            }
        }
        Ok(groups)
    }

    fn analyze_struct_interface(
        &self,
        iface: &Symbol,
        methods: Vec<&Seq>,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<StructInterfaceImpl> {
        let unresolved = || {
            AnalyzerError::at_span(
                format!("Cannot resolve interface '{}'", iface.full_name()),
                iface.span(),
            )
        };
        let def = self.resolve_global(iface)?.ok_or_else(unresolved)?;
        let declared = self
            .registry
            .interface_methods(&def.namespace, &def.name)?
            .ok_or_else(unresolved)?;
        let interface = format!("{}\\{}", def.namespace, def.name);

        let mut implemented = Vec::with_capacity(methods.len());
        for method in methods {
            let method_name = match method.first() {
                Some(Form::Symbol(sym)) if !sym.is_qualified() => sym.clone(),
                _ => {
                    return Err(AnalyzerError::at_span(
                        "Struct method must start with a Symbol",
                        method.span(),
                    ))
                }
            };
            if !declared.iter().any(|m| m == method_name.name()) {
                return Err(AnalyzerError::at_span(
                    format!(
                        "The interface '{}' does not declare a method '{}'",
                        def.full_name(),
                        method_name
                    ),
                    method_name.span(),
                ));
            }
            let fn_form = Seq::new(
                std::iter::once(Form::symbol("fn")).chain(method.iter().skip(1).cloned()),
            )
            .with_span(method.span().cloned());
            let function = self.analyze_fn_node(&fn_form, env)?;
            implemented.push(StructMethod {
                name: method_name,
                function,
            });
        }

        let missing: Vec<&String> = declared
            .iter()
            .filter(|m| !implemented.iter().any(|i| i.name.name() == m.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(AnalyzerError::at_span(
                format!(
                    "Missing implementation of {} for interface '{}'",
                    missing.iter().map(|m| format!("'{}'", m)).join(", "),
                    def.full_name()
                ),
                iface.span(),
            ));
        }

        Ok(StructInterfaceImpl {
            interface,
            methods: implemented,
        })
    }

    /// `(defexception* Name)`
    pub(super) fn analyze_def_exception(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() != 2 {
            return Err(AnalyzerError::at_span(
                "Exactly one argument is required for 'defexception*",
                list.span(),
            ));
        }
        let name = self.definition_name(list, "defexception*")?;
        let namespace = self.registry.current_namespace()?;
        let meta = flag_meta("exception").union(list.span().map(location_meta).unwrap_or_default());
        self.registry
            .add_definition(&namespace, name.name(), meta)
            .map_err(|e| AnalyzerError::from(e).or_span(name.span()))?;

        Ok(Node::DefException {
            env: env.clone(),
            namespace,
            name,
            parent: EXCEPTION_BASE_CLASS.to_string(),
            span: list.span().cloned(),
        })
    }
}

/// String → `{:doc s}`, keyword → `{kw true}`, map → itself.
fn normalize_meta(form: &Form) -> AnalyzerResult<FormMap> {
    match form {
        Form::Str(doc) => Ok(FormMap::unit(Form::keyword("doc"), Form::Str(doc.clone()))),
        Form::Keyword(kw) => Ok(FormMap::unit(Form::Keyword(kw.clone()), Form::Bool(true))),
        Form::Map(map) => Ok(map.entries().clone()),
        other => Err(AnalyzerError::at(
            "Metadata must be a String, Keyword or Map",
            other,
        )),
    }
}

fn flag_meta(flag: &str) -> FormMap {
    FormMap::unit(Form::keyword(flag), Form::Bool(true))
}

/// `:start-location` / `:end-location` entries describing `span`.
pub(crate) fn location_meta(span: &SourceSpan) -> FormMap {
    let location = |line: usize, column: usize| {
        let mut entries = vec![
            (Form::keyword("line"), Form::Int(line as i64)),
            (Form::keyword("column"), Form::Int(column as i64)),
        ];
        if let Some(file) = &span.file_path {
            entries.push((Form::keyword("file"), Form::string(file)));
        }
        Form::map(entries)
    };
    FormMap::new()
        .update(
            Form::keyword("start-location"),
            location(span.start_line, span.start_column),
        )
        .update(
            Form::keyword("end-location"),
            location(span.end_line, span.end_column),
        )
}

/// `(name [this args...] "doc"?)`
fn parse_interface_method(form: &Form) -> AnalyzerResult<InterfaceMethod> {
    let Form::List(method) = form else {
        return Err(AnalyzerError::at("Interface methods must be Lists", form));
    };
    let name = match method.first() {
        Some(Form::Symbol(sym)) if !sym.is_qualified() => sym.clone(),
        _ => {
            return Err(AnalyzerError::at(
                "Interface method must start with a Symbol",
                form,
            ))
        }
    };
    let params = match method.get(1) {
        Some(Form::Vector(params)) if !params.is_empty() => params
            .iter()
            .map(|p| match p {
                Form::Symbol(sym) if !sym.is_qualified() => Ok(sym.clone()),
                other => Err(AnalyzerError::at(
                    "Interface method arguments must be Symbols",
                    other,
                )),
            })
            .collect::<AnalyzerResult<Vec<_>>>()?,
        _ => {
            return Err(AnalyzerError::at(
                format!(
                    "Interface method '{}' needs an argument vector starting with the instance argument",
                    name
                ),
                form,
            ))
        }
    };
    let comment = match (method.len(), method.get(2)) {
        (2, None) => None,
        (3, Some(Form::Str(doc))) => Some(doc.clone()),
        _ => {
            return Err(AnalyzerError::at(
                format!("Invalid declaration of interface method '{}'", name),
                form,
            ))
        }
    };
    Ok(InterfaceMethod {
        name,
        params,
        comment,
    })
}
