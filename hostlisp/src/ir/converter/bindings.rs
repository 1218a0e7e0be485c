use super::Analyzer;
use crate::ast::{Form, Seq, Symbol};
use crate::compiler::destructure::{is_simple_binding, Destructurer, REST_MARKER};
use crate::error_reporting::SourceSpan;
use crate::ir::core::{BindingNode, FnNode, Node};
use crate::ir::environment::{NodeEnvironment, RecurFrame};
use crate::ir::error::{AnalyzerError, AnalyzerResult};

impl Analyzer {
    pub(super) fn analyze_let(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let pairs = Self::binding_pairs(list, "let")?;
        let flat = Destructurer::new(&self.gensym, self.core_namespace()).run(&pairs)?;

        let block_env = env.with_return_context_if_expression();
        let (bindings, body_env) = self.analyze_bindings(flat, &block_env)?;
        let body = self.analyze_body(&Self::tail_forms(list, 2), list.span(), &body_env)?;
        Ok(Node::Let {
            env: env.clone(),
            bindings,
            body: Box::new(body),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_loop(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let pairs = Self::binding_pairs(list, "loop")?;
        if pairs.iter().any(|(pattern, _)| !is_simple_binding(pattern)) {
            let rewritten = self.rewrite_destructuring_loop(list, &pairs);
            return self.analyze(&rewritten, env);
        }

        let flat: Vec<(Symbol, Form)> = pairs
            .into_iter()
            .filter_map(|(pattern, init)| match pattern {
                Form::Symbol(sym) => Some((sym, init)),
                _ => None,
            })
            .collect();
        let frame = RecurFrame::new(flat.iter().map(|(sym, _)| sym.clone()).collect());

        let block_env = env.with_return_context_if_expression();
        let (bindings, body_env) = self.analyze_bindings(flat, &block_env)?;
        let body_env = body_env.with_added_recur_frame(frame.clone());
        let body = self.analyze_body(&Self::tail_forms(list, 2), list.span(), &body_env)?;
        Ok(Node::Loop {
            env: env.clone(),
            bindings,
            body: Box::new(body),
            frame,
            span: list.span().cloned(),
        })
    }

    /// `(loop [[a b] v n 0] ...)` becomes
    /// `(let [tmp v [a b] tmp n 0] (loop [tmp tmp n n] (let [[a b] tmp] ...)))`.
    /// The outer `let` keeps initializers left to right; `recur` rebinds the
    /// raw value rather than the derived names.
    fn rewrite_destructuring_loop(&self, list: &Seq, pairs: &[(Form, Form)]) -> Form {
        let span = list.span().cloned();
        let mut outer_bindings = Vec::new();
        let mut loop_bindings = Vec::new();
        let mut inner_bindings = Vec::new();
        for (pattern, init) in pairs {
            if is_simple_binding(pattern) {
                outer_bindings.extend([pattern.clone(), init.clone()]);
                loop_bindings.extend([pattern.clone(), pattern.clone()]);
            } else {
                let temp = Form::Symbol(self.gensym.temp().with_span(pattern.span().cloned()));
                outer_bindings.extend([temp.clone(), init.clone(), pattern.clone(), temp.clone()]);
                loop_bindings.extend([temp.clone(), temp.clone()]);
                inner_bindings.extend([pattern.clone(), temp]);
            }
        }

        let inner_let = wrap_in_let(inner_bindings, Self::tail_forms(list, 2), list.span());
        let inner_loop = Form::List(
            Seq::new([
                Form::symbol("loop"),
                Form::Vector(Seq::new(loop_bindings)),
                inner_let,
            ])
            .with_span(span),
        );
        wrap_in_let(outer_bindings, vec![inner_loop], list.span())
    }

    /// Validates `(form [p1 v1 p2 v2 ...] body...)` and returns the pairs.
    fn binding_pairs(list: &Seq, form_name: &str) -> AnalyzerResult<Vec<(Form, Form)>> {
        let bindings = match list.get(1) {
            None => {
                return Err(AnalyzerError::at_span(
                    format!("At least one argument is required for '{}", form_name),
                    list.span(),
                ))
            }
            Some(Form::Vector(bindings)) => bindings,
            Some(other) => {
                return Err(AnalyzerError::at("Binding parameter must be a vector", other))
            }
        };
        if bindings.len() % 2 != 0 {
            return Err(AnalyzerError::at_span(
                "Bindings must be a even number of parameters",
                bindings.span(),
            ));
        }
        let items: Vec<Form> = bindings.iter().cloned().collect();
        Ok(items
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }

    /// Analyzes flat bindings left to right; each initializer sees the names
    /// bound before it. Returns the nodes and the environment for the body.
    fn analyze_bindings(
        &self,
        flat: Vec<(Symbol, Form)>,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<(Vec<BindingNode>, NodeEnvironment)> {
        let mut current = env.clone();
        let mut nodes = Vec::with_capacity(flat.len());
        for (symbol, init) in flat {
            let shadow = self.gensym.next(symbol.name());
            let label = match current.bound_to() {
                "" => symbol.name().to_string(),
                outer => format!("{}.{}", outer, symbol.name()),
            };
            let init_env = Self::argument_env(&current).with_bound_to(label);
            let init = self.analyze(&init, &init_env)?;

            nodes.push(BindingNode {
                env: init_env,
                span: symbol.span().cloned(),
                symbol: symbol.clone(),
                shadow: shadow.clone(),
                init: Box::new(init),
            });
            current = current
                .with_merged_locals([&symbol])
                .with_shadowed_local(&symbol, &shadow);
        }
        Ok((nodes, current))
    }

    pub(super) fn analyze_fn(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        Ok(Node::Fn(self.analyze_fn_node(list, env)?))
    }

    /// `(fn [params...] body...)`
    pub(super) fn analyze_fn_node(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<FnNode> {
        let params_form = match list.get(1) {
            None => {
                return Err(AnalyzerError::at_span(
                    "'fn requires at least one argument",
                    list.span(),
                ))
            }
            Some(Form::Vector(params)) => params,
            Some(other) => {
                return Err(AnalyzerError::at(
                    "Second argument of 'fn must be a vector",
                    other,
                ))
            }
        };

        let (params, is_variadic, lets) = self.lower_params(params_form)?;
        let body_forms = Self::tail_forms(list, 2);
        let body_forms = if lets.is_empty() {
            body_forms
        } else {
            vec![wrap_in_let(lets, body_forms, list.span())]
        };

        let frame = RecurFrame::new(params.clone());
        let uses = env
            .locals()
            .iter()
            .filter(|local| !params.contains(local))
            .cloned()
            .collect();
        let body_env = env
            .with_merged_locals(&params)
            .with_unshadowed_locals(&params)
            .with_return_context()
            .with_added_recur_frame(frame.clone());
        let body = self.analyze_body(&body_forms, list.span(), &body_env)?;

        Ok(FnNode {
            env: env.clone(),
            params,
            body: Box::new(body),
            uses,
            is_variadic,
            frame,
            span: list.span().cloned(),
        })
    }

    /// Splits a parameter vector into plain parameter symbols, the variadic
    /// flag and the destructuring bindings for non-symbol parameters.
    fn lower_params(&self, params: &Seq) -> AnalyzerResult<(Vec<Symbol>, bool, Vec<Form>)> {
        let mut symbols = Vec::new();
        let mut lets = Vec::new();
        let mut is_variadic = false;
        let mut after_rest = 0usize;

        for param in params.iter() {
            if param.is_symbol_named(REST_MARKER) {
                is_variadic = true;
                continue;
            }
            if is_variadic {
                after_rest += 1;
                if after_rest > 1 {
                    return Err(AnalyzerError::at(
                        "Unsupported binding form, only one symbol can follow the & parameter",
                        param,
                    ));
                }
            }
            match param {
                Form::Symbol(sym) if !sym.is_qualified() => symbols.push(sym.clone()),
                pattern => {
                    let temp = self.gensym.temp().with_span(pattern.span().cloned());
                    lets.push(pattern.clone());
                    lets.push(Form::Symbol(temp.clone()));
                    symbols.push(temp);
                }
            }
        }

        if is_variadic && after_rest == 0 {
            symbols.push(self.gensym.temp().with_span(params.span().cloned()));
        }
        Ok((symbols, is_variadic, lets))
    }

    /// `(foreach [v coll] body...)` / `(foreach [k v coll] body...)`
    pub(super) fn analyze_foreach(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let header = match list.get(1) {
            None => {
                return Err(AnalyzerError::at_span(
                    "'foreach requires at least one argument",
                    list.span(),
                ))
            }
            Some(Form::Vector(header)) => header,
            Some(other) => {
                return Err(AnalyzerError::at(
                    "First argument of 'foreach must be a vector",
                    other,
                ))
            }
        };

        let items: Vec<Form> = header.iter().cloned().collect();
        let (key_pattern, value_pattern, coll) = match items.as_slice() {
            [value, coll] => (None, value, coll),
            [key, value, coll] => (Some(key), value, coll),
            _ => {
                return Err(AnalyzerError::at_span(
                    "Vector of 'foreach must have exactly two or three elements",
                    header.span(),
                ))
            }
        };

        let coll = self.analyze(coll, &Self::argument_env(env))?;

        let mut lets = Vec::new();
        let mut bind = |pattern: &Form| match pattern {
            Form::Symbol(sym) if !sym.is_qualified() => sym.clone(),
            pattern => {
                let temp = self.gensym.temp().with_span(pattern.span().cloned());
                lets.push(pattern.clone());
                lets.push(Form::Symbol(temp.clone()));
                temp
            }
        };
        let value_symbol = bind(value_pattern);
        let key_symbol = key_pattern.map(&mut bind);

        let locals: Vec<Symbol> = std::iter::once(value_symbol.clone())
            .chain(key_symbol.clone())
            .collect();
        let body_env = env
            .with_merged_locals(&locals)
            .with_unshadowed_locals(&locals)
            .with_statement_context()
            .with_disallow_recur_frame();

        let body_forms = Self::tail_forms(list, 2);
        let body_forms = if lets.is_empty() {
            body_forms
        } else {
            vec![wrap_in_let(lets, body_forms, list.span())]
        };
        let body = self.analyze_body(&body_forms, list.span(), &body_env)?;

        Ok(Node::Foreach {
            env: env.clone(),
            value_symbol,
            key_symbol,
            coll: Box::new(coll),
            body: Box::new(body),
            span: list.span().cloned(),
        })
    }
}

fn wrap_in_let(bindings: Vec<Form>, body: Vec<Form>, span: Option<&SourceSpan>) -> Form {
    Form::List(
        Seq::new(
            [Form::symbol("let"), Form::Vector(Seq::new(bindings))]
                .into_iter()
                .chain(body),
        )
        .with_span(span.cloned()),
    )
}
