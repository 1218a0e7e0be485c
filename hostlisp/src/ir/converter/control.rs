use super::Analyzer;
use crate::ast::{Form, Seq};
use crate::error_reporting::SourceSpan;
use crate::ir::core::{CatchNode, Node};
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};

impl Analyzer {
    pub(super) fn analyze_do(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        self.analyze_body(&Self::tail_forms(list, 1), list.span(), env)
    }

    /// Implicit `do` over `forms`: every form but the last runs as a
    /// statement, the last one inherits `env`'s context.
    pub(super) fn analyze_body(
        &self,
        forms: &[Form],
        span: Option<&SourceSpan>,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<Node> {
        let (stmts, ret) = match forms {
            [] => (Vec::new(), self.analyze(&Form::Nil, env)?),
            [single] => (Vec::new(), self.analyze(single, env)?),
            [init @ .., last] => {
                let stmt_env = env.with_statement_context().with_disallow_recur_frame();
                let stmts = self.analyze_all(init.iter(), &stmt_env)?;
                (stmts, self.analyze(last, env)?)
            }
        };
        Ok(Node::Do {
            env: env.clone(),
            stmts,
            ret: Box::new(ret),
            span: span.cloned(),
        })
    }

    pub(super) fn analyze_if(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if !(3..=4).contains(&list.len()) {
            return Err(AnalyzerError::at_span(
                "'if requires two or three arguments",
                list.span(),
            ));
        }
        let forms = Self::tail_forms(list, 1);
        let test = self.analyze(&forms[0], &Self::argument_env(env))?;
        let then_branch = self.analyze(&forms[1], env)?;
        let nil = Form::Nil;
        let else_branch = self.analyze(forms.get(2).unwrap_or(&nil), env)?;
        Ok(Node::If {
            env: env.clone(),
            test: Box::new(test),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_quote(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        match list.get(1) {
            Some(value) if list.len() == 2 => Ok(Node::Quote {
                env: env.clone(),
                value: value.clone(),
                span: list.span().cloned(),
            }),
            _ => Err(AnalyzerError::at_span(
                "Exactly one argument is required for 'quote",
                list.span(),
            )),
        }
    }

    pub(super) fn analyze_recur(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let frame = env
            .current_recur_frame()
            .ok_or_else(|| AnalyzerError::at_span("Can't call 'recur here", list.span()))?;

        let expected = frame.params().len();
        let got = list.len() - 1;
        if expected != got {
            return Err(AnalyzerError::at_span(
                format!(
                    "Wrong number of arguments for 'recur. Expected: {} got: {}",
                    expected, got
                ),
                list.span(),
            ));
        }

        frame.set_active();
        let args = self.analyze_all(list.iter().skip(1), &Self::argument_env(env))?;
        Ok(Node::Recur {
            env: env.clone(),
            frame: frame.clone(),
            args,
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_throw(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let exception = match list.get(1) {
            Some(form) if list.len() == 2 => self.analyze(form, &Self::argument_env(env))?,
            _ => {
                return Err(AnalyzerError::at_span(
                    "'throw requires exactly one argument",
                    list.span(),
                ))
            }
        };
        Ok(Node::Throw {
            env: env.clone(),
            exception: Box::new(exception),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_try(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let mut body = Vec::new();
        let mut catches: Vec<&Seq> = Vec::new();
        let mut finally: Option<&Seq> = None;

        for form in list.iter().skip(1) {
            if finally.is_some() {
                return Err(AnalyzerError::at("Invalid 'try form", form));
            }
            match clause_head(form) {
                Some((clause, "catch")) => catches.push(clause),
                Some((clause, "finally")) => finally = Some(clause),
                _ if !catches.is_empty() => {
                    return Err(AnalyzerError::at("Invalid 'try form", form));
                }
                _ => body.push(form.clone()),
            }
        }

        if catches.is_empty() && finally.is_none() {
            return self.analyze_body(&body, list.span(), env);
        }

        let try_env = env.with_return_context_if_expression();
        let body_node = self.analyze_body(&body, list.span(), &try_env.with_disallow_recur_frame())?;
        let catch_nodes = catches
            .into_iter()
            .map(|clause| self.analyze_catch(clause, &try_env))
            .collect::<AnalyzerResult<Vec<_>>>()?;
        let finally_node = finally
            .map(|clause| {
                let finally_env = env.with_statement_context().with_disallow_recur_frame();
                self.analyze_body(&Self::tail_forms(clause, 1), clause.span(), &finally_env)
            })
            .transpose()?;

        Ok(Node::Try {
            env: env.clone(),
            body: Box::new(body_node),
            catches: catch_nodes,
            finally: finally_node.map(Box::new),
            span: list.span().cloned(),
        })
    }

    /// `(catch Type name body...)`
    fn analyze_catch(&self, clause: &Seq, env: &NodeEnvironment) -> AnalyzerResult<CatchNode> {
        let (type_sym, name) = match (clause.get(1), clause.get(2)) {
            (Some(Form::Symbol(type_sym)), Some(Form::Symbol(name))) if !name.is_qualified() => {
                (type_sym, name)
            }
            _ => {
                return Err(AnalyzerError::at_span(
                    "First argument of 'catch must be a class name and second a Symbol",
                    clause.span(),
                ))
            }
        };

        let exception_type = self.analyze_symbol(type_sym, &Self::argument_env(env))?;
        if !matches!(exception_type, Node::HostClassName { .. }) {
            return Err(AnalyzerError::at_span(
                format!("Cannot resolve exception type '{}'", type_sym),
                type_sym.span(),
            ));
        }

        let body_env = env
            .with_merged_locals([name])
            .with_unshadowed_locals([name])
            .with_disallow_recur_frame();
        let body = self.analyze_body(&Self::tail_forms(clause, 3), clause.span(), &body_env)?;
        Ok(CatchNode {
            env: env.clone(),
            exception_type: Box::new(exception_type),
            symbol: name.clone(),
            body: Box::new(body),
            span: clause.span().cloned(),
        })
    }
}

/// Splits `(catch ...)` / `(finally ...)` clauses from ordinary forms.
fn clause_head(form: &Form) -> Option<(&Seq, &str)> {
    match form {
        Form::List(seq) => match seq.first() {
            Some(Form::Symbol(head)) if head.is("catch") || head.is("finally") => {
                Some((seq, head.name()))
            }
            _ => None,
        },
        _ => None,
    }
}
