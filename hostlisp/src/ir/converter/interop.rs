// Host interop forms: php/new, php/->, php/::, php/oset and the php/a* array forms.
// None of their positions is a tail position.

use super::Analyzer;
use crate::ast::{Form, Seq};
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::{AnalyzerError, AnalyzerResult};

impl Analyzer {
    /// Analyzed arguments of `list` after the head, requiring exactly `count`.
    fn exact_interop_args(
        &self,
        list: &Seq,
        env: &NodeEnvironment,
        count: usize,
        message: &str,
    ) -> AnalyzerResult<Vec<Node>> {
        if list.len() != count + 1 {
            return Err(AnalyzerError::at_span(message, list.span()));
        }
        self.analyze_all(list.iter().skip(1), &Self::argument_env(env))
    }

    pub(super) fn analyze_host_new(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        if list.len() < 2 {
            return Err(AnalyzerError::at_span(
                "At least one argument is required for 'php/new",
                list.span(),
            ));
        }
        let arg_env = Self::argument_env(env);
        let class = self.analyze(&list.items()[1], &arg_env)?;
        let args = self.analyze_all(list.iter().skip(2), &arg_env)?;
        Ok(Node::HostNew {
            env: env.clone(),
            class: Box::new(class),
            args,
            span: list.span().cloned(),
        })
    }

    /// `(php/-> obj (method args...))`, `(php/-> obj property)` and the
    /// static `php/::` variants.
    pub(super) fn analyze_host_member(
        &self,
        list: &Seq,
        env: &NodeEnvironment,
        is_static: bool,
    ) -> AnalyzerResult<Node> {
        let form_name = if is_static { "php/::" } else { "php/->" };
        if list.len() != 3 {
            return Err(AnalyzerError::at_span(
                format!("Exactly two arguments are expected for '{}", form_name),
                list.span(),
            ));
        }
        let arg_env = Self::argument_env(env);
        let target = Box::new(self.analyze(&list.items()[1], &arg_env)?);
        let member = &list.items()[2];

        match member {
            Form::Symbol(property) if !property.is_qualified() => Ok(Node::HostPropertyAccess {
                env: env.clone(),
                target,
                is_static,
                property: property.clone(),
                span: list.span().cloned(),
            }),
            Form::List(call) => match call.first() {
                Some(Form::Symbol(method)) if !method.is_qualified() => Ok(Node::HostMethodCall {
                    env: env.clone(),
                    target,
                    is_static,
                    method: method.clone(),
                    args: self.analyze_all(call.iter().skip(1), &arg_env)?,
                    span: list.span().cloned(),
                }),
                _ => Err(AnalyzerError::at(
                    format!("The method call of '{} must start with a Symbol", form_name),
                    member,
                )),
            },
            other => Err(AnalyzerError::at(
                format!("Second argument of '{} must be a List or a Symbol", form_name),
                other,
            )),
        }
    }

    /// `(php/oset (php/-> obj prop) value)`
    pub(super) fn analyze_host_property_set(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let message = "Exactly two arguments are required for 'php/oset";
        let [target, value] = self.fixed_interop_args(list, env, message)?;
        if !matches!(target, Node::HostPropertyAccess { .. }) {
            return Err(AnalyzerError::at_span(
                "First argument of 'php/oset must be a property access",
                target.span().or(list.span()),
            ));
        }
        Ok(Node::HostPropertySet {
            env: env.clone(),
            target: Box::new(target),
            value: Box::new(value),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_host_array_get(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let message = "Exactly two arguments are required for 'php/aget";
        let [array, index] = self.fixed_interop_args(list, env, message)?;
        Ok(Node::HostArrayGet {
            env: env.clone(),
            array: Box::new(array),
            index: Box::new(index),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_host_array_set(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let message = "Exactly three arguments are required for 'php/aset";
        let [array, index, value] = self.fixed_interop_args(list, env, message)?;
        Ok(Node::HostArraySet {
            env: env.clone(),
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_host_array_push(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let message = "Exactly two arguments are required for 'php/apush";
        let [array, value] = self.fixed_interop_args(list, env, message)?;
        Ok(Node::HostArrayPush {
            env: env.clone(),
            array: Box::new(array),
            value: Box::new(value),
            span: list.span().cloned(),
        })
    }

    pub(super) fn analyze_host_array_unset(&self, list: &Seq, env: &NodeEnvironment) -> AnalyzerResult<Node> {
        let message = "Exactly two arguments are required for 'php/aunset";
        let [array, index] = self.fixed_interop_args(list, env, message)?;
        Ok(Node::HostArrayUnset {
            env: env.clone(),
            array: Box::new(array),
            index: Box::new(index),
            span: list.span().cloned(),
        })
    }

    fn fixed_interop_args<const N: usize>(
        &self,
        list: &Seq,
        env: &NodeEnvironment,
        message: &str,
    ) -> AnalyzerResult<[Node; N]> {
        self.exact_interop_args(list, env, N, message)?
            .try_into()
            .map_err(|_| AnalyzerError::at_span(message, list.span()))
    }
}
