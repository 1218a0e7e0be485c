use super::{Analyzer, HOST_NAMESPACE};
use crate::ast::{Seq, Symbol};
use crate::ir::core::Node;
use crate::ir::environment::NodeEnvironment;
use crate::ir::error::AnalyzerResult;

/// Heads with compiler-known semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Def,
    Fn,
    Let,
    Loop,
    Do,
    If,
    Recur,
    Quote,
    Apply,
    Try,
    Throw,
    SetVar,
    Foreach,
    Ns,
    InNs,
    DefStruct,
    DefInterface,
    DefException,
    HostNew,
    HostObjectCall,
    HostStaticCall,
    HostPropertySet,
    HostArrayGet,
    HostArraySet,
    HostArrayPush,
    HostArrayUnset,
}

impl SpecialForm {
    pub fn from_symbol(sym: &Symbol) -> Option<SpecialForm> {
        match sym.namespace() {
            None => Self::from_plain_name(sym.name()),
            Some(HOST_NAMESPACE) => Self::from_host_name(sym.name()),
            Some(_) => None,
        }
    }

    fn from_plain_name(name: &str) -> Option<SpecialForm> {
        Some(match name {
            "def" => SpecialForm::Def,
            "fn" => SpecialForm::Fn,
            "let" => SpecialForm::Let,
            "loop" => SpecialForm::Loop,
            "do" => SpecialForm::Do,
            "if" => SpecialForm::If,
            "recur" => SpecialForm::Recur,
            "quote" => SpecialForm::Quote,
            "apply" => SpecialForm::Apply,
            "try" => SpecialForm::Try,
            "throw" => SpecialForm::Throw,
            "set!" => SpecialForm::SetVar,
            "foreach" => SpecialForm::Foreach,
            "ns" => SpecialForm::Ns,
            "in-ns" => SpecialForm::InNs,
            "defstruct*" => SpecialForm::DefStruct,
            "definterface*" => SpecialForm::DefInterface,
            "defexception*" => SpecialForm::DefException,
            _ => return None,
        })
    }

    fn from_host_name(name: &str) -> Option<SpecialForm> {
        Some(match name {
            "new" => SpecialForm::HostNew,
            "->" => SpecialForm::HostObjectCall,
            "::" => SpecialForm::HostStaticCall,
            "oset" => SpecialForm::HostPropertySet,
            "aget" => SpecialForm::HostArrayGet,
            "aset" => SpecialForm::HostArraySet,
            "apush" => SpecialForm::HostArrayPush,
            "aunset" => SpecialForm::HostArrayUnset,
            _ => return None,
        })
    }

    /// Surface name as used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Def => "def",
            SpecialForm::Fn => "fn",
            SpecialForm::Let => "let",
            SpecialForm::Loop => "loop",
            SpecialForm::Do => "do",
            SpecialForm::If => "if",
            SpecialForm::Recur => "recur",
            SpecialForm::Quote => "quote",
            SpecialForm::Apply => "apply",
            SpecialForm::Try => "try",
            SpecialForm::Throw => "throw",
            SpecialForm::SetVar => "set!",
            SpecialForm::Foreach => "foreach",
            SpecialForm::Ns => "ns",
            SpecialForm::InNs => "in-ns",
            SpecialForm::DefStruct => "defstruct*",
            SpecialForm::DefInterface => "definterface*",
            SpecialForm::DefException => "defexception*",
            SpecialForm::HostNew => "php/new",
            SpecialForm::HostObjectCall => "php/->",
            SpecialForm::HostStaticCall => "php/::",
            SpecialForm::HostPropertySet => "php/oset",
            SpecialForm::HostArrayGet => "php/aget",
            SpecialForm::HostArraySet => "php/aset",
            SpecialForm::HostArrayPush => "php/apush",
            SpecialForm::HostArrayUnset => "php/aunset",
        }
    }
}

impl Analyzer {
    pub(super) fn analyze_special_form(
        &self,
        form: SpecialForm,
        list: &Seq,
        env: &NodeEnvironment,
    ) -> AnalyzerResult<Node> {
        match form {
            SpecialForm::Def => self.analyze_def(list, env),
            SpecialForm::Fn => self.analyze_fn(list, env),
            SpecialForm::Let => self.analyze_let(list, env),
            SpecialForm::Loop => self.analyze_loop(list, env),
            SpecialForm::Do => self.analyze_do(list, env),
            SpecialForm::If => self.analyze_if(list, env),
            SpecialForm::Recur => self.analyze_recur(list, env),
            SpecialForm::Quote => self.analyze_quote(list, env),
            SpecialForm::Apply => self.analyze_apply(list, env),
            SpecialForm::Try => self.analyze_try(list, env),
            SpecialForm::Throw => self.analyze_throw(list, env),
            SpecialForm::SetVar => self.analyze_set_var(list, env),
            SpecialForm::Foreach => self.analyze_foreach(list, env),
            SpecialForm::Ns => self.analyze_ns(list, env),
            SpecialForm::InNs => self.analyze_in_ns(list, env),
            SpecialForm::DefStruct => self.analyze_def_struct(list, env),
            SpecialForm::DefInterface => self.analyze_def_interface(list, env),
            SpecialForm::DefException => self.analyze_def_exception(list, env),
            SpecialForm::HostNew => self.analyze_host_new(list, env),
            SpecialForm::HostObjectCall => self.analyze_host_member(list, env, false),
            SpecialForm::HostStaticCall => self.analyze_host_member(list, env, true),
            SpecialForm::HostPropertySet => self.analyze_host_property_set(list, env),
            SpecialForm::HostArrayGet => self.analyze_host_array_get(list, env),
            SpecialForm::HostArraySet => self.analyze_host_array_set(list, env),
            SpecialForm::HostArrayPush => self.analyze_host_array_push(list, env),
            SpecialForm::HostArrayUnset => self.analyze_host_array_unset(list, env),
        }
    }
}
