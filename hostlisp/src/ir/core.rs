// Analyzed syntax tree handed to the emitter
//
// Every node owns its children, the environment snapshot active when it was
// created and the span of the form it came from.

use crate::ast::{Form, FormMap, Symbol};
use crate::error_reporting::SourceSpan;
use crate::ir::environment::{NodeEnvironment, RecurFrame};
use std::rc::Rc;

/// One `name init` pair of a `let` or `loop`.
#[derive(Debug, Clone)]
pub struct BindingNode {
    pub env: NodeEnvironment,
    pub symbol: Symbol,
    pub shadow: Symbol,
    pub init: Box<Node>,
    pub span: Option<SourceSpan>,
}

impl BindingNode {
    /// Identifier the emitter renders for the bound name.
    pub fn shadow(&self) -> &Symbol {
        &self.shadow
    }
}

#[derive(Debug, Clone)]
pub struct CatchNode {
    pub env: NodeEnvironment,
    /// Always a `HostClassName` node.
    pub exception_type: Box<Node>,
    pub symbol: Symbol,
    pub body: Box<Node>,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone)]
pub struct FnNode {
    pub env: NodeEnvironment,
    pub params: Vec<Symbol>,
    pub body: Box<Node>,
    /// Enclosing locals the body may capture (parent locals minus params).
    pub uses: Vec<Symbol>,
    pub is_variadic: bool,
    pub frame: Rc<RecurFrame>,
    pub span: Option<SourceSpan>,
}

impl FnNode {
    pub fn uses(&self) -> &[Symbol] {
        &self.uses
    }

    /// Capture list as rendered, i.e. with shadow names substituted.
    pub fn captured_names(&self) -> Vec<Symbol> {
        self.uses
            .iter()
            .map(|sym| self.env.shadowed(sym).unwrap_or(sym).clone())
            .collect()
    }

    /// True when a tail `recur` targets this function.
    pub fn recurs(&self) -> bool {
        self.frame.is_active()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethod {
    pub name: Symbol,
    pub params: Vec<Symbol>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StructMethod {
    pub name: Symbol,
    pub function: FnNode,
}

/// Methods a struct provides for one interface.
#[derive(Debug, Clone)]
pub struct StructInterfaceImpl {
    /// Absolute name of the implemented interface.
    pub interface: String,
    pub methods: Vec<StructMethod>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Literal {
        env: NodeEnvironment,
        value: Form,
        span: Option<SourceSpan>,
    },
    Quote {
        env: NodeEnvironment,
        value: Form,
        span: Option<SourceSpan>,
    },
    Vector {
        env: NodeEnvironment,
        elements: Vec<Node>,
        span: Option<SourceSpan>,
    },
    Map {
        env: NodeEnvironment,
        entries: Vec<(Node, Node)>,
        span: Option<SourceSpan>,
    },
    LocalVar {
        env: NodeEnvironment,
        name: Symbol,
        shadow: Option<Symbol>,
        span: Option<SourceSpan>,
    },
    GlobalVar {
        env: NodeEnvironment,
        namespace: String,
        name: Symbol,
        meta: FormMap,
        span: Option<SourceSpan>,
    },
    /// Native function or constant of the host platform (`php/strlen`).
    HostVar {
        env: NodeEnvironment,
        name: String,
        span: Option<SourceSpan>,
    },
    /// Fully qualified host class reference (`\Vendor\Library`).
    HostClassName {
        env: NodeEnvironment,
        name: String,
        span: Option<SourceSpan>,
    },
    Call {
        env: NodeEnvironment,
        callee: Box<Node>,
        args: Vec<Node>,
        span: Option<SourceSpan>,
    },
    Apply {
        env: NodeEnvironment,
        callee: Box<Node>,
        args: Vec<Node>,
        span: Option<SourceSpan>,
    },
    If {
        env: NodeEnvironment,
        test: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
        span: Option<SourceSpan>,
    },
    Do {
        env: NodeEnvironment,
        stmts: Vec<Node>,
        ret: Box<Node>,
        span: Option<SourceSpan>,
    },
    Let {
        env: NodeEnvironment,
        bindings: Vec<BindingNode>,
        body: Box<Node>,
        span: Option<SourceSpan>,
    },
    Loop {
        env: NodeEnvironment,
        bindings: Vec<BindingNode>,
        body: Box<Node>,
        frame: Rc<RecurFrame>,
        span: Option<SourceSpan>,
    },
    Fn(FnNode),
    Recur {
        env: NodeEnvironment,
        frame: Rc<RecurFrame>,
        args: Vec<Node>,
        span: Option<SourceSpan>,
    },
    Foreach {
        env: NodeEnvironment,
        value_symbol: Symbol,
        key_symbol: Option<Symbol>,
        coll: Box<Node>,
        body: Box<Node>,
        span: Option<SourceSpan>,
    },
    Try {
        env: NodeEnvironment,
        body: Box<Node>,
        catches: Vec<CatchNode>,
        finally: Option<Box<Node>>,
        span: Option<SourceSpan>,
    },
    Throw {
        env: NodeEnvironment,
        exception: Box<Node>,
        span: Option<SourceSpan>,
    },
    Def {
        env: NodeEnvironment,
        namespace: String,
        name: Symbol,
        /// Normalized metadata as registered.
        meta: FormMap,
        /// The same metadata analyzed as a map expression.
        meta_node: Box<Node>,
        init: Box<Node>,
        span: Option<SourceSpan>,
    },
    SetVar {
        env: NodeEnvironment,
        /// Always a `GlobalVar` node.
        target: Box<Node>,
        value: Box<Node>,
        span: Option<SourceSpan>,
    },
    DefStruct {
        env: NodeEnvironment,
        namespace: String,
        name: Symbol,
        fields: Vec<Symbol>,
        interfaces: Vec<StructInterfaceImpl>,
        span: Option<SourceSpan>,
    },
    DefInterface {
        env: NodeEnvironment,
        namespace: String,
        name: Symbol,
        methods: Vec<InterfaceMethod>,
        span: Option<SourceSpan>,
    },
    DefException {
        env: NodeEnvironment,
        namespace: String,
        name: Symbol,
        parent: String,
        span: Option<SourceSpan>,
    },
    Ns {
        env: NodeEnvironment,
        namespace: String,
        /// Namespaces to load first, in declaration order.
        requires: Vec<Symbol>,
        require_files: Vec<String>,
        span: Option<SourceSpan>,
    },
    InNs {
        env: NodeEnvironment,
        namespace: String,
        span: Option<SourceSpan>,
    },
    HostNew {
        env: NodeEnvironment,
        class: Box<Node>,
        args: Vec<Node>,
        span: Option<SourceSpan>,
    },
    HostMethodCall {
        env: NodeEnvironment,
        target: Box<Node>,
        is_static: bool,
        method: Symbol,
        args: Vec<Node>,
        span: Option<SourceSpan>,
    },
    HostPropertyAccess {
        env: NodeEnvironment,
        target: Box<Node>,
        is_static: bool,
        property: Symbol,
        span: Option<SourceSpan>,
    },
    HostPropertySet {
        env: NodeEnvironment,
        /// Always a `HostPropertyAccess` node.
        target: Box<Node>,
        value: Box<Node>,
        span: Option<SourceSpan>,
    },
    HostArrayGet {
        env: NodeEnvironment,
        array: Box<Node>,
        index: Box<Node>,
        span: Option<SourceSpan>,
    },
    HostArraySet {
        env: NodeEnvironment,
        array: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
        span: Option<SourceSpan>,
    },
    HostArrayPush {
        env: NodeEnvironment,
        array: Box<Node>,
        value: Box<Node>,
        span: Option<SourceSpan>,
    },
    HostArrayUnset {
        env: NodeEnvironment,
        array: Box<Node>,
        index: Box<Node>,
        span: Option<SourceSpan>,
    },
}

impl Node {
    pub fn env(&self) -> &NodeEnvironment {
        match self {
            Node::Fn(f) => &f.env,
            Node::Literal { env, .. }
            | Node::Quote { env, .. }
            | Node::Vector { env, .. }
            | Node::Map { env, .. }
            | Node::LocalVar { env, .. }
            | Node::GlobalVar { env, .. }
            | Node::HostVar { env, .. }
            | Node::HostClassName { env, .. }
            | Node::Call { env, .. }
            | Node::Apply { env, .. }
            | Node::If { env, .. }
            | Node::Do { env, .. }
            | Node::Let { env, .. }
            | Node::Loop { env, .. }
            | Node::Recur { env, .. }
            | Node::Foreach { env, .. }
            | Node::Try { env, .. }
            | Node::Throw { env, .. }
            | Node::Def { env, .. }
            | Node::SetVar { env, .. }
            | Node::DefStruct { env, .. }
            | Node::DefInterface { env, .. }
            | Node::DefException { env, .. }
            | Node::Ns { env, .. }
            | Node::InNs { env, .. }
            | Node::HostNew { env, .. }
            | Node::HostMethodCall { env, .. }
            | Node::HostPropertyAccess { env, .. }
            | Node::HostPropertySet { env, .. }
            | Node::HostArrayGet { env, .. }
            | Node::HostArraySet { env, .. }
            | Node::HostArrayPush { env, .. }
            | Node::HostArrayUnset { env, .. } => env,
        }
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        match self {
            Node::Fn(f) => f.span.as_ref(),
            Node::Literal { span, .. }
            | Node::Quote { span, .. }
            | Node::Vector { span, .. }
            | Node::Map { span, .. }
            | Node::LocalVar { span, .. }
            | Node::GlobalVar { span, .. }
            | Node::HostVar { span, .. }
            | Node::HostClassName { span, .. }
            | Node::Call { span, .. }
            | Node::Apply { span, .. }
            | Node::If { span, .. }
            | Node::Do { span, .. }
            | Node::Let { span, .. }
            | Node::Loop { span, .. }
            | Node::Recur { span, .. }
            | Node::Foreach { span, .. }
            | Node::Try { span, .. }
            | Node::Throw { span, .. }
            | Node::Def { span, .. }
            | Node::SetVar { span, .. }
            | Node::DefStruct { span, .. }
            | Node::DefInterface { span, .. }
            | Node::DefException { span, .. }
            | Node::Ns { span, .. }
            | Node::InNs { span, .. }
            | Node::HostNew { span, .. }
            | Node::HostMethodCall { span, .. }
            | Node::HostPropertyAccess { span, .. }
            | Node::HostPropertySet { span, .. }
            | Node::HostArrayGet { span, .. }
            | Node::HostArraySet { span, .. }
            | Node::HostArrayPush { span, .. }
            | Node::HostArrayUnset { span, .. } => span.as_ref(),
        }
    }

    /// Immediate sub-nodes in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Literal { .. }
            | Node::Quote { .. }
            | Node::LocalVar { .. }
            | Node::GlobalVar { .. }
            | Node::HostVar { .. }
            | Node::HostClassName { .. }
            | Node::DefInterface { .. }
            | Node::DefException { .. }
            | Node::Ns { .. }
            | Node::InNs { .. } => Vec::new(),
            Node::Vector { elements, .. } => elements.iter().collect(),
            Node::Map { entries, .. } => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            Node::Call { callee, args, .. } | Node::Apply { callee, args, .. } => {
                std::iter::once(callee.as_ref()).chain(args.iter()).collect()
            }
            Node::If {
                test,
                then_branch,
                else_branch,
                ..
            } => vec![test.as_ref(), then_branch.as_ref(), else_branch.as_ref()],
            Node::Do { stmts, ret, .. } => stmts.iter().chain(std::iter::once(ret.as_ref())).collect(),
            Node::Let { bindings, body, .. } | Node::Loop { bindings, body, .. } => bindings
                .iter()
                .map(|b| b.init.as_ref())
                .chain(std::iter::once(body.as_ref()))
                .collect(),
            Node::Fn(f) => vec![f.body.as_ref()],
            Node::Recur { args, .. } => args.iter().collect(),
            Node::Foreach { coll, body, .. } => vec![coll.as_ref(), body.as_ref()],
            Node::Try {
                body,
                catches,
                finally,
                ..
            } => std::iter::once(body.as_ref())
                .chain(catches.iter().map(|c| c.body.as_ref()))
                .chain(finally.as_deref())
                .collect(),
            Node::Throw { exception, .. } => vec![exception.as_ref()],
            Node::Def { meta_node, init, .. } => vec![meta_node.as_ref(), init.as_ref()],
            Node::SetVar { target, value, .. } | Node::HostPropertySet { target, value, .. } => {
                vec![target.as_ref(), value.as_ref()]
            }
            Node::DefStruct { interfaces, .. } => interfaces
                .iter()
                .flat_map(|i| i.methods.iter().map(|m| m.function.body.as_ref()))
                .collect(),
            Node::HostNew { class, args, .. } => {
                std::iter::once(class.as_ref()).chain(args.iter()).collect()
            }
            Node::HostMethodCall { target, args, .. } => {
                std::iter::once(target.as_ref()).chain(args.iter()).collect()
            }
            Node::HostPropertyAccess { target, .. } => vec![target.as_ref()],
            Node::HostArrayGet { array, index, .. } | Node::HostArrayUnset { array, index, .. } => {
                vec![array.as_ref(), index.as_ref()]
            }
            Node::HostArraySet {
                array,
                index,
                value,
                ..
            } => vec![array.as_ref(), index.as_ref(), value.as_ref()],
            Node::HostArrayPush { array, value, .. } => vec![array.as_ref(), value.as_ref()],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Literal { .. } => "literal",
            Node::Quote { .. } => "quote",
            Node::Vector { .. } => "vector",
            Node::Map { .. } => "map",
            Node::LocalVar { .. } => "local-var",
            Node::GlobalVar { .. } => "global-var",
            Node::HostVar { .. } => "host-var",
            Node::HostClassName { .. } => "host-class-name",
            Node::Call { .. } => "call",
            Node::Apply { .. } => "apply",
            Node::If { .. } => "if",
            Node::Do { .. } => "do",
            Node::Let { .. } => "let",
            Node::Loop { .. } => "loop",
            Node::Fn(_) => "fn",
            Node::Recur { .. } => "recur",
            Node::Foreach { .. } => "foreach",
            Node::Try { .. } => "try",
            Node::Throw { .. } => "throw",
            Node::Def { .. } => "def",
            Node::SetVar { .. } => "set!",
            Node::DefStruct { .. } => "defstruct",
            Node::DefInterface { .. } => "definterface",
            Node::DefException { .. } => "defexception",
            Node::Ns { .. } => "ns",
            Node::InNs { .. } => "in-ns",
            Node::HostNew { .. } => "host-new",
            Node::HostMethodCall { .. } => "host-method-call",
            Node::HostPropertyAccess { .. } => "host-property-access",
            Node::HostPropertySet { .. } => "host-property-set",
            Node::HostArrayGet { .. } => "host-array-get",
            Node::HostArraySet { .. } => "host-array-set",
            Node::HostArrayPush { .. } => "host-array-push",
            Node::HostArrayUnset { .. } => "host-array-unset",
        }
    }
}
