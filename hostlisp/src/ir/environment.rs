//! Analysis environment threaded through every recursive analyzer call.
//!
//! A `NodeEnvironment` is an immutable snapshot: each `with_*` method returns
//! a new value and leaves the receiver untouched, so sibling branches of an
//! analysis never observe each other's bindings. The persistent `im`
//! collections make those copies cheap.

use crate::ast::Symbol;
use im::{OrdMap, OrdSet, Vector};
use std::cell::Cell;
use std::rc::Rc;

/// How the value of the form being analyzed is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// The value is needed by an enclosing expression.
    Expression,
    /// The value is discarded; only side effects matter.
    Statement,
    /// The value is the result of the enclosing function or block.
    Return,
}

/// Rebindable parameters of an enclosing `fn` or `loop`.
///
/// The activity flag is the only mutable part of an analyzed tree. It flips
/// the first time a matching `recur` is analyzed and tells the emitter to
/// lower the body into an explicit loop.
#[derive(Debug)]
pub struct RecurFrame {
    params: Vec<Symbol>,
    active: Cell<bool>,
}

impl RecurFrame {
    pub fn new(params: Vec<Symbol>) -> Rc<Self> {
        Rc::new(RecurFrame {
            params,
            active: Cell::new(false),
        })
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn set_active(&self) {
        self.active.set(true);
    }
}

#[derive(Debug, Clone)]
pub struct NodeEnvironment {
    context: Context,
    locals: OrdSet<Symbol>,
    shadowed: OrdMap<Symbol, Symbol>,
    /// `None` entries block recursion into every frame below them.
    recur_frames: Vector<Option<Rc<RecurFrame>>>,
    bound_to: String,
    def_allowed: bool,
}

impl Default for NodeEnvironment {
    fn default() -> Self {
        NodeEnvironment::empty()
    }
}

impl NodeEnvironment {
    /// Top-level environment: statement context, no locals, `def` allowed.
    pub fn empty() -> Self {
        NodeEnvironment {
            context: Context::Statement,
            locals: OrdSet::new(),
            shadowed: OrdMap::new(),
            recur_frames: Vector::new(),
            bound_to: String::new(),
            def_allowed: true,
        }
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn locals(&self) -> &OrdSet<Symbol> {
        &self.locals
    }

    pub fn is_local(&self, sym: &Symbol) -> bool {
        !sym.is_qualified() && self.locals.contains(sym)
    }

    pub fn shadowed(&self, sym: &Symbol) -> Option<&Symbol> {
        self.shadowed.get(sym)
    }

    /// Innermost recursion frame, unless it is blocked.
    pub fn current_recur_frame(&self) -> Option<&Rc<RecurFrame>> {
        self.recur_frames.back().and_then(Option::as_ref)
    }

    pub fn bound_to(&self) -> &str {
        &self.bound_to
    }

    pub fn is_def_allowed(&self) -> bool {
        self.def_allowed
    }

    // --- Derived environments ---

    pub fn with_context(&self, context: Context) -> Self {
        NodeEnvironment {
            context,
            ..self.clone()
        }
    }

    pub fn with_expression_context(&self) -> Self {
        self.with_context(Context::Expression)
    }

    pub fn with_statement_context(&self) -> Self {
        self.with_context(Context::Statement)
    }

    pub fn with_return_context(&self) -> Self {
        self.with_context(Context::Return)
    }

    /// Blocks that render as a self-contained function when used as an
    /// expression produce their value in return position.
    pub fn with_return_context_if_expression(&self) -> Self {
        match self.context {
            Context::Expression => self.with_return_context(),
            _ => self.clone(),
        }
    }

    pub fn with_merged_locals<'a>(&self, names: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut locals = self.locals.clone();
        for name in names {
            locals.insert(name.clone());
        }
        NodeEnvironment {
            locals,
            ..self.clone()
        }
    }

    pub fn with_shadowed_local(&self, original: &Symbol, shadow: &Symbol) -> Self {
        NodeEnvironment {
            shadowed: self.shadowed.update(original.clone(), shadow.clone()),
            ..self.clone()
        }
    }

    /// Drops shadow names so freshly bound parameters render under their own name.
    pub fn with_unshadowed_locals<'a>(&self, names: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut shadowed = self.shadowed.clone();
        for name in names {
            shadowed.remove(name);
        }
        NodeEnvironment {
            shadowed,
            ..self.clone()
        }
    }

    pub fn with_added_recur_frame(&self, frame: Rc<RecurFrame>) -> Self {
        let mut recur_frames = self.recur_frames.clone();
        recur_frames.push_back(Some(frame));
        NodeEnvironment {
            recur_frames,
            ..self.clone()
        }
    }

    pub fn with_disallow_recur_frame(&self) -> Self {
        let mut recur_frames = self.recur_frames.clone();
        recur_frames.push_back(None);
        NodeEnvironment {
            recur_frames,
            ..self.clone()
        }
    }

    pub fn with_bound_to(&self, label: impl Into<String>) -> Self {
        NodeEnvironment {
            bound_to: label.into(),
            ..self.clone()
        }
    }

    pub fn with_def_allowed(&self, allowed: bool) -> Self {
        NodeEnvironment {
            def_allowed: allowed,
            ..self.clone()
        }
    }
}
