// hostlisp analyzer library
// Turns reader forms into the typed AST consumed by the PHP emitter
pub mod ast;
pub mod compiler;
pub mod config;
pub mod error_reporting;
pub mod ir;
pub mod registry;

// Re-export the form model and the analyzer entry points.
pub use ast::{Form, FormMap, Keyword, MapForm, Seq, Symbol, SymbolGenerator};
pub use compiler::{FnMacroHost, HostCallError, MacroContext, MacroHost, NoMacroHost};
pub use config::AnalyzerConfig;
pub use error_reporting::{SourceLocation, SourceSpan};
pub use ir::core::*;
pub use ir::{Analyzer, AnalyzerError, AnalyzerResult, Context, NodeEnvironment, RecurFrame};
pub use registry::{Definition, NamespaceRegistry};
