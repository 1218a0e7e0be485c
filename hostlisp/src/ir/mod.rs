// IR module organization
pub mod converter;
pub mod core;
pub mod environment;
pub mod error;

pub use converter::{Analyzer, SpecialForm};
pub use environment::{Context, NodeEnvironment, RecurFrame};
pub use error::{AnalyzerError, AnalyzerResult};
