pub mod destructure;
pub mod expander;

pub use destructure::Destructurer;
pub use expander::{
    enrich_location, ExpansionKind, FnMacroHost, HostCallError, HostCallable, MacroContext,
    MacroHost, NoMacroHost,
};
