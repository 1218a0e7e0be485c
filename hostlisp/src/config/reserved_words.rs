//! Words the target platform refuses as namespace segments.

use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref RESERVED_WORDS: HashSet<&'static str> = [
        "__halt_compiler", "abstract", "and", "array", "as", "bool", "break",
        "callable", "case", "catch", "class", "clone", "const", "continue",
        "declare", "default", "do", "echo", "else", "elseif", "empty",
        "enddeclare", "endfor", "endforeach", "endif", "endswitch", "endwhile",
        "enum", "eval", "exit", "extends", "false", "final", "finally", "float",
        "fn", "for", "foreach", "function", "global", "goto", "if",
        "implements", "include", "include_once", "instanceof", "insteadof",
        "int", "interface", "isset", "iterable", "list", "match", "mixed",
        "namespace", "never", "new", "null", "object", "or", "parent", "print",
        "private", "protected", "public", "readonly", "require",
        "require_once", "return", "self", "static", "string", "switch",
        "throw", "trait", "true", "try", "unset", "use", "var", "void",
        "while", "xor", "yield",
    ]
    .into_iter()
    .collect();
}

/// Case-insensitive membership test against the platform keyword list.
pub fn is_platform_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(word.to_ascii_lowercase().as_str())
}
