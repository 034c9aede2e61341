//! Lexical source transforms.
//!
//! Nothing here parses JavaScript. Type syntax is removed and imports are
//! neutralized by regular-expression substitution, so the output is only as
//! good as the patterns. Relative imports are commented out because the
//! bundle is a plain concatenation: correctness depends on file order alone.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTERFACE_BLOCK: Regex =
        Regex::new(r"(?:\bexport\s+)?\binterface\s+\w+\s*\{[^}]*\}").unwrap();
    static ref TYPE_ALIAS_BLOCK: Regex =
        Regex::new(r"(?:\bexport\s+)?\btype\s+\w+\s*=\s*\{[^}]*\};?").unwrap();
    static ref TYPE_ANNOTATION: Regex = Regex::new(r":\s*\w+(<[^>]+>)?(\[\])?").unwrap();
    static ref TYPE_CAST: Regex = Regex::new(r"\bas\s+\w+").unwrap();
    static ref CALL_GENERICS: Regex = Regex::new(r"<[^>]+>(\()").unwrap();
    static ref REACT_IMPORT: Regex =
        Regex::new(r#"import\s+React(,\s*\{[^}]*\})?\s+from\s+['"]react['"];?"#).unwrap();
    static ref REACT_NAMED_IMPORT: Regex =
        Regex::new(r#"import\s+\{[^}]*\}\s+from\s+['"]react['"];?"#).unwrap();
    static ref REACT_DOM_IMPORT: Regex =
        Regex::new(r#"import\s+ReactDOM\s+from\s+['"]react-dom(/client)?['"];?"#).unwrap();
    static ref RELATIVE_IMPORT: Regex =
        Regex::new(r#"import\s+([^'";\n]+?)\s+from\s+['"](\.{1,2}/[^'"]+)['"];?"#).unwrap();
    static ref RELATIVE_SIDE_EFFECT_IMPORT: Regex =
        Regex::new(r#"import\s+['"](\.{1,2}/[^'"]+)['"];?"#).unwrap();
}

/// Remove TypeScript-only syntax: interface and object type blocks, trailing
/// annotations, `as` casts and generic arguments in front of calls.
pub fn strip_types(source: &str) -> String {
    let result = INTERFACE_BLOCK.replace_all(source, "");
    let result = TYPE_ALIAS_BLOCK.replace_all(&result, "");
    let result = TYPE_ANNOTATION.replace_all(&result, "");
    let result = TYPE_CAST.replace_all(&result, "");
    let result = CALL_GENERICS.replace_all(&result, "${1}");
    result.into_owned()
}

/// Replace runtime imports with comments (the runtime comes from the CDN
/// preamble) and comment out project-relative imports.
pub fn neutralize_imports(source: &str) -> String {
    let result = REACT_IMPORT.replace_all(source, "// React imported from CDN");
    let result = REACT_NAMED_IMPORT.replace_all(&result, "// React imported from CDN");
    let result = REACT_DOM_IMPORT.replace_all(&result, "// ReactDOM imported from CDN");
    let result = RELATIVE_IMPORT.replace_all(&result, "// import ${1} from ${2}");
    let result = RELATIVE_SIDE_EFFECT_IMPORT.replace_all(&result, "// import ${1}");
    result.into_owned()
}

/// Full per-file pipeline
pub fn transform_script(source: &str) -> String {
    neutralize_imports(&strip_types(source))
}
