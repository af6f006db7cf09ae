//! RC-003: Template scanning and variable substitution.
//!
//! Prompt templates reference context variables as `{{name}}` (inner
//! whitespace is trimmed). Extraction and rendering share one scanning
//! rule: an unmatched `{{` ends the scan and is treated as literal text,
//! so a template the validator accepted never fails to render for a
//! reason other than an unbound variable.

use super::error::EngineError;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Extract every distinct `{{name}}` placeholder from a template.
/// Duplicates collapse; the result is unordered (callers only test
/// membership).
pub fn extract_variables(template: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut start = 0;

    while let Some(open) = template[start..].find("{{") {
        let open = start + open;
        let Some(close) = template[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close;
        let name = template[open + 2..close].trim();
        if !name.is_empty() {
            names.insert(name.to_string());
        }
        start = close + 2;
    }

    names
}

/// Whether a template contains a `{{` with no closing `}}` after it.
pub fn has_unclosed_placeholder(template: &str) -> bool {
    let mut start = 0;
    while let Some(open) = template[start..].find("{{") {
        let open = start + open;
        match template[open + 2..].find("}}") {
            Some(close) => start = open + 2 + close + 2,
            None => return true,
        }
    }
    false
}

/// Render a template by substituting every `{{name}}` occurrence with
/// `context[name]`. Fails with `UnresolvedVariable` on the first
/// reference with no bound value.
pub fn render_template(
    template: &str,
    context: &IndexMap<String, String>,
) -> Result<String, EngineError> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let Some(close) = result[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close + 2;
        let name = result[open + 2..close - 2].trim();

        let value = context
            .get(name)
            .ok_or_else(|| EngineError::UnresolvedVariable(name.to_string()))?;

        result.replace_range(open..close, value);
        start = open + value.len();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rc003_extract_basic() {
        let vars = extract_variables("Say hi to {{who}} from {{sender}}");
        assert_eq!(vars.len(), 2);
        assert!(vars.contains("who"));
        assert!(vars.contains("sender"));
    }

    #[test]
    fn test_rc003_extract_duplicates_collapse() {
        let vars = extract_variables("{{a}} and {{a}} and {{a}}");
        assert_eq!(vars.len(), 1);
        assert!(vars.contains("a"));
    }

    #[test]
    fn test_rc003_extract_trims_whitespace() {
        let vars = extract_variables("{{  padded  }} {{tight}}");
        assert_eq!(vars.len(), 2);
        assert!(vars.contains("padded"));
        assert!(vars.contains("tight"));
    }

    #[test]
    fn test_rc003_extract_none() {
        assert!(extract_variables("no placeholders here").is_empty());
        assert!(extract_variables("").is_empty());
    }

    #[test]
    fn test_rc003_extract_ignores_unclosed() {
        let vars = extract_variables("{{ok}} then {{dangling");
        assert_eq!(vars.len(), 1);
        assert!(vars.contains("ok"));
    }

    #[test]
    fn test_rc003_extract_ignores_empty_name() {
        assert!(extract_variables("{{}} {{   }}").is_empty());
    }

    #[test]
    fn test_rc003_unclosed_detection() {
        assert!(has_unclosed_placeholder("text {{dangling"));
        assert!(has_unclosed_placeholder("{{a}} {{b"));
        assert!(!has_unclosed_placeholder("{{a}} {{b}}"));
        assert!(!has_unclosed_placeholder("plain"));
    }

    #[test]
    fn test_rc003_render_basic() {
        let result = render_template("hello {{who}}!", &ctx(&[("who", "world")])).unwrap();
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_rc003_render_multiple() {
        let result =
            render_template("{{a}}-{{b}}-{{a}}", &ctx(&[("a", "X"), ("b", "Y")])).unwrap();
        assert_eq!(result, "X-Y-X");
    }

    #[test]
    fn test_rc003_render_whitespace_in_braces() {
        let result = render_template("hi {{ who }}", &ctx(&[("who", "there")])).unwrap();
        assert_eq!(result, "hi there");
    }

    #[test]
    fn test_rc003_render_unresolved() {
        let result = render_template("{{missing}}", &ctx(&[]));
        match result {
            Err(EngineError::UnresolvedVariable(name)) => assert_eq!(name, "missing"),
            other => panic!("expected UnresolvedVariable, got {:?}", other),
        }
    }

    #[test]
    fn test_rc003_render_unclosed_left_literal() {
        let result = render_template("{{a}} {{rest", &ctx(&[("a", "ok")])).unwrap();
        assert_eq!(result, "ok {{rest");
    }

    #[test]
    fn test_rc003_render_value_containing_braces() {
        // A substituted value is not re-scanned
        let result = render_template("{{a}}", &ctx(&[("a", "{{b}}")])).unwrap();
        assert_eq!(result, "{{b}}");
    }

    #[test]
    fn test_rc003_render_adjacent() {
        let result = render_template("{{a}}{{b}}", &ctx(&[("a", "1"), ("b", "2")])).unwrap();
        assert_eq!(result, "12");
    }
}
