//! Bare call syntax: `{{id "widgets" 0}}` and `{{var "owner"}}`

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

fn bare_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*(id|var)((?:\s+(?:"[^"]*"|-?[0-9]+))+)\s*\}\}"#).expect("valid regex")
    })
}

fn argument_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"]*"|-?[0-9]+"#).expect("valid regex"))
}

/// Rewrite bare calls into Jinja call syntax.
///
/// Expressions already written as `{{ id("widgets", 0) }}` pass through
/// untouched.
pub fn rewrite_bare_calls(expression: &str) -> Cow<'_, str> {
    bare_call_regex().replace_all(expression, |caps: &regex::Captures<'_>| {
        let args = argument_regex()
            .find_iter(&caps[2])
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{{ {}({}) }}}}", &caps[1], args)
    })
}
