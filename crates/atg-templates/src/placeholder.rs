//! `{{name}}` placeholder scanning and rendering.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// A well-formed placeholder: `{{ name }}` with a snake_case name.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-z][a-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
});

/// Anything that still looks like placeholder syntax, well-formed or not.
static LEFTOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("leftover regex is valid"));

/// Placeholder names in order of first appearance.
pub fn names(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(body) {
        let name = &caps[1];
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Replace every placeholder for which `resolve` returns a value.
///
/// Placeholders `resolve` declines are left verbatim.
pub fn render<F>(body: &str, mut resolve: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(body, |caps: &Captures| {
            resolve(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Leftover placeholder syntax in rendered text, as written.
pub fn leftovers(text: &str) -> Vec<String> {
    LEFTOVER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Name inside a leftover token, if it is a well-formed placeholder.
pub fn leftover_name(token: &str) -> Option<String> {
    PLACEHOLDER
        .captures(token)
        .map(|caps| caps[1].to_string())
}
