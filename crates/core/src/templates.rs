//! `{{variable}}` substitution for SMS and email message templates.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("static pattern compiles"))
}

/// Replace every `{{name}}` placeholder with its value from `vars`.
/// Placeholders with no matching variable render as an empty string.
pub fn render_template(template: &str, vars: &BTreeMap<String, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).map(String::as_str).unwrap_or("")
        })
        .into_owned()
}
