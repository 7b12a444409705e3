//! `{{ variable }}` rendering against bundle items
//!
//! Templates are Handlebars templates rendered in strict mode: every
//! expression must resolve to a bundle item. Output is not HTML-escaped.
//! Maps (quest data and headers) are rendered key by key and value by value,
//! so substituted text never has to be escaped into a serialized document.
//!
//! Dots in an expression are path separators; a bundle key that itself
//! contains a dot is referenced as `{{[auth.token]}}`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use handlebars::{no_escape, Handlebars, RenderError, RenderErrorReason};
use regex::Regex;

use super::error::QuestError;

fn registry() -> &'static Handlebars<'static> {
    static REGISTRY: OnceLock<Handlebars<'static>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(no_escape);
        registry
    })
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("placeholder regex")
    })
}

/// Render a template against the bundle items.
///
/// Fails with [`QuestError::UndefinedVariable`] on the first expression
/// whose name is missing from `vars`, and with
/// [`QuestError::InvalidTemplate`] when the template does not parse.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> Result<String, QuestError> {
    registry()
        .render_template(template, vars)
        .map_err(|err| render_error(template, vars, err))
}

fn render_error(template: &str, vars: &BTreeMap<String, String>, err: RenderError) -> QuestError {
    match err.reason() {
        RenderErrorReason::MissingVariable(path) => {
            let name = path.clone().or_else(|| {
                variables(template)
                    .into_iter()
                    .find(|name| !vars.contains_key(*name))
                    .map(str::to_string)
            });
            QuestError::UndefinedVariable {
                name: name.unwrap_or_default(),
            }
        }
        reason => QuestError::InvalidTemplate {
            reason: reason.to_string(),
        },
    }
}

/// Render every key and value of a map.
///
/// `field` names the map in errors (e.g. "headers"). Two keys rendering to
/// the same string are reported as malformed output rather than silently
/// dropping one of them.
pub fn render_map(
    field: &str,
    map: &BTreeMap<String, String>,
    vars: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, QuestError> {
    let mut rendered = BTreeMap::new();
    for (key, value) in map {
        let key = render(key, vars)?;
        let value = render(value, vars)?;
        if rendered.contains_key(&key) {
            return Err(QuestError::malformed(
                field,
                format!("key `{key}` appears more than once after rendering"),
            ));
        }
        rendered.insert(key, value);
    }
    Ok(rendered)
}

/// Variable names referenced by plain `{{ name }}` expressions, in order of
/// first appearance
pub fn variables(template: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        if let Some(name) = caps.get(1).map(|m| m.as_str()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
