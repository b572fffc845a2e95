//! Template interpolation for collection definitions
//!
//! Handles `{{ variable }}` interpolation in request paths and query values.
//! The dependency key, page index and page size are available as `key`,
//! `page` and `page_size`; structured keys support nested access like
//! `{{ key.user_id }}`. Extra values live under `vars`.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Root names a template may reference
pub const KNOWN_ROOTS: [&str; 4] = ["key", "page", "page_size", "vars"];

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Dependency key of the collection being paged
    pub key: Value,
    /// 1-based page index
    pub page: Value,
    /// Requested page size
    pub page_size: Value,
    /// Additional context variables
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context for one page request
    pub fn for_page(key: impl Into<Value>, page: u32, page_size: u32) -> Self {
        Self {
            key: key.into(),
            page: Value::from(page),
            page_size: Value::from(page_size),
            vars: Value::Null,
        }
    }

    /// Set additional variables
    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g., "key.user_id")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let root = match parts[0] {
            "key" => &self.key,
            "page" => &self.page,
            "page_size" => &self.page_size,
            "vars" => &self.vars,
            // Bare names fall back to vars
            _ => return get_nested_value(&self.vars, &parts),
        };

        if parts.len() == 1 {
            (!root.is_null()).then_some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    render_with(template, ctx, value_to_string)
}

/// Render a URL path template, percent-encoding every substituted value
///
/// A search query such as `rust & go` must stay inside its path segment.
pub fn render_path(template: &str, ctx: &TemplateContext) -> Result<String> {
    render_with(template, ctx, |value| encode_segment(&value_to_string(value)))
}

fn render_with(
    template: &str,
    ctx: &TemplateContext,
    to_string: impl Fn(&Value) -> String,
) -> Result<String> {
    let mut errors = Vec::new();

    // Single pass, so substituted text is never scanned again
    let result = TEMPLATE_REGEX.replace_all(template, |cap: &Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) => to_string(value),
            None => {
                errors.push(var_path.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For complex types, use JSON serialization
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Percent-encode a value for use inside a single path segment
fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_substitution() {
        let ctx = TemplateContext::for_page("design", 2, 10);

        let result = render("/categories/{{ key }}/posts", &ctx).unwrap();
        assert_eq!(result, "/categories/design/posts");
    }

    #[test]
    fn test_page_variables() {
        let ctx = TemplateContext::for_page("design", 3, 25);

        let result = render("offset={{ page }}&limit={{ page_size }}", &ctx).unwrap();
        assert_eq!(result, "offset=3&limit=25");
    }

    #[test]
    fn test_nested_key() {
        let ctx = TemplateContext::for_page(json!({"user_id": "u-42", "kind": "followers"}), 1, 10);

        let result = render("/users/{{ key.user_id }}/{{ key.kind }}", &ctx).unwrap();
        assert_eq!(result, "/users/u-42/followers");
    }

    #[test]
    fn test_vars_context() {
        let mut ctx = TemplateContext::for_page("q", 1, 10);
        ctx.set_vars(json!({"locale": "en"}));

        assert_eq!(render("{{ vars.locale }}", &ctx).unwrap(), "en");
        assert_eq!(render("{{ locale }}", &ctx).unwrap(), "en");
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = TemplateContext::new();
        let result = render("{{ vars.missing }}", &ctx);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("vars.missing"));

        let result = render("/search/{{ key }}", &ctx);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_path_encodes_values() {
        let ctx = TemplateContext::for_page("rust & go/2", 1, 10);

        let result = render_path("/search/{{ key }}", &ctx).unwrap();
        assert_eq!(result, "/search/rust%20%26%20go%2F2");
    }

    #[test]
    fn test_no_templates() {
        let ctx = TemplateContext::new();
        assert_eq!(render("/posts", &ctx).unwrap(), "/posts");
    }

    #[test]
    fn test_render_does_not_expand_substituted_text() {
        let mut ctx = TemplateContext::for_page("{{ vars.secret }}", 1, 10);
        ctx.set_vars(json!({"secret": "s3cr3t"}));

        let result = render("{{ key }}/{{ vars.secret }}", &ctx).unwrap();
        assert_eq!(result, "{{ vars.secret }}/s3cr3t");
    }

    #[test]
    fn test_extract_variables() {
        let vars = extract_variables("/users/{{ key.user_id }}?p={{ page }}");
        assert_eq!(vars, vec!["key.user_id", "page"]);
    }

    #[test]
    fn test_whitespace_in_template() {
        let ctx = TemplateContext::for_page("news", 1, 10);

        assert_eq!(render("{{key}}", &ctx).unwrap(), "news");
        assert_eq!(render("{{   key   }}", &ctx).unwrap(), "news");
    }
}
