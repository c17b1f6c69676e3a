//! Request filters
//!
//! A filter is evaluated against the query's current params right before a
//! request. `None` means "not ready yet": the load is skipped without touching
//! the query's state.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::Params;

/// Computed filter; return `None` to skip the load
pub type FilterFn = Arc<dyn Fn(&Params) -> Option<Value> + Send + Sync>;

/// `{{params.key}}` placeholder
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*params\.([A-Za-z0-9_\-]+)\s*\}\}").expect("valid regex"));

/// Placeholder that makes up the whole string (value keeps its JSON type)
static WHOLE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*params\.([A-Za-z0-9_\-]+)\s*\}\}$").expect("valid regex"));

#[derive(Clone)]
pub enum Filter {
    /// Fixed filter value
    Static(Value),
    /// Function of the current params
    Computed(FilterFn),
    /// JSON whose string leaves may reference `{{params.key}}`
    Template(Value),
}

impl Filter {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Params) -> Option<Value> + Send + Sync + 'static,
    {
        Filter::Computed(Arc::new(f))
    }

    /// Evaluate against `params`; `None` (or a literal `false`) skips the load
    pub fn evaluate(&self, params: &Params) -> Option<Value> {
        let value = match self {
            Filter::Static(value) => Some(value.clone()),
            Filter::Computed(f) => f(params),
            Filter::Template(template) => resolve_template(template, params),
        }?;
        if value == Value::Bool(false) {
            None
        } else {
            Some(value)
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Static(Value::Null)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Filter::Computed(_) => f.write_str("Computed(<fn>)"),
            Filter::Template(value) => f.debug_tuple("Template").field(value).finish(),
        }
    }
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        Filter::Static(value)
    }
}

/// Substitute placeholders; any missing or null param yields `None`
fn resolve_template(template: &Value, params: &Params) -> Option<Value> {
    match template {
        Value::String(s) => resolve_string(s, params),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_template(item, params))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve_template(value, params)?);
            }
            Some(Value::Object(out))
        }
        other => Some(other.clone()),
    }
}

fn resolve_string(s: &str, params: &Params) -> Option<Value> {
    if let Some(caps) = WHOLE_PLACEHOLDER.captures(s) {
        return lookup(params, &caps[1]).cloned();
    }
    if !PLACEHOLDER.is_match(s) {
        return Some(Value::String(s.to_string()));
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(s) {
        let whole = caps.get(0)?;
        out.push_str(&s[last..whole.start()]);
        match lookup(params, &caps[1])? {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Some(Value::String(out))
}

fn lookup<'a>(params: &'a Params, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn static_filter_passes_through() {
        let filter = Filter::Static(json!({"limit": 10}));
        assert_eq!(filter.evaluate(&Params::new()), Some(json!({"limit": 10})));
    }

    #[test]
    fn static_false_skips() {
        assert_eq!(Filter::Static(json!(false)).evaluate(&Params::new()), None);
    }

    #[test]
    fn computed_filter_sees_params() {
        let filter = Filter::computed(|p| {
            let user = p.get("user")?;
            Some(json!({"where": {"userId": user}}))
        });

        assert_eq!(filter.evaluate(&Params::new()), None);
        assert_eq!(
            filter.evaluate(&params(json!({"user": 7}))),
            Some(json!({"where": {"userId": 7}}))
        );
    }

    #[test]
    fn computed_false_skips() {
        let filter = Filter::computed(|_| Some(json!(false)));
        assert_eq!(filter.evaluate(&Params::new()), None);
    }

    #[test]
    fn template_keeps_value_types() {
        let filter = Filter::Template(json!({"limit": 10, "skip": "{{params.skip}}"}));
        assert_eq!(
            filter.evaluate(&params(json!({"skip": 20}))),
            Some(json!({"limit": 10, "skip": 20}))
        );
    }

    #[test]
    fn template_interpolates_inside_strings() {
        let filter = Filter::Template(json!({"where": {"name": {"like": "{{ params.q }}%"}}}));
        assert_eq!(
            filter.evaluate(&params(json!({"q": "ann"}))),
            Some(json!({"where": {"name": {"like": "ann%"}}}))
        );
    }

    #[test]
    fn template_missing_param_skips() {
        let filter = Filter::Template(json!({"where": {"userId": "{{params.user}}"}}));
        assert_eq!(filter.evaluate(&Params::new()), None);
        assert_eq!(filter.evaluate(&params(json!({"user": null}))), None);
    }

    #[test]
    fn template_without_placeholders_is_static() {
        let filter = Filter::Template(json!({"order": "name ASC", "tags": ["a", "b"]}));
        assert_eq!(
            filter.evaluate(&Params::new()),
            Some(json!({"order": "name ASC", "tags": ["a", "b"]}))
        );
    }
}
