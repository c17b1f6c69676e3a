//! Query normalization
//!
//! Runs once per mount. Every later load works off the resulting table and
//! never re-inspects the raw declarations.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;

use super::{Filter, Params, QuerySpec};
use crate::error::BindError;
use crate::transform::{Transform, TransformRegistry};

/// Runs of non-word characters
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid regex"));

/// A validated query with every default filled in
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    pub name: String,
    pub endpoint: String,
    pub filter: Filter,
    /// Declared default params (the runtime copy lives in the query state)
    pub params: Params,
    pub auto_load: bool,
    pub transform: Transform,
}

/// Strip exactly one leading and one trailing `/`
pub fn strip_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
    let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint);
    endpoint.to_string()
}

/// Default query name: non-word runs of the stripped endpoint become `-`
pub fn derive_name(stripped_endpoint: &str) -> String {
    NON_WORD.replace_all(stripped_endpoint, "-").into_owned()
}

/// Validate declarations and fill defaults, in declaration order
pub fn normalize(
    specs: Vec<QuerySpec>,
    registry: &TransformRegistry,
) -> Result<Vec<NormalizedQuery>, BindError> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(specs.len());

    for (index, spec) in specs.into_iter().enumerate() {
        let raw = spec
            .endpoint
            .filter(|e| !e.is_empty())
            .ok_or(BindError::MissingEndpoint { index })?;
        let endpoint = strip_endpoint(&raw);
        let name = spec.name.unwrap_or_else(|| derive_name(&endpoint));

        if !seen.insert(name.clone()) {
            return Err(BindError::DuplicateName { name });
        }

        let params = match spec.params {
            Value::Null => Params::new(),
            Value::Object(map) => map,
            other => {
                return Err(BindError::InvalidDefaultParams {
                    index,
                    name,
                    got: other.to_string(),
                })
            }
        };

        let transform = registry.resolve(&name, &spec.transform)?;
        debug!(query = %name, endpoint = %endpoint, transform = transform.name(), "query normalized");

        out.push(NormalizedQuery {
            name,
            endpoint,
            filter: spec.filter,
            params,
            auto_load: spec.auto_load.unwrap_or(true),
            transform,
        });
    }

    Ok(out)
}
