//! Declarative binding files
//!
//! ```yaml
//! schema: restbind/binding@0.1
//! config:
//!   baseUrl: http://localhost:3000/api
//! queries:
//!   - endpoint: /users/
//!     filter: { limit: 10, skip: "{{params.skip}}" }
//!     params: { skip: 0 }
//!     transform: array
//!     autoLoad: true
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ConfigStore;
use crate::error::BindError;
use crate::query::{Filter, QuerySpec, TransformSpec};

/// Schema tag every binding file must carry
pub const BINDING_SCHEMA: &str = "restbind/binding@0.1";

#[derive(Debug, Clone, Deserialize)]
pub struct BindingFile {
    pub schema: String,
    /// Assigned into the config store before mounting
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub queries: Vec<QueryDecl>,
}

/// One query as written in YAML
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryDecl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// `{{params.key}}` placeholders are resolved at load time
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub auto_load: Option<bool>,
    /// `array`, `object` or a registered custom transform
    #[serde(default)]
    pub transform: Option<String>,
}

impl BindingFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, BindError> {
        let file: BindingFile = serde_yaml::from_str(yaml)?;
        if file.schema != BINDING_SCHEMA {
            return Err(BindError::InvalidBindingFile {
                details: format!(
                    "expected schema '{}', got '{}'",
                    BINDING_SCHEMA, file.schema
                ),
            });
        }
        Ok(file)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BindError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Query declarations, ready for [`normalize`](crate::query::normalize)
    pub fn query_specs(&self) -> Vec<QuerySpec> {
        self.queries
            .iter()
            .map(|decl| QuerySpec {
                name: decl.name.clone(),
                endpoint: decl.endpoint.clone(),
                filter: decl
                    .filter
                    .clone()
                    .map(Filter::Template)
                    .unwrap_or_default(),
                params: Value::Object(decl.params.clone()),
                auto_load: decl.auto_load,
                transform: decl
                    .transform
                    .clone()
                    .map(TransformSpec::Named)
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Copy the `config:` block into `store`
    pub fn apply_config(&self, store: &ConfigStore) {
        if !self.config.is_empty() {
            store.set_many(self.config.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::normalize;
    use crate::transform::TransformRegistry;
    use serde_json::json;

    const SAMPLE: &str = r#"
schema: restbind/binding@0.1
config:
  baseUrl: http://localhost:3000/api
queries:
  - endpoint: /users/
    filter: { limit: 10, skip: "{{params.skip}}" }
    params: { skip: 0 }
  - name: stats
    endpoint: reports/daily
    transform: object
    autoLoad: false
"#;

    #[test]
    fn parses_sample() {
        let file = BindingFile::from_yaml(SAMPLE).unwrap();
        assert_eq!(file.queries.len(), 2);
        assert_eq!(file.queries[1].auto_load, Some(false));
        assert_eq!(file.config["baseUrl"], "http://localhost:3000/api");
    }

    #[test]
    fn specs_normalize() {
        let file = BindingFile::from_yaml(SAMPLE).unwrap();
        let queries = normalize(file.query_specs(), &TransformRegistry::new()).unwrap();

        assert_eq!(queries[0].name, "users");
        assert!(queries[0].auto_load);
        assert_eq!(
            queries[0].filter.evaluate(&queries[0].params),
            Some(json!({"limit": 10, "skip": 0}))
        );
        assert_eq!(queries[1].name, "stats");
        assert_eq!(queries[1].transform.name(), "object");
    }

    #[test]
    fn wrong_schema_rejected() {
        let err = BindingFile::from_yaml("schema: other@1\nqueries: []\n").unwrap_err();
        assert!(err.to_string().contains("BIND-030"));
    }

    #[test]
    fn unknown_field_rejected() {
        let yaml = "schema: restbind/binding@0.1\nqueries:\n  - endpoint: a\n    auto_load: true\n";
        assert!(matches!(
            BindingFile::from_yaml(yaml),
            Err(BindError::YamlParse(_))
        ));
    }

    #[test]
    fn applies_config() {
        let file = BindingFile::from_yaml(SAMPLE).unwrap();
        let store = ConfigStore::new();
        file.apply_config(&store);
        assert_eq!(
            store.get_str("baseUrl").as_deref(),
            Some("http://localhost:3000/api")
        );
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binding.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(BindingFile::load(&path).unwrap().queries.len(), 2);
    }
}
