//! Request URL construction
//!
//! `<baseUrl>/<endpoint>?filter=<json>&access_token=<token>`, where the JSON
//! is percent-encoded with the same reserved set as JavaScript's
//! `encodeURIComponent` so URLs stay byte-compatible with REST filter APIs.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::config::{ConfigStore, ACCESS_TOKEN_KEY, BASE_URL_KEY};

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query-string component
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Configured base URL with exactly one trailing `/`
pub fn base_url(config: &ConfigStore) -> String {
    let mut base = config.get_str(BASE_URL_KEY).unwrap_or_default();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// A filter that contributes no `filter=` segment
pub fn is_empty_filter(filter: &Value) -> bool {
    match filter {
        Value::Null | Value::Bool(false) => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Build the request URL for `endpoint` with an optional filter
///
/// Pure apart from reading `baseUrl` and `access_token` from `config`.
pub fn build_url(config: &ConfigStore, endpoint: &str, filter: Option<&Value>) -> String {
    let mut url = base_url(config);
    url.push_str(endpoint);

    let mut has_query = false;
    if let Some(filter) = filter.filter(|f| !is_empty_filter(f)) {
        url.push_str("?filter=");
        url.push_str(&encode_component(&filter.to_string()));
        has_query = true;
    }

    if let Some(token) = config.get_str(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty()) {
        url.push(if has_query { '&' } else { '?' });
        url.push_str("access_token=");
        url.push_str(&encode_component(&token));
    }

    url
}
