//! # Query Declarations
//!
//! Everything a binding knows about its queries before any request is made:
//!
//! - [`QuerySpec`] - author-supplied declaration (endpoint, filter, params, transform)
//! - [`Filter`] - static, computed or `{{params.x}}`-templated request filter
//! - [`LoadOptions`] - per-call flags (`reset_params`, `append`, `reset`, `id`)
//! - [`normalize`] - validates declarations into the immutable [`NormalizedQuery`] table
//!
//! ## Normalization Rules
//!
//! | Field | Default | Rule |
//! |-------|---------|------|
//! | `endpoint` | required | one leading and one trailing `/` stripped |
//! | `name` | derived | stripped endpoint, non-word runs collapsed to `-` |
//! | `params` | `{}` | merged into on every load |
//! | `auto_load` | `true` | one load right after mount |
//! | `transform` | `array` | resolved once, never re-dispatched by name |

mod filter;
mod normalize;
mod options;
mod spec;

pub use filter::{Filter, FilterFn};
pub use normalize::{derive_name, normalize, strip_endpoint, NormalizedQuery};
pub use options::LoadOptions;
pub use spec::{QuerySpec, TransformSpec};

/// Query parameters (a JSON object)
pub type Params = serde_json::Map<String, serde_json::Value>;
