//! Metamove - dbt schema YAML migrator
//!
//! Rewrites schema files that still carry top-level `meta:` and `tags:`
//! fields on models, sources, columns, and other named nodes, moving them
//! under `config:` the way current dbt expects. The rewrite preserves
//! comments, key order, quoting, and block-scalar formatting; only the
//! relocated entries change.
//!
//! File discovery and the command line live in the consuming tool; this
//! crate exposes the per-document pipeline:
//!
//! ```
//! let out = metamove::transform_str(
//!     "models:\n  - name: orders\n    tags:\n      - daily\n",
//! )?;
//! assert!(out.contains("config:"));
//! # Ok::<(), metamove::MetamoveError>(())
//! ```

mod document;
mod error;
mod transform;
pub mod yaml;

pub use document::{transform_document, transform_str};
pub use error::{MetamoveError, Result};
pub use transform::transform;
