//! Format-preserving YAML support.
//!
//! `serde_yaml` (and every other YAML crate on crates.io) discards comments
//! and styling on parse, which makes it unusable for rewriting schema files
//! in place. This module provides the round trip the rewriter needs: an
//! annotated node tree, a parser for the block-style subset dbt schema
//! files use, and an emitter with configurable indentation.

mod emitter;
mod node;
mod parser;

pub use emitter::{EmitStyle, emit};
pub use node::{Document, MapEntry, Mapping, Node, Scalar, SeqItem, Sequence, Trivia};
pub use parser::parse;
