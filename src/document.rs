//! File-level entry points: read, transform, write.

use std::fs;
use std::path::Path;

use crate::error::{MetamoveError, Result};
use crate::transform::transform;
use crate::yaml::{self, EmitStyle};

/// Rewrite YAML text in memory, relocating `meta`/`tags` into `config` on
/// every model-like mapping. Output is serialized with the fixed style
/// (mapping indent 2, sequence indent 4, dash offset 2).
pub fn transform_str(text: &str) -> Result<String> {
    let mut doc = yaml::parse(text)?;
    transform(&mut doc.root);
    Ok(yaml::emit(&doc, &EmitStyle::default()))
}

/// Rewrite the schema file at `input_path` and write the result to
/// `output_path`. The two paths may be the same file; the read completes
/// before the write begins. I/O and parse failures are surfaced as-is and
/// nothing is written on error.
pub fn transform_document(input_path: &Path, output_path: &Path) -> Result<()> {
    let text = fs::read_to_string(input_path).map_err(|e| MetamoveError::FileReadFailed {
        path: input_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let rendered = transform_str(&text)?;
    fs::write(output_path, rendered).map_err(|e| MetamoveError::FileWriteFailed {
        path: output_path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_str_basic() {
        let out = transform_str("models:\n  - name: orders\n    tags:\n      - a\n")
            .expect("Should transform");
        assert_eq!(
            out,
            "models:\n  - name: orders\n    config:\n      tags:\n        - a\n"
        );
    }

    #[test]
    fn test_transform_str_parse_error() {
        let err = transform_str("a:\n\tb: 1\n").expect_err("tabs should fail to parse");
        assert!(matches!(err, MetamoveError::YamlParseFailed { .. }));
    }

    #[test]
    fn test_transform_document_missing_input() {
        let err = transform_document(Path::new("/nonexistent/schema.yml"), Path::new("/tmp/out.yml"))
            .expect_err("missing input should fail");
        assert!(matches!(err, MetamoveError::FileReadFailed { .. }));
    }
}
