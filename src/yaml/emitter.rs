//! Serialize an annotated YAML tree back to text.
//!
//! Emission re-indents the tree under a fixed style (the ruamel-compatible
//! mapping=2 / sequence=4 / offset=2 by default) while reproducing scalar
//! source text and attached trivia verbatim. A document that round-trips
//! without restructuring comes back byte-for-byte when its input already
//! follows the configured style.

use super::node::{Document, MapEntry, Mapping, Node, Sequence, Trivia};

/// Indentation style for emission.
///
/// `mapping` indents child keys from their parent key, `sequence` indents
/// item content from the parent key, and `offset` places the dash within
/// the sequence indent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitStyle {
    pub mapping: usize,
    pub sequence: usize,
    pub offset: usize,
}

impl Default for EmitStyle {
    fn default() -> Self {
        EmitStyle {
            mapping: 2,
            sequence: 4,
            offset: 2,
        }
    }
}

/// Serialize a [`Document`] to YAML text.
pub fn emit(doc: &Document, style: &EmitStyle) -> String {
    let mut out = String::new();
    for line in &doc.leading {
        out.push_str(line);
        out.push('\n');
    }
    match &doc.root {
        Node::Mapping(m) if !m.flow => emit_mapping(&mut out, m, 0, style),
        Node::Sequence(s) if !s.flow => {
            emit_sequence(&mut out, s, 0, style.sequence.saturating_sub(style.offset), style);
        }
        node => {
            emit_scalar_or_flow_line(&mut out, node, 0, None);
        }
    }
    for line in &doc.trailing {
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn push_indent(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push(' ');
    }
}

fn emit_trivia(out: &mut String, trivia: &[Trivia], indent: usize) {
    for t in trivia {
        if t.is_blank() {
            out.push('\n');
        } else {
            push_indent(out, indent + t.indent);
            out.push_str(&t.text);
            out.push('\n');
        }
    }
}

fn emit_mapping(out: &mut String, map: &Mapping, indent: usize, style: &EmitStyle) {
    for entry in &map.entries {
        emit_trivia(out, &entry.before, indent);
        emit_entry(out, entry, indent, style);
    }
    emit_trivia(out, &map.trailing, indent);
}

fn emit_entry(out: &mut String, entry: &MapEntry, indent: usize, style: &EmitStyle) {
    push_indent(out, indent);
    out.push_str(&entry.key_raw);
    out.push(':');
    emit_value_after_colon(out, entry, indent, style);
}

/// Emit everything after the `key:` just written at `indent`.
fn emit_value_after_colon(out: &mut String, entry: &MapEntry, indent: usize, style: &EmitStyle) {
    match &entry.value {
        Node::Scalar(s) => {
            emit_scalar_tail(out, &s.raw, indent, 1, entry.inline.as_deref());
        }
        node if is_flow(node) => {
            out.push(' ');
            emit_flow(out, node);
            push_inline(out, entry.inline.as_deref());
            out.push('\n');
        }
        Node::Mapping(m) => {
            push_inline(out, entry.inline.as_deref());
            out.push('\n');
            emit_mapping(out, m, indent + style.mapping, style);
        }
        Node::Sequence(s) => {
            push_inline(out, entry.inline.as_deref());
            out.push('\n');
            emit_sequence(out, s, indent + style.offset, indent + style.sequence, style);
        }
    }
}

/// Emit a scalar's raw text after an already-written prefix. The first
/// segment continues the current line after `gap` spaces (omitted when the
/// scalar is null); continuation segments carry their own relative indent
/// on top of `indent`.
fn emit_scalar_tail(out: &mut String, raw: &str, indent: usize, gap: usize, inline: Option<&str>) {
    let mut segments = raw.split('\n');
    let first = segments.next().unwrap_or("");
    if !first.is_empty() {
        push_indent(out, gap);
        out.push_str(first);
    }
    push_inline(out, inline);
    out.push('\n');
    for seg in segments {
        if seg.is_empty() {
            out.push('\n');
        } else {
            push_indent(out, indent);
            out.push_str(seg);
            out.push('\n');
        }
    }
}

fn push_inline(out: &mut String, inline: Option<&str>) {
    if let Some(comment) = inline {
        out.push_str(comment);
    }
}

fn emit_sequence(
    out: &mut String,
    seq: &Sequence,
    dash_indent: usize,
    content_indent: usize,
    style: &EmitStyle,
) {
    let pad = content_indent.saturating_sub(dash_indent + 1).max(1);
    for item in &seq.items {
        emit_trivia(out, &item.before, dash_indent);
        match &item.node {
            Node::Mapping(m) if !m.flow && !m.entries.is_empty() => {
                // Compact form: first entry shares the dash line.
                let first = &m.entries[0];
                emit_trivia(out, &first.before, dash_indent);
                push_indent(out, dash_indent);
                out.push('-');
                push_indent(out, pad);
                out.push_str(&first.key_raw);
                out.push(':');
                emit_value_after_colon(out, first, content_indent, style);
                for entry in &m.entries[1..] {
                    emit_trivia(out, &entry.before, content_indent);
                    emit_entry(out, entry, content_indent, style);
                }
                emit_trivia(out, &m.trailing, content_indent);
            }
            Node::Scalar(s) => {
                push_indent(out, dash_indent);
                out.push('-');
                emit_scalar_tail(out, &s.raw, dash_indent, pad, item.inline.as_deref());
            }
            node if is_flow(node) => {
                push_indent(out, dash_indent);
                out.push('-');
                push_indent(out, pad);
                emit_flow(out, node);
                push_inline(out, item.inline.as_deref());
                out.push('\n');
            }
            Node::Sequence(s) => {
                push_indent(out, dash_indent);
                out.push_str("-\n");
                emit_sequence(
                    out,
                    s,
                    content_indent,
                    content_indent + style.sequence.saturating_sub(style.offset),
                    style,
                );
            }
            Node::Mapping(_) => {
                // Empty block mapping: nothing to place after the dash.
                push_indent(out, dash_indent);
                out.push_str("- {}\n");
            }
        }
    }
    emit_trivia(out, &seq.trailing, dash_indent);
}

fn is_flow(node: &Node) -> bool {
    match node {
        Node::Mapping(m) => m.flow,
        Node::Sequence(s) => s.flow,
        Node::Scalar(_) => false,
    }
}

fn emit_scalar_or_flow_line(out: &mut String, node: &Node, indent: usize, inline: Option<&str>) {
    match node {
        Node::Scalar(s) => {
            if !s.raw.is_empty() {
                let mut segments = s.raw.split('\n');
                if let Some(first) = segments.next() {
                    push_indent(out, indent);
                    out.push_str(first);
                    push_inline(out, inline);
                    out.push('\n');
                }
                for seg in segments {
                    if seg.is_empty() {
                        out.push('\n');
                    } else {
                        push_indent(out, indent);
                        out.push_str(seg);
                        out.push('\n');
                    }
                }
            }
        }
        node => {
            push_indent(out, indent);
            emit_flow(out, node);
            out.push('\n');
        }
    }
}

fn emit_flow(out: &mut String, node: &Node) {
    match node {
        Node::Scalar(s) => out.push_str(&s.raw),
        Node::Sequence(seq) => {
            out.push('[');
            for (i, item) in seq.items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_flow(out, &item.node);
            }
            out.push(']');
        }
        Node::Mapping(map) => {
            out.push('{');
            for (i, entry) in map.entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key_raw);
                out.push_str(": ");
                emit_flow(out, &entry.value);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn roundtrip(text: &str) -> String {
        let doc = parse(text).expect("Should parse document");
        emit(&doc, &EmitStyle::default())
    }

    #[test]
    fn test_roundtrip_simple_mapping() {
        let text = "version: 2\nname: orders\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_nested_blocks() {
        let text = "models:\n  - name: orders\n    description: daily orders\n    columns:\n      - name: id\n        tests:\n          - unique\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_comments_and_blanks() {
        let text = "# header comment\n\nversion: 2\n\nmodels:\n  # first model\n  - name: orders  # inline\n    meta:\n      # inner\n      owner: \"Team\"\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_block_scalars() {
        let text = "description: >\n  folded text\n  second line\nnotes: |-\n  literal\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_flow_collections() {
        let text = "tags: [tag1, tag2]\nmeta: {owner: Team}\nempty: []\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_quoting_preserved() {
        let text = "a: \"double\"\nb: 'single'\nc: plain\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_document_markers() {
        let text = "---\nversion: 2\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_trailing_comment() {
        let text = "models:\n  - name: orders\n    # trailing note\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_roundtrip_null_values() {
        let text = "a:\nb: 2\n";
        assert_eq!(roundtrip(text), text);
    }

    #[test]
    fn test_sequence_reindented_to_style() {
        // Dashes at the key's own indent are normalized to offset 2.
        let got = roundtrip("tags:\n- tag1\n- tag2\n");
        assert_eq!(got, "tags:\n  - tag1\n  - tag2\n");
    }

    #[test]
    fn test_custom_style() {
        let doc = parse("tags:\n  - tag1\n").expect("Should parse");
        let got = emit(
            &doc,
            &EmitStyle {
                mapping: 2,
                sequence: 6,
                offset: 4,
            },
        );
        assert_eq!(got, "tags:\n    - tag1\n");
    }
}
