//! Comment-preserving parser for the block-style YAML subset used by
//! analytics-engineering schema files.
//!
//! The parser is line-oriented: block structure follows indentation, trivia
//! runs (comments and blank lines) bind to the next entry or item in the
//! same block, and whatever is left when a block closes binds to that
//! block's tail. Scalar source text is kept verbatim so the emitter can
//! reproduce quoting, block-scalar headers, and continuation lines.

use crate::error::{MetamoveError, Result};

use super::node::{Document, MapEntry, Mapping, Node, Scalar, SeqItem, Sequence, Trivia};

/// Parse YAML text into an annotated [`Document`].
pub fn parse(text: &str) -> Result<Document> {
    Parser::new(text)?.parse_document()
}

#[derive(Debug, Clone, Copy)]
struct Line<'t> {
    raw: &'t str,
    indent: usize,
    number: usize,
}

impl<'t> Line<'t> {
    fn content(self) -> &'t str {
        &self.raw[self.indent..]
    }

    fn is_blank(self) -> bool {
        self.raw.is_empty()
    }

    fn is_comment(self) -> bool {
        !self.is_blank() && self.content().starts_with('#')
    }

    fn is_trivia(self) -> bool {
        self.is_blank() || self.is_comment()
    }

    fn is_dash_item(self) -> bool {
        let c = self.content();
        c == "-" || c.starts_with("- ")
    }
}

struct Parser<'t> {
    lines: Vec<Line<'t>>,
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(text: &'t str) -> Result<Self> {
        let mut lines = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let raw = raw.trim_end();
            let indent = raw.len() - raw.trim_start_matches(' ').len();
            if raw[indent..].starts_with('\t') {
                return Err(MetamoveError::YamlParseFailed {
                    line: idx + 1,
                    reason: "tab character in indentation".to_string(),
                });
            }
            lines.push(Line {
                raw,
                indent,
                number: idx + 1,
            });
        }
        Ok(Parser { lines, pos: 0 })
    }

    fn peek(&self) -> Option<Line<'t>> {
        self.lines.get(self.pos).copied()
    }

    /// Next content line at or after the cursor, skipping trivia without
    /// consuming anything.
    fn peek_content(&self) -> Option<Line<'t>> {
        self.lines[self.pos..]
            .iter()
            .copied()
            .find(|l| !l.is_trivia())
    }

    fn parse_document(mut self) -> Result<Document> {
        let mut leading = Vec::new();
        while let Some(line) = self.peek() {
            if line.is_trivia() || line.raw.trim() == "---" {
                leading.push(line.raw.to_string());
                self.pos += 1;
            } else {
                break;
            }
        }

        let root = match self.peek() {
            None => Node::Scalar(Scalar::default()),
            Some(line) => self.parse_block_node(line)?,
        };

        let mut trailing = Vec::new();
        while let Some(line) = self.peek() {
            if line.is_trivia() || line.raw.trim() == "..." {
                trailing.push(line.raw.to_string());
                self.pos += 1;
            } else {
                return Err(MetamoveError::YamlParseFailed {
                    line: line.number,
                    reason: "content after the end of the document".to_string(),
                });
            }
        }

        Ok(Document {
            root,
            leading,
            trailing,
        })
    }

    /// Parse the block node starting at `line` (the cursor's content line).
    fn parse_block_node(&mut self, line: Line<'t>) -> Result<Node> {
        let content = line.content();
        if line.is_dash_item() {
            return self.parse_block_sequence(line.indent).map(Node::Sequence);
        }
        if key_split(content).is_some() {
            return self.parse_block_mapping(line.indent, None).map(Node::Mapping);
        }
        if content.starts_with('[') || content.starts_with('{') {
            self.pos += 1;
            let text = self.gather_flow(content, line.number)?;
            return parse_flow(&text, line.number);
        }
        // Bare scalar document.
        self.pos += 1;
        let mut raw = String::from(content);
        self.absorb_scalar_tail(line.indent, &mut raw);
        Ok(Node::Scalar(Scalar::new(raw)))
    }

    /// Parse a block mapping whose keys sit at `indent`. For compact
    /// sequence items (`- key: value`) the caller parses the first entry
    /// from the dash line and hands it in via `first`.
    fn parse_block_mapping(&mut self, indent: usize, first: Option<MapEntry>) -> Result<Mapping> {
        let mut map = Mapping::default();
        if let Some(entry) = first {
            map.entries.push(entry);
        }

        loop {
            let run_start = self.pos;
            while self.peek().is_some_and(|l| l.is_trivia()) {
                self.pos += 1;
            }
            match self.peek() {
                Some(line) if line.indent == indent && key_split(line.content()).is_some() => {
                    let before = self.collect_trivia(run_start, self.pos, indent);
                    self.pos += 1;
                    let entry = self.parse_entry(indent, line.content(), before)?;
                    map.entries.push(entry);
                }
                Some(line) if line.indent > indent => {
                    return Err(MetamoveError::YamlParseFailed {
                        line: line.number,
                        reason: "unexpected indentation".to_string(),
                    });
                }
                _ => {
                    self.pos = run_start;
                    self.claim_trailing(indent, &mut map.trailing);
                    break;
                }
            }
        }
        Ok(map)
    }

    /// Parse one mapping entry; the key line is already consumed and its
    /// content (from the key's column) is passed in.
    fn parse_entry(
        &mut self,
        indent: usize,
        content: &'t str,
        before: Vec<Trivia>,
    ) -> Result<MapEntry> {
        let lineno = self.lines[self.pos.saturating_sub(1)].number;
        let Some((key_raw, rest)) = key_split(content) else {
            return Err(MetamoveError::YamlParseFailed {
                line: lineno,
                reason: "expected a `key: value` line".to_string(),
            });
        };
        let (value_part, inline) = comment_split(rest);

        let value = self.parse_value(indent, value_part, lineno)?;
        Ok(MapEntry {
            key_raw: key_raw.to_string(),
            value,
            before,
            inline,
        })
    }

    /// Parse the value that follows a `key:` at `indent`, where
    /// `value_part` is the remainder of the key line (comment stripped).
    fn parse_value(&mut self, indent: usize, value_part: &'t str, lineno: usize) -> Result<Node> {
        if value_part.is_empty() {
            return self.parse_nested_value(indent);
        }
        if value_part.starts_with('|') || value_part.starts_with('>') {
            let mut raw = String::from(value_part);
            self.absorb_scalar_tail(indent, &mut raw);
            return Ok(Node::Scalar(Scalar::new(raw)));
        }
        if value_part.starts_with('[') || value_part.starts_with('{') {
            let text = self.gather_flow(value_part, lineno)?;
            return parse_flow(&text, lineno);
        }
        let mut raw = String::from(value_part);
        self.absorb_scalar_tail(indent, &mut raw);
        Ok(Node::Scalar(Scalar::new(raw)))
    }

    /// Parse the value of a key with nothing after the colon: a nested
    /// mapping/sequence on deeper lines, a sequence whose dashes sit at the
    /// key's own indent, a multi-line scalar, or null.
    fn parse_nested_value(&mut self, indent: usize) -> Result<Node> {
        let Some(line) = self.peek_content() else {
            return Ok(Node::Scalar(Scalar::default()));
        };
        if line.indent == indent && line.is_dash_item() {
            return self.parse_block_sequence(line.indent).map(Node::Sequence);
        }
        if line.indent <= indent {
            return Ok(Node::Scalar(Scalar::default()));
        }
        if line.is_dash_item() {
            return self.parse_block_sequence(line.indent).map(Node::Sequence);
        }
        if key_split(line.content()).is_some() {
            return self.parse_block_mapping(line.indent, None).map(Node::Mapping);
        }
        // Plain multi-line scalar written entirely below the key.
        let mut raw = String::new();
        self.absorb_scalar_tail(indent, &mut raw);
        Ok(Node::Scalar(Scalar::new(raw)))
    }

    /// Parse a block sequence whose dashes sit at `indent`.
    fn parse_block_sequence(&mut self, indent: usize) -> Result<Sequence> {
        let mut seq = Sequence::default();

        loop {
            let run_start = self.pos;
            while self.peek().is_some_and(|l| l.is_trivia()) {
                self.pos += 1;
            }
            match self.peek() {
                Some(line) if line.indent == indent && line.is_dash_item() => {
                    let before = self.collect_trivia(run_start, self.pos, indent);
                    self.pos += 1;
                    let item = self.parse_item(line, indent, before)?;
                    seq.items.push(item);
                }
                Some(line) if line.indent > indent => {
                    return Err(MetamoveError::YamlParseFailed {
                        line: line.number,
                        reason: "unexpected indentation".to_string(),
                    });
                }
                _ => {
                    self.pos = run_start;
                    self.claim_trailing(indent, &mut seq.trailing);
                    break;
                }
            }
        }
        Ok(seq)
    }

    /// Parse one sequence item; the dash line is already consumed.
    fn parse_item(
        &mut self,
        line: Line<'t>,
        dash_indent: usize,
        before: Vec<Trivia>,
    ) -> Result<SeqItem> {
        let content = line.content();
        if content == "-" {
            let node = self.parse_nested_value(dash_indent)?;
            return Ok(SeqItem {
                node,
                before,
                inline: None,
            });
        }

        let after_dash = &content[1..];
        let pad = after_dash.len() - after_dash.trim_start().len();
        let item_indent = dash_indent + 1 + pad;
        let rest: &'t str = &content[1 + pad..];

        if key_split(rest).is_some() && !rest.starts_with('[') && !rest.starts_with('{') {
            // Compact mapping: first entry shares the dash line.
            let entry = self.parse_entry_at(item_indent, rest, line.number)?;
            let mapping = self.parse_block_mapping(item_indent, Some(entry))?;
            return Ok(SeqItem {
                node: Node::Mapping(mapping),
                before,
                inline: None,
            });
        }

        let (value_part, inline) = comment_split(rest);
        let node = self.parse_value(dash_indent, value_part, line.number)?;
        Ok(SeqItem {
            node,
            before,
            inline,
        })
    }

    /// `parse_entry` variant for compact items, where the key's virtual
    /// column differs from the physical line indent.
    fn parse_entry_at(&mut self, indent: usize, content: &'t str, lineno: usize) -> Result<MapEntry> {
        let Some((key_raw, rest)) = key_split(content) else {
            return Err(MetamoveError::YamlParseFailed {
                line: lineno,
                reason: "expected a `key: value` line".to_string(),
            });
        };
        let (value_part, inline) = comment_split(rest);
        let value = self.parse_value(indent, value_part, lineno)?;
        Ok(MapEntry {
            key_raw: key_raw.to_string(),
            value,
            before: Vec::new(),
            inline,
        })
    }

    /// Absorb continuation lines of a scalar whose owner (key or dash) sits
    /// at `indent`. Any line deeper than `indent` continues the scalar,
    /// `#` lines included (for block scalars they are body text; after
    /// plain scalars they are kept in place as raw text). Blank runs are
    /// absorbed only when deeper content follows.
    fn absorb_scalar_tail(&mut self, indent: usize, raw: &mut String) {
        loop {
            let mut i = self.pos;
            let mut blanks = 0;
            while i < self.lines.len() && self.lines[i].is_blank() {
                blanks += 1;
                i += 1;
            }
            let Some(&line) = self.lines.get(i) else {
                break;
            };
            if line.indent <= indent {
                break;
            }
            for _ in 0..blanks {
                raw.push('\n');
            }
            raw.push('\n');
            for _ in 0..(line.indent - indent) {
                raw.push(' ');
            }
            raw.push_str(line.content());
            self.pos = i + 1;
        }
    }

    /// Gather the text of a flow collection, continuing across lines until
    /// brackets balance.
    fn gather_flow(&mut self, first: &str, lineno: usize) -> Result<String> {
        let mut text = String::from(first);
        while !flow_balanced(&text) {
            let Some(line) = self.peek() else {
                return Err(MetamoveError::YamlParseFailed {
                    line: lineno,
                    reason: "unterminated flow collection".to_string(),
                });
            };
            self.pos += 1;
            if !line.is_blank() {
                text.push(' ');
                text.push_str(line.content());
            }
        }
        Ok(text)
    }

    /// Turn `lines[from..to]` (a trivia run) into attached trivia relative
    /// to `block_indent`.
    fn collect_trivia(&self, from: usize, to: usize, block_indent: usize) -> Vec<Trivia> {
        self.lines[from..to]
            .iter()
            .map(|l| {
                if l.is_blank() {
                    Trivia::blank()
                } else {
                    Trivia::comment(l.indent.saturating_sub(block_indent), l.content())
                }
            })
            .collect()
    }

    /// Claim end-of-block trivia: blanks unconditionally, comments only at
    /// or beyond the block's indent. The first line that belongs to an
    /// outer block stops the claim and stays for the caller.
    fn claim_trailing(&mut self, indent: usize, trailing: &mut Vec<Trivia>) {
        while let Some(line) = self.peek() {
            if line.is_blank() {
                trailing.push(Trivia::blank());
                self.pos += 1;
            } else if line.is_comment() && line.indent >= indent {
                trailing.push(Trivia::comment(line.indent - indent, line.content()));
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

/// Split a `key: value` line at the first top-level colon. Returns the key
/// as written and the trimmed remainder, or `None` if the line is not a
/// mapping entry.
fn key_split(content: &str) -> Option<(&str, &str)> {
    let bytes = content.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if in_single {
            if c == b'\'' {
                in_single = false;
            }
        } else if in_double {
            if c == b'\\' {
                i += 1;
            } else if c == b'"' {
                in_double = false;
            }
        } else {
            match c {
                b'\'' => in_single = true,
                b'"' => in_double = true,
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth = depth.saturating_sub(1),
                b':' if depth == 0 && (i + 1 == bytes.len() || bytes[i + 1] == b' ') => {
                    let key = content[..i].trim_end();
                    if key.is_empty() {
                        return None;
                    }
                    return Some((key, content[i + 1..].trim_start()));
                }
                b'#' if i > 0 && bytes[i - 1] == b' ' => return None,
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Split an inline comment off the rest of a key/dash line. The returned
/// comment includes its leading gap so emission reproduces the spacing.
fn comment_split(rest: &str) -> (&str, Option<String>) {
    let bytes = rest.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if in_single {
            if c == b'\'' {
                in_single = false;
            }
        } else if in_double {
            if c == b'\\' {
                i += 1;
            } else if c == b'"' {
                in_double = false;
            }
        } else {
            match c {
                b'\'' => in_single = true,
                b'"' => in_double = true,
                b'#' if i == 0 || bytes[i - 1] == b' ' => {
                    let value = rest[..i].trim_end();
                    let gap = &rest[value.len()..i];
                    let gap = if gap.is_empty() { " " } else { gap };
                    return (value, Some(format!("{gap}{}", &rest[i..])));
                }
                _ => {}
            }
        }
        i += 1;
    }
    (rest, None)
}

fn flow_balanced(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if in_single {
            if c == b'\'' {
                in_single = false;
            }
        } else if in_double {
            if c == b'\\' {
                i += 1;
            } else if c == b'"' {
                in_double = false;
            }
        } else {
            match c {
                b'\'' => in_single = true,
                b'"' => in_double = true,
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth -= 1,
                _ => {}
            }
        }
        i += 1;
    }
    depth <= 0 && !in_single && !in_double
}

/// Recursive-descent parser for a gathered flow collection.
fn parse_flow(text: &str, lineno: usize) -> Result<Node> {
    let mut fp = FlowParser {
        chars: text.as_bytes(),
        pos: 0,
        lineno,
        text,
    };
    let node = fp.parse_node()?;
    fp.skip_ws();
    if fp.pos < fp.chars.len() {
        return Err(MetamoveError::YamlParseFailed {
            line: lineno,
            reason: "trailing characters after flow collection".to_string(),
        });
    }
    Ok(node)
}

struct FlowParser<'a> {
    chars: &'a [u8],
    pos: usize,
    lineno: usize,
    text: &'a str,
}

impl FlowParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    fn fail(&self, reason: &str) -> MetamoveError {
        MetamoveError::YamlParseFailed {
            line: self.lineno,
            reason: reason.to_string(),
        }
    }

    fn parse_node(&mut self) -> Result<Node> {
        self.skip_ws();
        match self.chars.get(self.pos) {
            Some(b'[') => self.parse_sequence(),
            Some(b'{') => self.parse_mapping(),
            _ => {
                let raw = self.take_scalar(false)?;
                Ok(Node::Scalar(Scalar::new(raw)))
            }
        }
    }

    fn parse_sequence(&mut self) -> Result<Node> {
        self.pos += 1; // '['
        let mut seq = Sequence {
            flow: true,
            ..Sequence::default()
        };
        loop {
            self.skip_ws();
            match self.chars.get(self.pos) {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Node::Sequence(seq));
                }
                None => return Err(self.fail("unterminated flow sequence")),
                _ => {}
            }
            let node = self.parse_node()?;
            seq.items.push(SeqItem::new(node));
            self.skip_ws();
            match self.chars.get(self.pos) {
                Some(b',') => self.pos += 1,
                Some(b']') => {}
                _ => return Err(self.fail("expected `,` or `]` in flow sequence")),
            }
        }
    }

    fn parse_mapping(&mut self) -> Result<Node> {
        self.pos += 1; // '{'
        let mut map = Mapping {
            flow: true,
            ..Mapping::default()
        };
        loop {
            self.skip_ws();
            match self.chars.get(self.pos) {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Node::Mapping(map));
                }
                None => return Err(self.fail("unterminated flow mapping")),
                _ => {}
            }
            let key = self.take_scalar(true)?;
            self.skip_ws();
            if self.chars.get(self.pos) != Some(&b':') {
                return Err(self.fail("expected `:` in flow mapping"));
            }
            self.pos += 1;
            let value = self.parse_node()?;
            map.entries.push(MapEntry::new(key, value));
            self.skip_ws();
            match self.chars.get(self.pos) {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.fail("expected `,` or `}` in flow mapping")),
            }
        }
    }

    /// Take a flow scalar as written. Stops at a top-level `,`/`]`/`}` and,
    /// in key position, at `:`.
    fn take_scalar(&mut self, key_position: bool) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        match self.chars.get(self.pos) {
            Some(&q @ (b'\'' | b'"')) => {
                self.pos += 1;
                while self.pos < self.chars.len() {
                    let c = self.chars[self.pos];
                    if q == b'"' && c == b'\\' {
                        self.pos += 1;
                    } else if c == q {
                        self.pos += 1;
                        return Ok(self.text[start..self.pos].to_string());
                    }
                    self.pos += 1;
                }
                Err(self.fail("unterminated quoted scalar"))
            }
            _ => {
                while self.pos < self.chars.len() {
                    let c = self.chars[self.pos];
                    if matches!(c, b',' | b']' | b'}') || (key_position && c == b':') {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(self.text[start..self.pos].trim_end().to_string())
            }
        }
    }
}
