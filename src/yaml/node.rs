//! Annotated YAML tree nodes.
//!
//! Nodes keep the raw source text of scalars (quotes, block-scalar headers,
//! multi-line continuations) and carry attached trivia (comments and blank
//! lines) so that a parse → emit round trip reproduces the input and
//! restructured entries take their comments with them.

use std::borrow::Cow;

/// A parsed YAML document: the root node plus any lines before and after it
/// (`---`/`...` markers, comments, blank lines), stored verbatim.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root: Node,
    pub leading: Vec<String>,
    pub trailing: Vec<String>,
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Sequence),
    Mapping(Mapping),
}

impl Default for Node {
    fn default() -> Self {
        Node::Scalar(Scalar::default())
    }
}

impl Node {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Value equality on normalized content: scalars compare unquoted,
    /// containers compare element-wise. Used for tag deduplication.
    pub fn value_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Scalar(a), Node::Scalar(b)) => a.plain() == b.plain(),
            (Node::Sequence(a), Node::Sequence(b)) => {
                a.items.len() == b.items.len()
                    && a.items
                        .iter()
                        .zip(&b.items)
                        .all(|(x, y)| x.node.value_eq(&y.node))
            }
            (Node::Mapping(a), Node::Mapping(b)) => {
                a.entries.len() == b.entries.len()
                    && a.entries
                        .iter()
                        .zip(&b.entries)
                        .all(|(x, y)| x.key() == y.key() && x.value.value_eq(&y.value))
            }
            _ => false,
        }
    }
}

/// A scalar value, stored as written in the source.
///
/// `raw` holds everything that followed the `key:` (or `-`): the quotes, a
/// block-scalar header like `|-`, and any continuation lines joined with
/// `\n`, each indented relative to the owning key or dash. An empty `raw`
/// is a null value (a key with nothing after the colon).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scalar {
    pub raw: String,
}

impl Scalar {
    pub fn new(raw: impl Into<String>) -> Self {
        Scalar { raw: raw.into() }
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_empty()
    }

    /// Normalized value for equality: single-line scalars have their quotes
    /// stripped and basic escapes resolved; everything else compares as-is.
    pub fn plain(&self) -> Cow<'_, str> {
        unquote(&self.raw)
    }
}

/// One comment or blank line attached inside a block, stored relative to the
/// owning block's indentation. `text` is empty for a blank line, otherwise
/// the `#`-prefixed comment text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub indent: usize,
    pub text: String,
}

impl Trivia {
    pub fn blank() -> Self {
        Trivia {
            indent: 0,
            text: String::new(),
        }
    }

    pub fn comment(indent: usize, text: impl Into<String>) -> Self {
        Trivia {
            indent,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// A key → value pair of a mapping, with the trivia bound to the key.
#[derive(Debug, Clone, Default)]
pub struct MapEntry {
    /// Key as written, possibly quoted.
    pub key_raw: String,
    pub value: Node,
    /// Full lines (comments/blanks) preceding this entry.
    pub before: Vec<Trivia>,
    /// Comment trailing the entry's first line, including its leading gap.
    pub inline: Option<String>,
}

impl MapEntry {
    pub fn new(key: impl Into<String>, value: Node) -> Self {
        MapEntry {
            key_raw: key.into(),
            value,
            before: Vec::new(),
            inline: None,
        }
    }

    /// Normalized key (quotes stripped).
    pub fn key(&self) -> Cow<'_, str> {
        unquote(&self.key_raw)
    }
}

/// An ordered mapping. `flow` records `{...}` style; `trailing` holds
/// comments/blanks bound to the end of the block.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub entries: Vec<MapEntry>,
    pub flow: bool,
    pub trailing: Vec<Trivia>,
}

impl Mapping {
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|i| &self.entries[i].value)
    }
}

/// One item of a sequence, with the trivia bound to its dash.
#[derive(Debug, Clone, Default)]
pub struct SeqItem {
    pub node: Node,
    pub before: Vec<Trivia>,
    pub inline: Option<String>,
}

impl SeqItem {
    pub fn new(node: Node) -> Self {
        SeqItem {
            node,
            before: Vec::new(),
            inline: None,
        }
    }
}

/// An ordered sequence. `flow` records `[...]` style.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub items: Vec<SeqItem>,
    pub flow: bool,
    pub trailing: Vec<Trivia>,
}

/// Strip quotes from a single-line scalar and resolve the escapes that
/// matter for equality. Multi-line and unquoted text is returned trimmed.
pub(crate) fn unquote(raw: &str) -> Cow<'_, str> {
    let t = raw.trim();
    if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') && !t.contains('\n') {
        let inner = &t[1..t.len() - 1];
        if inner.contains('\\') {
            Cow::Owned(unescape_double(inner))
        } else {
            Cow::Borrowed(inner)
        }
    } else if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') && !t.contains('\n') {
        let inner = &t[1..t.len() - 1];
        if inner.contains("''") {
            Cow::Owned(inner.replace("''", "'"))
        } else {
            Cow::Borrowed(inner)
        }
    } else {
        Cow::Borrowed(t)
    }
}

fn unescape_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
