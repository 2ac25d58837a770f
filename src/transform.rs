//! Relocate legacy top-level `meta` and `tags` fields into `config`.
//!
//! dbt deprecated `meta:` and `tags:` as direct keys on models, sources,
//! columns, and friends; they now belong under `config:`. The walk visits
//! every mapping in the document, and any mapping that has a `name` key
//! plus at least one of the legacy fields gets them moved into its
//! `config` mapping, merging with whatever is already there. Comments
//! attached to the moved entries travel with them.

use crate::yaml::{MapEntry, Mapping, Node};

const NAME: &str = "name";
const META: &str = "meta";
const TAGS: &str = "tags";
const CONFIG: &str = "config";

/// Walk the tree depth-first and relocate `meta`/`tags` on every
/// model-like mapping (one that carries a `name` key).
///
/// Children are transformed before their parent so that nested model-like
/// mappings (columns under a model, for example) are handled at every
/// level. A mapping with neither `meta` nor `tags` is left untouched,
/// including any pre-existing `config`.
pub fn transform(node: &mut Node) {
    match node {
        Node::Sequence(seq) => {
            for item in &mut seq.items {
                transform(&mut item.node);
            }
        }
        Node::Mapping(map) => {
            for entry in &mut map.entries {
                transform(&mut entry.value);
            }
            if map.contains_key(NAME) && (map.contains_key(META) || map.contains_key(TAGS)) {
                relocate(map);
            }
        }
        Node::Scalar(_) => {}
    }
}

/// Move `meta` and `tags` out of `map` into its `config` mapping. The
/// rebuilt `config` lands where the first of `meta`/`tags` stood; all other
/// keys keep their relative order.
fn relocate(map: &mut Mapping) {
    let Some(mut anchor) = map
        .entries
        .iter()
        .position(|e| e.key() == META || e.key() == TAGS)
    else {
        return;
    };

    // A pre-existing config mapping is merged into; any other config value
    // is replaced wholesale (its trivia is kept on the rebuilt entry).
    let (mut config, before, inline) = match take_entry(map, CONFIG, &mut anchor) {
        Some(entry) => {
            let existing = match entry.value {
                Node::Mapping(m) => m,
                _ => Mapping::default(),
            };
            (existing, entry.before, entry.inline)
        }
        None => (Mapping::default(), Vec::new(), None),
    };

    if let Some(meta) = take_entry(map, META, &mut anchor) {
        merge_meta(&mut config, meta);
    }
    if let Some(tags) = take_entry(map, TAGS, &mut anchor) {
        merge_tags(&mut config, tags);
    }

    // A flow-style config cannot hold block-style children or attached
    // comments; demote it to block style when the merge introduced either.
    if config.flow && config.entries.iter().any(needs_block) {
        config.flow = false;
    }

    let entry = MapEntry {
        key_raw: CONFIG.to_string(),
        value: Node::Mapping(config),
        before,
        inline,
    };
    let at = anchor.min(map.entries.len());
    map.entries.insert(at, entry);
}

/// Remove the entry for `key`, keeping `anchor` pointing at the same slot
/// of the remaining entries.
fn take_entry(map: &mut Mapping, key: &str, anchor: &mut usize) -> Option<MapEntry> {
    let pos = map.position(key)?;
    if pos < *anchor {
        *anchor -= 1;
    }
    Some(map.entries.remove(pos))
}

/// Merge an incoming top-level `meta` entry into `config`. Mapping-to-
/// mapping merges go key by key with the incoming side winning collisions;
/// any other shape replaces the existing value wholesale.
fn merge_meta(config: &mut Mapping, incoming: MapEntry) {
    let Some(pos) = config.position(META) else {
        config.entries.push(incoming);
        return;
    };
    let both_mappings = matches!(config.entries[pos].value, Node::Mapping(_))
        && matches!(incoming.value, Node::Mapping(_));
    if !both_mappings {
        config.entries[pos] = incoming;
        return;
    }
    let Node::Mapping(new_map) = incoming.value else {
        return;
    };
    let Node::Mapping(existing) = &mut config.entries[pos].value else {
        return;
    };
    let new_flow = new_map.flow;
    for entry in new_map.entries {
        let key = entry.key().into_owned();
        match existing.entries.iter().position(|e| e.key() == key) {
            Some(i) => existing.entries[i] = entry,
            None => existing.entries.push(entry),
        }
    }
    existing.trailing.extend(new_map.trailing);
    existing.flow = existing.flow && new_flow;
}

/// Merge an incoming top-level `tags` entry into `config` as a set union:
/// existing tags keep their order, incoming tags are appended unless an
/// equal value is already present. Any non-sequence shape on either side
/// makes the incoming value replace the existing one wholesale.
fn merge_tags(config: &mut Mapping, incoming: MapEntry) {
    let Some(pos) = config.position(TAGS) else {
        config.entries.push(incoming);
        return;
    };
    let both_sequences = matches!(config.entries[pos].value, Node::Sequence(_))
        && matches!(incoming.value, Node::Sequence(_));
    if !both_sequences {
        config.entries[pos] = incoming;
        return;
    }
    let Node::Sequence(new_seq) = incoming.value else {
        return;
    };
    let Node::Sequence(existing) = &mut config.entries[pos].value else {
        return;
    };
    let new_flow = new_seq.flow;
    for item in new_seq.items {
        if !existing.items.iter().any(|e| e.node.value_eq(&item.node)) {
            existing.items.push(item);
        }
    }
    existing.trailing.extend(new_seq.trailing);
    existing.flow = existing.flow && new_flow;
}

fn needs_block(entry: &MapEntry) -> bool {
    if !entry.before.is_empty() || entry.inline.is_some() {
        return true;
    }
    match &entry.value {
        Node::Mapping(m) => !m.flow,
        Node::Sequence(s) => !s.flow,
        Node::Scalar(s) => s.raw.contains('\n'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse;

    fn transformed(text: &str) -> Mapping {
        let mut doc = parse(text).expect("Should parse document");
        transform(&mut doc.root);
        match doc.root {
            Node::Mapping(m) => m,
            other => panic!("expected mapping root, got {other:?}"),
        }
    }

    fn model(map: &Mapping) -> &Mapping {
        map.get("models")
            .and_then(Node::as_sequence)
            .and_then(|s| s.items.first())
            .and_then(|i| i.node.as_mapping())
            .expect("first model mapping")
    }

    fn keys(map: &Mapping) -> Vec<String> {
        map.entries.iter().map(|e| e.key().into_owned()).collect()
    }

    #[test]
    fn test_meta_and_tags_move_under_config() {
        let map = transformed(
            "models:\n  - name: orders\n    meta:\n      owner: Team\n    tags:\n      - tag1\n      - tag2\n",
        );
        let m = model(&map);
        assert_eq!(keys(m), ["name", "config"]);
        let config = m.get("config").and_then(Node::as_mapping).expect("config");
        assert_eq!(keys(config), ["meta", "tags"]);
    }

    #[test]
    fn test_existing_config_keys_survive() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      materialized: table\n    meta:\n      owner: Team\n",
        );
        let config = model(&map).get("config").and_then(Node::as_mapping).expect("config");
        assert_eq!(keys(config), ["materialized", "meta"]);
    }

    #[test]
    fn test_config_placed_at_first_legacy_field() {
        let map = transformed(
            "models:\n  - name: orders\n    before: x\n    tags:\n      - a\n    middle: y\n    meta:\n      owner: Team\n    after: z\n",
        );
        let m = model(&map);
        assert_eq!(keys(m), ["name", "before", "config", "middle", "after"]);
    }

    #[test]
    fn test_existing_config_abandons_old_position() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      materialized: table\n    other: x\n    meta:\n      owner: Team\n",
        );
        let m = model(&map);
        assert_eq!(keys(m), ["name", "other", "config"]);
    }

    #[test]
    fn test_meta_collision_incoming_wins() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      meta:\n        owner: old\n        keep: yes\n    meta:\n      owner: new\n",
        );
        let meta = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("meta"))
            .and_then(Node::as_mapping)
            .expect("config.meta");
        assert_eq!(keys(meta), ["owner", "keep"]);
        assert_eq!(
            meta.get("owner").and_then(Node::as_scalar).map(|s| s.plain().to_string()),
            Some("new".to_string())
        );
    }

    #[test]
    fn test_tags_union_deduplicates() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      tags:\n        - existing\n        - shared\n    tags:\n      - shared\n      - new\n",
        );
        let tags = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("tags"))
            .and_then(Node::as_sequence)
            .expect("config.tags");
        let values: Vec<String> = tags
            .items
            .iter()
            .filter_map(|i| i.node.as_scalar().map(|s| s.plain().to_string()))
            .collect();
        assert_eq!(values, ["existing", "shared", "new"]);
    }

    #[test]
    fn test_tags_union_ignores_quoting_differences() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      tags: ['shared']\n    tags:\n      - shared\n",
        );
        let tags = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("tags"))
            .and_then(Node::as_sequence)
            .expect("config.tags");
        assert_eq!(tags.items.len(), 1);
    }

    #[test]
    fn test_non_mapping_meta_replaces_wholesale() {
        let map = transformed("models:\n  - name: orders\n    meta: 42\n");
        let meta = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("meta"))
            .and_then(Node::as_scalar)
            .expect("config.meta scalar");
        assert_eq!(meta.plain(), "42");
    }

    #[test]
    fn test_non_sequence_tags_replaces_wholesale() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      tags: not-a-list\n    tags:\n      - a\n",
        );
        let tags = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("tags"))
            .and_then(Node::as_sequence)
            .expect("config.tags sequence");
        assert_eq!(tags.items.len(), 1);
    }

    #[test]
    fn test_non_mapping_config_replaced() {
        let map = transformed("models:\n  - name: orders\n    config: oops\n    tags:\n      - a\n");
        let config = model(&map).get("config").and_then(Node::as_mapping).expect("config");
        assert_eq!(keys(config), ["tags"]);
    }

    #[test]
    fn test_mapping_without_name_is_not_relocated() {
        let map = transformed("defaults:\n  meta:\n    owner: Team\n");
        let defaults = map.get("defaults").and_then(Node::as_mapping).expect("defaults");
        assert_eq!(keys(defaults), ["meta"]);
    }

    #[test]
    fn test_nameless_parent_still_recurses() {
        let map = transformed(
            "anything:\n  nested:\n    - name: inner\n      tags:\n        - t\n",
        );
        let inner = map
            .get("anything")
            .and_then(Node::as_mapping)
            .and_then(|m| m.get("nested"))
            .and_then(Node::as_sequence)
            .and_then(|s| s.items.first())
            .and_then(|i| i.node.as_mapping())
            .expect("inner mapping");
        assert_eq!(keys(inner), ["name", "config"]);
    }

    #[test]
    fn test_nested_columns_transformed_independently() {
        let map = transformed(
            "models:\n  - name: orders\n    meta:\n      owner: Team\n    columns:\n      - name: id\n        meta:\n          pii: false\n        tags:\n          - col\n",
        );
        let m = model(&map);
        assert_eq!(keys(m), ["name", "config", "columns"]);
        let column = m
            .get("columns")
            .and_then(Node::as_sequence)
            .and_then(|s| s.items.first())
            .and_then(|i| i.node.as_mapping())
            .expect("column mapping");
        assert_eq!(keys(column), ["name", "config"]);
    }

    #[test]
    fn test_no_legacy_fields_is_a_noop() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      tags:\n        - keep\n    description: x\n",
        );
        let m = model(&map);
        assert_eq!(keys(m), ["name", "config", "description"]);
        let tags = m
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("tags"))
            .and_then(Node::as_sequence)
            .expect("config.tags");
        assert_eq!(tags.items.len(), 1);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let text = "models:\n  - name: orders\n    meta:\n      owner: Team\n    tags:\n      - a\n";
        let mut doc = parse(text).expect("Should parse document");
        transform(&mut doc.root);
        let once = crate::yaml::emit(&doc, &crate::yaml::EmitStyle::default());
        transform(&mut doc.root);
        let twice = crate::yaml::emit(&doc, &crate::yaml::EmitStyle::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_comments_travel_with_moved_entries() {
        let text = "models:\n  - name: orders\n    # about meta\n    meta:\n      owner: Team\n";
        let map = transformed(text);
        let config_entry = &model(&map).entries[1];
        assert_eq!(config_entry.key(), "config");
        let meta_entry = config_entry
            .value
            .as_mapping()
            .and_then(|c| c.entries.first())
            .expect("meta entry");
        assert_eq!(meta_entry.before.len(), 1);
        assert_eq!(meta_entry.before[0].text, "# about meta");
    }

    #[test]
    fn test_flow_tags_stay_flow_when_both_flow() {
        let map = transformed(
            "models:\n  - name: orders\n    config:\n      tags: [a]\n    tags: [b]\n",
        );
        let tags = model(&map)
            .get("config")
            .and_then(Node::as_mapping)
            .and_then(|c| c.get("tags"))
            .and_then(Node::as_sequence)
            .expect("config.tags");
        assert!(tags.flow);
        assert_eq!(tags.items.len(), 2);
    }
}
