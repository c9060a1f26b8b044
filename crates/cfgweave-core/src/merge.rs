//! Merge Engine: combines ordered sources under a strategy and conflict policy.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStrategy {
    Deep,
    Shallow,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStrategy {
    Concat,
    Prepend,
    Unique,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Replace,
    First,
    Error,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::Replace
    }
}

/// Either kind of strategy, as selected by a `strategy` token before the
/// source-kind of the sources is known to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Object(ObjectStrategy),
    Array(ArrayStrategy),
    /// `default`: resolves to `deep` for objects, `concat` for arrays, once
    /// the source kind is known.
    Default,
}

impl Strategy {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "deep" => Ok(Strategy::Object(ObjectStrategy::Deep)),
            "shallow" => Ok(Strategy::Object(ObjectStrategy::Shallow)),
            "replace" => Ok(Strategy::Object(ObjectStrategy::Replace)),
            "concat" | "append" => Ok(Strategy::Array(ArrayStrategy::Concat)),
            "prepend" => Ok(Strategy::Array(ArrayStrategy::Prepend)),
            "unique" | "union" => Ok(Strategy::Array(ArrayStrategy::Unique)),
            "default" => Ok(Strategy::Default),
            other => Err(Error::strategy(format!("unknown merge strategy '{other}'"))),
        }
    }
}

impl ConflictPolicy {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "replace" => Ok(ConflictPolicy::Replace),
            "first" => Ok(ConflictPolicy::First),
            "error" => Ok(ConflictPolicy::Error),
            other => Err(Error::strategy(format!("unknown key-conflict policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Object,
    Array,
}

/// Classify non-nil sources, requiring a single shared kind.
pub fn classify(sources: &[Node]) -> Result<Option<SourceKind>> {
    let mut kind = None;
    for source in sources {
        let this_kind = match source {
            Node::Null => continue,
            Node::Mapping(_) => SourceKind::Object,
            Node::Sequence(_) => SourceKind::Array,
            _ => {
                return Err(Error::structure(
                    "$merge sources must be mappings or sequences",
                ))
            }
        };
        match kind {
            None => kind = Some(this_kind),
            Some(k) if k == this_kind => {}
            Some(_) => return Err(Error::structure("$merge sources have mixed kinds")),
        }
    }
    Ok(kind)
}

pub fn merge(
    sources: &[Node],
    strategy: Strategy,
    conflict: ConflictPolicy,
) -> Result<Node> {
    let kind = classify(sources)?;
    let Some(kind) = kind else {
        return Ok(Node::Mapping(IndexMap::new()));
    };
    match kind {
        SourceKind::Object => {
            let strategy = match strategy {
                Strategy::Object(s) => s,
                Strategy::Default => ObjectStrategy::Deep,
                Strategy::Array(_) => {
                    return Err(Error::strategy("array strategy used on object sources"))
                }
            };
            merge_objects(sources, strategy, conflict)
        }
        SourceKind::Array => {
            let strategy = match strategy {
                Strategy::Array(s) => s,
                Strategy::Default => ArrayStrategy::Concat,
                Strategy::Object(_) => {
                    return Err(Error::strategy("object strategy used on array sources"))
                }
            };
            merge_arrays(sources, strategy)
        }
    }
}

fn non_nil_mappings(sources: &[Node]) -> impl Iterator<Item = &IndexMap<String, Node>> {
    sources.iter().filter_map(|s| match s {
        Node::Mapping(m) => Some(m),
        Node::Null => None,
        _ => unreachable!("classified as object kind"),
    })
}

fn merge_objects(
    sources: &[Node],
    strategy: ObjectStrategy,
    conflict: ConflictPolicy,
) -> Result<Node> {
    match strategy {
        ObjectStrategy::Replace => {
            let last = non_nil_mappings(sources)
                .last()
                .cloned()
                .unwrap_or_default();
            Ok(Node::Mapping(last))
        }
        ObjectStrategy::Shallow => {
            let mut acc: IndexMap<String, Node> = IndexMap::new();
            for map in non_nil_mappings(sources) {
                for (key, value) in map {
                    insert_with_conflict(&mut acc, key.clone(), value.clone(), conflict)?;
                }
            }
            Ok(Node::Mapping(acc))
        }
        ObjectStrategy::Deep => {
            let mut acc: IndexMap<String, Node> = IndexMap::new();
            for map in non_nil_mappings(sources) {
                for (key, value) in map {
                    match (acc.get(key), value) {
                        (Some(Node::Mapping(existing)), Node::Mapping(incoming)) => {
                            let merged = merge_objects(
                                &[Node::Mapping(existing.clone()), Node::Mapping(incoming.clone())],
                                ObjectStrategy::Deep,
                                conflict,
                            )?;
                            acc.insert(key.clone(), merged);
                        }
                        _ => insert_with_conflict(&mut acc, key.clone(), value.clone(), conflict)?,
                    }
                }
            }
            Ok(Node::Mapping(acc))
        }
    }
}

fn insert_with_conflict(
    acc: &mut IndexMap<String, Node>,
    key: String,
    value: Node,
    conflict: ConflictPolicy,
) -> Result<()> {
    if acc.contains_key(&key) {
        match conflict {
            ConflictPolicy::Replace => {
                acc.insert(key, value);
            }
            ConflictPolicy::First => {}
            ConflictPolicy::Error => return Err(Error::conflict(key)),
        }
    } else {
        acc.insert(key, value);
    }
    Ok(())
}

fn non_nil_sequences(sources: &[Node]) -> impl Iterator<Item = &[Node]> {
    sources.iter().filter_map(|s| match s {
        Node::Sequence(s) => Some(s.as_slice()),
        Node::Null => None,
        _ => unreachable!("classified as array kind"),
    })
}

fn merge_arrays(sources: &[Node], strategy: ArrayStrategy) -> Result<Node> {
    match strategy {
        ArrayStrategy::Replace => {
            let last = non_nil_sequences(sources).last().unwrap_or(&[]).to_vec();
            Ok(Node::Sequence(last))
        }
        ArrayStrategy::Concat => {
            let mut out = Vec::new();
            for seq in non_nil_sequences(sources) {
                out.extend_from_slice(seq);
            }
            Ok(Node::Sequence(out))
        }
        ArrayStrategy::Prepend => {
            let mut out: Vec<Node> = Vec::new();
            for seq in non_nil_sequences(sources) {
                let mut combined = seq.to_vec();
                combined.extend(out);
                out = combined;
            }
            Ok(Node::Sequence(out))
        }
        ArrayStrategy::Unique => {
            let mut out = Vec::new();
            let mut seen = HashSet::new();
            for seq in non_nil_sequences(sources) {
                for item in seq {
                    let canonical = item.to_canonical_json().to_string();
                    if seen.insert(canonical) {
                        out.push(item.clone());
                    }
                }
            }
            Ok(Node::Sequence(out))
        }
    }
}
