//! Built-in `$ref`, `$use`, `$merge` directives and the inline-merge helper
//! they share.

mod merge_directive;
mod ref_directive;
mod use_directive;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::merge::{ConflictPolicy, ObjectStrategy, Strategy};
use crate::node::Node;
use crate::registry::Descriptor;

pub(crate) fn builtins() -> Vec<Descriptor> {
    vec![
        Descriptor {
            name: "$ref",
            validator: ref_directive::validate,
            handler: ref_directive::handle,
            allows_siblings: true,
        },
        Descriptor {
            name: "$use",
            validator: use_directive::validate,
            handler: use_directive::handle,
            allows_siblings: true,
        },
        Descriptor {
            name: "$merge",
            validator: merge_directive::validate,
            handler: merge_directive::handle,
            allows_siblings: false,
        },
    ]
}

pub(crate) struct InlineOpts {
    pub strategy: Option<Strategy>,
    pub conflict: Option<ConflictPolicy>,
}

/// Parse the comma-separated tokens inside a `!merge:<...>` suffix.
pub(crate) fn parse_inline_opts(opts: &str) -> Result<InlineOpts> {
    let mut strategy = None;
    let mut conflict = None;
    for token in opts.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match (Strategy::parse(token), ConflictPolicy::parse(token)) {
            (Ok(s), _) => strategy = Some(s),
            (_, Ok(c)) => conflict = Some(c),
            _ => return Err(Error::syntax(format!("unknown merge option '{token}'"))),
        }
    }
    Ok(InlineOpts { strategy, conflict })
}

/// Combine a `$ref`/`$use` result with the sibling keys of its parent map,
/// per the inline-merge rule.
pub(crate) fn apply_inline_merge(
    result: Node,
    parent: &IndexMap<String, Node>,
    directive_key: &str,
    opts: Option<InlineOpts>,
) -> Result<Node> {
    // `!merge:<replace>` always returns the raw resolved value, siblings or not.
    if let Some(InlineOpts {
        strategy: Some(Strategy::Object(ObjectStrategy::Replace)),
        ..
    }) = &opts
    {
        return Ok(result);
    }

    let siblings: IndexMap<String, Node> = parent
        .iter()
        .filter(|(k, _)| k.as_str() != directive_key)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if siblings.is_empty() {
        return Ok(result);
    }

    match &result {
        Node::Null | Node::Mapping(_) => {}
        _ => {
            return Err(Error::structure(
                "cannot inline-merge a scalar or array directive result with sibling keys",
            ))
        }
    }

    let strategy = opts
        .as_ref()
        .and_then(|o| o.strategy)
        .unwrap_or(Strategy::Object(ObjectStrategy::Deep));
    let conflict = opts
        .as_ref()
        .and_then(|o| o.conflict)
        .unwrap_or(ConflictPolicy::Replace);

    crate::merge::merge(&[result, Node::Mapping(siblings)], strategy, conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_siblings_returns_result_unchanged() {
        let parent = IndexMap::from([("$ref".to_string(), Node::from("local::a"))]);
        let result = apply_inline_merge(Node::Integer(1), &parent, "$ref", None).unwrap();
        assert_eq!(result, Node::Integer(1));
    }

    #[test]
    fn scalar_result_with_siblings_is_structure_error() {
        let parent = IndexMap::from([
            ("$ref".to_string(), Node::from("local::a")),
            ("extra".to_string(), Node::Integer(1)),
        ]);
        assert!(apply_inline_merge(Node::Integer(1), &parent, "$ref", None).is_err());
    }

    #[test]
    fn null_result_with_siblings_yields_siblings_object() {
        let parent = IndexMap::from([
            ("$ref".to_string(), Node::from("local::a")),
            ("extra".to_string(), Node::Integer(1)),
        ]);
        let result = apply_inline_merge(Node::Null, &parent, "$ref", None).unwrap();
        assert_eq!(
            result,
            Node::Mapping(IndexMap::from([("extra".to_string(), Node::Integer(1))]))
        );
    }

    #[test]
    fn merge_replace_opt_ignores_siblings() {
        let parent = IndexMap::from([
            ("$ref".to_string(), Node::from("local::a")),
            ("extra".to_string(), Node::Integer(1)),
        ]);
        let opts = InlineOpts {
            strategy: Some(Strategy::Object(ObjectStrategy::Replace)),
            conflict: None,
        };
        let result = apply_inline_merge(Node::Integer(7), &parent, "$ref", Some(opts)).unwrap();
        assert_eq!(result, Node::Integer(7));
    }
}
