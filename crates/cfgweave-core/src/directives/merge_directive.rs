use indexmap::IndexMap;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::merge::{ConflictPolicy, Strategy};
use crate::node::Node;

pub(crate) fn validate(arg: &Node) -> Result<()> {
    match arg {
        Node::Sequence(_) => Ok(()),
        Node::Mapping(m) => {
            match m.get("sources") {
                Some(Node::Sequence(_)) => {}
                _ => return Err(Error::syntax("$merge 'sources' must be a sequence")),
            }
            for key in m.keys() {
                if !matches!(key.as_str(), "sources" | "strategy" | "key_conflict") {
                    return Err(Error::structure(format!("unknown $merge key '{key}'")));
                }
            }
            Ok(())
        }
        _ => Err(Error::syntax("$merge must be a sequence or mapping")),
    }
}

pub(crate) fn handle(
    ctx: &EvalContext,
    _parent: &IndexMap<String, Node>,
    arg: &Node,
) -> Result<Node> {
    let (sources, strategy_tok, conflict_tok) = match arg {
        Node::Sequence(seq) => (seq.clone(), None, None),
        Node::Mapping(m) => {
            let sources = match m.get("sources") {
                Some(Node::Sequence(seq)) => seq.clone(),
                _ => return Err(Error::syntax("$merge 'sources' must be a sequence")),
            };
            let strategy_tok = m.get("strategy").and_then(Node::as_str).map(str::to_string);
            let conflict_tok = m
                .get("key_conflict")
                .and_then(Node::as_str)
                .map(str::to_string);
            (sources, strategy_tok, conflict_tok)
        }
        _ => return Err(Error::syntax("$merge must be a sequence or mapping")),
    };

    let strategy = match strategy_tok {
        Some(tok) => Strategy::parse(&tok)?,
        None => Strategy::Default,
    };
    let conflict = match conflict_tok {
        Some(tok) => ConflictPolicy::parse(&tok)?,
        None => ConflictPolicy::default(),
    };

    let mut evaluated = Vec::with_capacity(sources.len());
    for source in &sources {
        evaluated.push(ctx.eval(source)?);
    }

    crate::merge::merge(&evaluated, strategy, conflict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sequence_shorthand_is_accepted() {
        assert!(validate(&Node::Sequence(vec![Node::Integer(1)])).is_ok());
    }

    #[test]
    fn mapping_without_sources_is_rejected() {
        let m = IndexMap::from([("strategy".to_string(), Node::from("deep"))]);
        assert!(validate(&Node::Mapping(m)).is_err());
    }

    #[test]
    fn mapping_with_unknown_key_is_rejected() {
        let m = IndexMap::from([
            ("sources".to_string(), Node::Sequence(vec![])),
            ("bogus".to_string(), Node::Integer(1)),
        ]);
        assert!(validate(&Node::Mapping(m)).is_err());
    }

    #[test]
    fn scalar_argument_is_rejected() {
        assert!(validate(&Node::Integer(1)).is_err());
    }
}
