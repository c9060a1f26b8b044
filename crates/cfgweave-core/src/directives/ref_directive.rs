use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::node::Node;

static REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scope>[a-zA-Z_]+)::(?P<path>[^!]+)(?:!merge:<(?P<opts>[^>]*)>)?$")
        .expect("static $ref pattern is valid")
});

pub(crate) fn validate(arg: &Node) -> Result<()> {
    let raw = arg
        .as_str()
        .ok_or_else(|| Error::syntax("$ref argument must be a string"))?;
    if !REF_PATTERN.is_match(raw) {
        return Err(Error::syntax(format!("invalid $ref syntax: '{raw}'")));
    }
    Ok(())
}

pub(crate) fn handle(
    ctx: &EvalContext,
    parent: &IndexMap<String, Node>,
    arg: &Node,
) -> Result<Node> {
    let raw = arg
        .as_str()
        .ok_or_else(|| Error::syntax("$ref argument must be a string"))?;
    let caps = REF_PATTERN
        .captures(raw)
        .ok_or_else(|| Error::syntax(format!("invalid $ref syntax: '{raw}'")))?;

    let scope = &caps["scope"];
    let path = &caps["path"];
    let opts = caps
        .name("opts")
        .map(|m| super::parse_inline_opts(m.as_str()))
        .transpose()?;

    let resolved = ctx
        .resolve_path(scope, path)
        .map_err(|e| e.with_context(format!("$ref {raw}")))?;

    // Left unevaluated: the caller (`eval_mapping`'s post-handler step)
    // re-walks the returned value in the same frame, which both expands any
    // directive nested in `resolved` and picks up directives hiding in the
    // literal sibling keys merged in below. One frame per hop, not two.
    super::apply_inline_merge(resolved, parent, "$ref", opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_malformed_argument() {
        assert!(validate(&Node::from("no-scope-separator")).is_err());
    }

    #[test]
    fn accepts_scope_and_path() {
        assert!(validate(&Node::from("local::db.host")).is_ok());
    }

    #[test]
    fn accepts_inline_merge_suffix() {
        assert!(validate(&Node::from("local::db!merge:<deep,replace>")).is_ok());
    }

    #[test]
    fn non_string_argument_is_rejected() {
        assert!(validate(&Node::Integer(1)).is_err());
    }
}
