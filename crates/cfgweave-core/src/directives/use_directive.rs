use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::node::Node;

static USE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<component>[a-zA-Z_]+)\((?P<scope>[a-zA-Z_]+)::(?P<path>[^)]+)\)(?:!merge:<(?P<opts>[^>]*)>)?$")
        .expect("static $use pattern is valid")
});

pub(crate) fn validate(arg: &Node) -> Result<()> {
    let raw = arg
        .as_str()
        .ok_or_else(|| Error::syntax("$use argument must be a string"))?;
    if !USE_PATTERN.is_match(raw) {
        return Err(Error::syntax(format!("invalid $use syntax: '{raw}'")));
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
        .ok_or_else(|| Error::syntax("$use argument must be a string"))?;
    let caps = USE_PATTERN
        .captures(raw)
        .ok_or_else(|| Error::syntax(format!("invalid $use syntax: '{raw}'")))?;

    let component = &caps["component"];
    let scope = &caps["scope"];
    let path = &caps["path"];
    let opts = caps
        .name("opts")
        .map(|m| super::parse_inline_opts(m.as_str()))
        .transpose()?;

    let cfg = ctx
        .resolve_path(scope, path)
        .map_err(|e| e.with_context(format!("$use {raw}")))?;

    // `cfg` is intentionally left unevaluated here; the caller's post-handler
    // re-walk expands it (and the literal sibling keys merged in below) in
    // one pass. A configured transform runs against the raw fetched config.
    let (key, value) = match ctx.transform_use() {
        Some(transform) => transform(component, &cfg).map_err(|e| e.with_context(format!("$use {raw}")))?,
        None => (component.to_string(), cfg),
    };

    let mut wrapped = IndexMap::new();
    wrapped.insert(key, value);
    let result = Node::Mapping(wrapped);

    super::apply_inline_merge(result, parent, "$use", opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_malformed_argument() {
        assert!(validate(&Node::from("agent local::w")).is_err());
    }

    #[test]
    fn accepts_component_call_syntax() {
        assert!(validate(&Node::from("agent(local::w)")).is_ok());
    }

    #[test]
    fn accepts_inline_merge_suffix() {
        assert!(validate(&Node::from("agent(local::w)!merge:<shallow,first>")).is_ok());
    }
}
