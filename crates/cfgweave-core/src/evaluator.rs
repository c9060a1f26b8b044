//! Recursive tree walker that detects and expands directives.

use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;

use crate::context::{EvalContext, Inner};
use crate::error::{Error, Result};
use crate::node::Node;

/// A prepared, reusable evaluator. Logically immutable after construction:
/// scopes and the path cache are populated lazily behind interior-mutability
/// primitives safe for concurrent first access, so the same `Evaluator` can
/// serve concurrent top-level [`Evaluator::eval`] calls.
#[derive(Clone)]
pub struct Evaluator {
    pub(crate) inner: Arc<Inner>,
}

impl Evaluator {
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// One-shot expansion of `node` in a fresh evaluation frame.
    pub fn eval(&self, node: &Node) -> Result<Node> {
        let ctx = EvalContext::new(Arc::clone(&self.inner));
        eval_node(&ctx, node)
    }

    /// Path lookup, exposed for directive handlers and advanced callers.
    pub fn resolve_path(&self, scope: &str, path: &str) -> Result<Node> {
        let ctx = EvalContext::new(Arc::clone(&self.inner));
        ctx.resolve_path(scope, path)
    }
}

pub(crate) fn eval_node(ctx: &EvalContext, node: &Node) -> Result<Node> {
    ctx.enter_frame()?;
    let result = eval_node_inner(ctx, node);
    ctx.exit_frame();
    result
}

fn eval_node_inner(ctx: &EvalContext, node: &Node) -> Result<Node> {
    if !node.is_mapping() && !node.is_sequence() {
        return Ok(node.clone());
    }

    let node = match ctx.pre_eval() {
        Some(hook) => hook(node).map_err(|e| e.with_context("pre-eval hook"))?,
        None => node.clone(),
    };

    match node {
        Node::Sequence(items) => eval_sequence(ctx, &items),
        Node::Mapping(map) => eval_mapping(ctx, &map),
        other => Ok(other),
    }
}

fn eval_sequence(ctx: &EvalContext, items: &[Node]) -> Result<Node> {
    if should_parallelize(ctx, items.len()) {
        return eval_sequence_parallel(ctx, items);
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(eval_node(ctx, item)?);
    }
    Ok(Node::Sequence(out))
}

fn eval_mapping(ctx: &EvalContext, map: &IndexMap<String, Node>) -> Result<Node> {
    let directive_keys: Vec<&String> = map
        .keys()
        .filter(|k| crate::registry::is_registered(k))
        .collect();

    if directive_keys.len() > 1 {
        return Err(Error::structure("multiple directives not allowed in one map"));
    }

    if let Some(key) = directive_keys.into_iter().next() {
        let descriptor = crate::registry::lookup(key)
            .expect("key was just confirmed present in the registry");
        if !descriptor.allows_siblings && map.len() > 1 {
            return Err(Error::structure(format!(
                "{key} does not allow sibling keys"
            )));
        }
        let arg = map
            .get(key)
            .expect("key came from this map's own keys iterator");

        (descriptor.validator)(arg).map_err(|e| e.with_context(key.clone()))?;
        let result =
            (descriptor.handler)(ctx, map, arg).map_err(|e| e.with_context(key.clone()))?;
        return eval_node(ctx, &result);
    }

    if should_parallelize(ctx, map.len()) {
        return eval_mapping_parallel(ctx, map);
    }

    let mut out = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        out.insert(key.clone(), eval_node(ctx, value)?);
    }
    Ok(Node::Mapping(out))
}

#[cfg(feature = "parallel")]
fn should_parallelize(ctx: &EvalContext, len: usize) -> bool {
    ctx.parallel_threshold().is_some_and(|t| len > t)
}

#[cfg(not(feature = "parallel"))]
fn should_parallelize(ctx: &EvalContext, _len: usize) -> bool {
    if ctx.parallel_threshold().is_some() {
        warn!("parallel_threshold is set but the 'parallel' feature is not enabled; evaluating sequentially");
    }
    false
}

#[cfg(feature = "parallel")]
fn eval_sequence_parallel(ctx: &EvalContext, items: &[Node]) -> Result<Node> {
    use rayon::prelude::*;
    let results: Result<Vec<Node>> = items
        .par_iter()
        .map(|item| {
            let branch = ctx.fork();
            eval_node(&branch, item)
        })
        .collect();
    Ok(Node::Sequence(results?))
}

#[cfg(not(feature = "parallel"))]
fn eval_sequence_parallel(_ctx: &EvalContext, _items: &[Node]) -> Result<Node> {
    unreachable!("should_parallelize never returns true without the 'parallel' feature")
}

#[cfg(feature = "parallel")]
fn eval_mapping_parallel(ctx: &EvalContext, map: &IndexMap<String, Node>) -> Result<Node> {
    use rayon::prelude::*;
    let results: Result<Vec<(String, Node)>> = map
        .par_iter()
        .map(|(key, value)| {
            let branch = ctx.fork();
            eval_node(&branch, value).map(|result| (key.clone(), result))
        })
        .collect();
    Ok(Node::Mapping(results?.into_iter().collect()))
}

#[cfg(not(feature = "parallel"))]
fn eval_mapping_parallel(_ctx: &EvalContext, _map: &IndexMap<String, Node>) -> Result<Node> {
    unreachable!("should_parallelize never returns true without the 'parallel' feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Inner;
    use crate::scope::Scope;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn evaluator_with_local(node: Node) -> Evaluator {
        crate::registry::reset_for_tests();
        let mut scopes = HashMap::new();
        scopes.insert("local".to_string(), Scope::from_node(node));
        Evaluator::from_inner(Inner {
            scopes,
            cache: None,
            max_depth: 20,
            parallel_threshold: None,
            transform_use: None,
            pre_eval: None,
        })
    }

    #[test]
    fn scalars_pass_through_unchanged() {
        let evaluator = evaluator_with_local(Node::Null);
        assert_eq!(evaluator.eval(&Node::Integer(5)).unwrap(), Node::Integer(5));
    }

    #[test]
    fn plain_map_without_directives_recurses_into_children() {
        let evaluator = evaluator_with_local(Node::Null);
        let input = Node::Mapping(IndexMap::from([(
            "a".to_string(),
            Node::Sequence(vec![Node::Integer(1), Node::Integer(2)]),
        )]));
        assert_eq!(evaluator.eval(&input).unwrap(), input);
    }

    #[test]
    fn simple_ref_resolves_nested_path() {
        let mut db = IndexMap::new();
        db.insert("host".to_string(), Node::from("h"));
        db.insert("port".to_string(), Node::Integer(5432));
        let mut local = IndexMap::new();
        local.insert("db".to_string(), Node::Mapping(db));
        let evaluator = evaluator_with_local(Node::Mapping(local));

        let input = Node::Mapping(IndexMap::from([(
            "x".to_string(),
            Node::Mapping(IndexMap::from([(
                "$ref".to_string(),
                Node::from("local::db.host"),
            )])),
        )]));
        let output = evaluator.eval(&input).unwrap();
        let expected = Node::Mapping(IndexMap::from([("x".to_string(), Node::from("h"))]));
        assert_eq!(output, expected);
    }

    #[test]
    fn inline_merge_sibling_override() {
        let mut s = IndexMap::new();
        s.insert("host".to_string(), Node::from("h"));
        s.insert("port".to_string(), Node::Integer(80));
        let local = IndexMap::from([("s".to_string(), Node::Mapping(s))]);
        let evaluator = evaluator_with_local(Node::Mapping(local));

        let mut srv = IndexMap::new();
        srv.insert("$ref".to_string(), Node::from("local::s"));
        srv.insert("port".to_string(), Node::Integer(443));
        let input = Node::Mapping(IndexMap::from([("srv".to_string(), Node::Mapping(srv))]));

        let output = evaluator.eval(&input).unwrap();
        let mut expected_srv = IndexMap::new();
        expected_srv.insert("host".to_string(), Node::from("h"));
        expected_srv.insert("port".to_string(), Node::Integer(443));
        let expected = Node::Mapping(IndexMap::from([(
            "srv".to_string(),
            Node::Mapping(expected_srv),
        )]));
        assert_eq!(output, expected);
    }

    #[test]
    fn cycle_between_two_scope_paths_is_detected() {
        let a = Node::Mapping(IndexMap::from([(
            "$ref".to_string(),
            Node::from("local::b"),
        )]));
        let b = Node::Mapping(IndexMap::from([(
            "$ref".to_string(),
            Node::from("local::a"),
        )]));
        let local = IndexMap::from([("a".to_string(), a), ("b".to_string(), b)]);
        let evaluator = evaluator_with_local(Node::Mapping(local));

        let input = Node::Mapping(IndexMap::from([(
            "$ref".to_string(),
            Node::from("local::a"),
        )]));
        let err = evaluator.eval(&input).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Cycle(_)));
    }

    #[test]
    fn multiple_directive_keys_is_structure_error() {
        let evaluator = evaluator_with_local(Node::Mapping(IndexMap::new()));
        let input = Node::Mapping(IndexMap::from([
            ("$ref".to_string(), Node::from("local::a")),
            ("$use".to_string(), Node::from("agent(local::a)")),
        ]));
        assert!(evaluator.eval(&input).is_err());
    }

    #[test]
    fn merge_with_sibling_keys_is_structure_error() {
        let evaluator = evaluator_with_local(Node::Mapping(IndexMap::new()));
        let input = Node::Mapping(IndexMap::from([
            ("$merge".to_string(), Node::Sequence(vec![])),
            ("extra".to_string(), Node::Integer(1)),
        ]));
        assert!(evaluator.eval(&input).is_err());
    }

    #[test]
    fn empty_local_scope_is_scope_error_not_path_error() {
        let evaluator = evaluator_with_local(Node::Null);
        let input = Node::Mapping(IndexMap::from([(
            "$ref".to_string(),
            Node::from("local::a"),
        )]));
        let err = evaluator.eval(&input).unwrap_err();
        // The scope exists (registered at construction with a Null node) but
        // has no path `a`; verify a missing scope entirely reports ScopeError.
        assert!(matches!(err.kind, crate::error::ErrorKind::Path(_)));

        let evaluator_no_scope = Evaluator::from_inner(Inner {
            scopes: HashMap::new(),
            cache: None,
            max_depth: 20,
            parallel_threshold: None,
            transform_use: None,
            pre_eval: None,
        });
        let err = evaluator_no_scope.eval(&input).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Scope(_)));
    }
}
