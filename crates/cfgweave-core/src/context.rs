//! Per-call evaluation state: cycle stack, depth counter, and scope/cache access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::cache::PathCache;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::scope::Scope;

pub type TransformUse = dyn Fn(&str, &Node) -> Result<(String, Node)> + Send + Sync;
pub type PreEval = dyn Fn(&Node) -> Result<Node> + Send + Sync;

pub(crate) struct Inner {
    pub(crate) scopes: HashMap<String, Scope>,
    pub(crate) cache: Option<PathCache>,
    pub(crate) max_depth: usize,
    pub(crate) parallel_threshold: Option<usize>,
    pub(crate) transform_use: Option<Box<TransformUse>>,
    pub(crate) pre_eval: Option<Box<PreEval>>,
}

/// State threaded through a single top-level [`crate::evaluator::Evaluator::eval`]
/// call: the cycle stack and depth counter are per-frame; scopes and the path
/// cache are shared (read-only) with the evaluator that spawned this context.
///
/// Parallel sibling evaluation forks a context per branch, so the cycle stack
/// and depth counter use thread-safe primitives even though a single
/// unforked context is only ever driven from one thread at a time.
pub struct EvalContext {
    inner: Arc<Inner>,
    cycle_stack: RwLock<Vec<String>>,
    depth: AtomicUsize,
}

impl EvalContext {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            cycle_stack: RwLock::new(Vec::new()),
            depth: AtomicUsize::new(0),
        }
    }

    /// Produce an independent context for a parallel sibling branch, seeded
    /// with a snapshot of this frame's ancestor keys so diamond references
    /// are not falsely reported as cycles, but siblings cannot observe each
    /// other's in-flight pushes.
    pub(crate) fn fork(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cycle_stack: RwLock::new(self.cycle_stack.read().clone()),
            depth: AtomicUsize::new(self.depth.load(Ordering::Relaxed)),
        }
    }

    pub(crate) fn parallel_threshold(&self) -> Option<usize> {
        self.inner.parallel_threshold
    }

    pub(crate) fn transform_use(&self) -> Option<&TransformUse> {
        self.inner.transform_use.as_deref()
    }

    pub(crate) fn pre_eval(&self) -> Option<&PreEval> {
        self.inner.pre_eval.as_deref()
    }

    pub(crate) fn enter_frame(&self) -> Result<()> {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        if depth > self.inner.max_depth {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::depth(self.inner.max_depth));
        }
        Ok(())
    }

    pub(crate) fn exit_frame(&self) {
        self.depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Resolve `scope::path`, participating in cycle detection and the
    /// optional path cache.
    pub fn resolve_path(&self, scope: &str, path: &str) -> Result<Node> {
        let key = format!("{scope}::{path}");

        if self.cycle_stack.read().contains(&key) {
            return Err(Error::cycle(key));
        }

        if let Some(cache) = &self.inner.cache {
            if let Some(hit) = cache.get(&key) {
                trace!("path cache hit for '{key}'");
                return Ok(hit);
            }
        }
        trace!("path cache miss for '{key}'");

        let scope_provider = self
            .inner
            .scopes
            .get(scope)
            .ok_or_else(|| Error::scope(format!("scope '{scope}' is not configured")))?;

        self.cycle_stack.write().push(key.clone());
        debug!("resolving '{key}'");
        let result = scope_provider.resolve(path);
        self.cycle_stack.write().pop();

        let result = result?;

        if let Some(cache) = &self.inner.cache {
            cache.insert(key, result.clone());
        }

        Ok(result)
    }

    /// Re-evaluate `node` in the current frame, expanding any nested directives.
    pub fn eval(&self, node: &Node) -> Result<Node> {
        crate::evaluator::eval_node(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn inner_with_local(node: Node) -> Arc<Inner> {
        let mut scopes = HashMap::new();
        scopes.insert("local".to_string(), Scope::from_node(node));
        Arc::new(Inner {
            scopes,
            cache: None,
            max_depth: 20,
            parallel_threshold: None,
            transform_use: None,
            pre_eval: None,
        })
    }

    #[test]
    fn resolve_path_detects_reentrant_cycle() {
        let mut a = IndexMap::new();
        a.insert("self".to_string(), Node::from("ignored"));
        let ctx = EvalContext::new(inner_with_local(Node::Mapping(a)));
        ctx.cycle_stack.write().push("local::self".to_string());
        assert!(ctx.resolve_path("local", "self").is_err());
    }

    #[test]
    fn fork_seeds_ancestor_keys_without_sharing_future_pushes() {
        let ctx = EvalContext::new(inner_with_local(Node::Null));
        ctx.cycle_stack.write().push("local::a".to_string());
        let forked = ctx.fork();
        assert!(forked.cycle_stack.read().contains(&"local::a".to_string()));
        forked.cycle_stack.write().push("local::b".to_string());
        assert!(!ctx.cycle_stack.read().contains(&"local::b".to_string()));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let ctx = EvalContext::new(inner_with_local(Node::Null));
        for _ in 0..20 {
            ctx.enter_frame().unwrap();
        }
        assert!(ctx.enter_frame().is_err());
    }
}
