//! Public entry points: `process*` convenience wrappers and the
//! `EvaluatorBuilder` construction surface.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::cache::PathCache;
use crate::context::{Inner, PreEval, TransformUse};
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::node::Node;
use crate::scope::{ResourceResolver, Scope};

/// Builds an [`Evaluator`] from scopes and options.
pub struct EvaluatorBuilder {
    scopes: HashMap<String, Scope>,
    cache_enabled: bool,
    cache: Option<PathCache>,
    max_depth: usize,
    parallel_threshold: Option<usize>,
    transform_use: Option<Box<TransformUse>>,
    pre_eval: Option<Box<PreEval>>,
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        Self {
            scopes: HashMap::new(),
            cache_enabled: false,
            cache: None,
            max_depth: 20,
            parallel_threshold: None,
            transform_use: None,
            pre_eval: None,
        }
    }
}

impl EvaluatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_scope(mut self, node: Node) -> Self {
        self.scopes.insert("local".to_string(), Scope::from_node(node));
        self
    }

    pub fn with_global_scope(mut self, node: Node) -> Self {
        self.scopes.insert("global".to_string(), Scope::from_node(node));
        self
    }

    /// Register additional named scopes beyond `local`/`global`.
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = (String, Node)>) -> Self {
        for (name, node) in scopes {
            self.scopes.insert(name, Scope::from_node(node));
        }
        self
    }

    /// Wire the `resource` scope to an external collaborator.
    pub fn with_resource_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.scopes
            .insert("resource".to_string(), Scope::from_resolver(Box::new(resolver)));
        self
    }

    pub fn with_transform_use<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Node) -> Result<(String, Node)> + Send + Sync + 'static,
    {
        self.transform_use = Some(Box::new(f));
        self
    }

    pub fn with_pre_eval<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node) -> Result<Node> + Send + Sync + 'static,
    {
        self.pre_eval = Some(Box::new(f));
        self
    }

    /// Enable the default-sized path cache without supplying one explicitly.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Supply a pre-sized path cache; implies caching is enabled.
    pub fn with_cache(mut self, cache: PathCache) -> Self {
        self.cache = Some(cache);
        self.cache_enabled = true;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> Evaluator {
        let cache = match (self.cache, self.cache_enabled) {
            (Some(cache), _) => Some(cache),
            (None, true) => Some(PathCache::default()),
            (None, false) => None,
        };
        Evaluator::from_inner(Inner {
            scopes: self.scopes,
            cache,
            max_depth: self.max_depth,
            parallel_threshold: self.parallel_threshold,
            transform_use: self.transform_use,
            pre_eval: self.pre_eval,
        })
    }
}

fn parse(bytes: &[u8]) -> Result<Node> {
    let value: serde_yaml::Value = serde_yaml::from_slice(bytes)
        .map_err(|e| Error::syntax(format!("failed to parse input: {e}")))?;
    Ok(Node::from(value))
}

/// Reuse a prepared evaluator so its path cache and pre-serialized scopes
/// amortize across many documents.
pub fn process_with_evaluator(input: &Node, evaluator: &Evaluator) -> Result<Node> {
    evaluator.eval(input)
}

/// Parse `bytes` (YAML or JSON; JSON is valid YAML) and run a one-shot
/// evaluation with a freshly built evaluator.
pub fn process(bytes: &[u8], builder: EvaluatorBuilder) -> Result<Node> {
    let node = parse(bytes)?;
    let evaluator = builder.build();
    evaluator.eval(&node)
}

pub fn process_reader<R: Read>(mut reader: R, builder: EvaluatorBuilder) -> Result<Node> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::syntax(format!("failed to read input: {e}")))?;
    process(&bytes, builder)
}

pub fn process_path<P: AsRef<Path>>(path: P, builder: EvaluatorBuilder) -> Result<Node> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| Error::syntax(format!("failed to read '{}': {e}", path.as_ref().display())))?;
    process(&bytes, builder)
}
