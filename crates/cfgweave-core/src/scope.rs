//! Read-only named data sources consulted by `resolve_path`.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::node::Node;

/// External collaborator that supplies data for the `resource` scope.
///
/// Implementations may block (file or network I/O) and must be safe for
/// concurrent invocation.
pub trait ResourceResolver: Send + Sync {
    fn resolve(&self, resource_type: &str, selector: &str) -> Result<Node>;
}

/// A single named, immutable data source. The canonical JSON form is computed
/// once on first access and memoized for the evaluator's lifetime.
pub(crate) enum Scope {
    Static {
        node: Node,
        serialized: OnceLock<serde_json::Value>,
    },
    Resource(Box<dyn ResourceResolver>),
}

impl Scope {
    pub(crate) fn from_node(node: Node) -> Self {
        Scope::Static {
            node,
            serialized: OnceLock::new(),
        }
    }

    pub(crate) fn from_resolver(resolver: Box<dyn ResourceResolver>) -> Self {
        Scope::Resource(resolver)
    }

    /// Resolve `path` against this scope.
    ///
    /// For `Static` scopes, `path` is evaluated via the dotted/index/wildcard
    /// grammar against the memoized serialized form. For `Resource` scopes,
    /// `path` is `<type>::<selector>`, split once and delegated.
    pub(crate) fn resolve(&self, path: &str) -> Result<Node> {
        if path.is_empty() {
            return Err(Error::path("empty path"));
        }
        match self {
            Scope::Static { node, serialized } => {
                let json = serialized.get_or_init(|| node.to_canonical_json());
                let result = crate::path::evaluate(json, path)?;
                Ok(Node::from_canonical_json(result))
            }
            Scope::Resource(resolver) => {
                let mut parts = path.splitn(2, "::");
                let resource_type = parts.next().unwrap_or_default();
                let selector = parts
                    .next()
                    .ok_or_else(|| Error::scope("resource selector missing '::type::selector'"))?;
                if selector.contains("::") {
                    return Err(Error::scope(format!(
                        "ambiguous resource selector '{selector}': contains '::'"
                    )));
                }
                if resource_type.is_empty() || selector.is_empty() {
                    return Err(Error::scope("empty resource type or selector"));
                }
                resolver.resolve(resource_type, selector)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use indexmap::IndexMap;

    #[test]
    fn static_scope_resolves_dotted_path() {
        let mut db = IndexMap::new();
        db.insert("host".to_string(), Node::from("h"));
        let mut root = IndexMap::new();
        root.insert("db".to_string(), Node::Mapping(db));
        let scope = Scope::from_node(Node::Mapping(root));
        assert_eq!(scope.resolve("db.host").unwrap(), Node::from("h"));
    }

    struct EchoResolver;
    impl ResourceResolver for EchoResolver {
        fn resolve(&self, resource_type: &str, selector: &str) -> Result<Node> {
            Ok(Node::String(format!("{resource_type}:{selector}")))
        }
    }

    #[test]
    fn resource_scope_splits_once_on_double_colon() {
        let scope = Scope::from_resolver(Box::new(EchoResolver));
        assert_eq!(
            scope.resolve("file::config.yaml").unwrap(),
            Node::String("file:config.yaml".into())
        );
    }

    #[test]
    fn resource_scope_rejects_ambiguous_selector() {
        let scope = Scope::from_resolver(Box::new(EchoResolver));
        assert!(scope.resolve("file::a::b").is_err());
    }
}
