//! Sandboxed file-backed resource resolver.

use std::path::{Component, Path, PathBuf};

use cfgweave_core::{Error, Node, ResourceResolver, Result};

/// Reads YAML/JSON/text files from a sandboxed root directory.
///
/// Rejects absolute selectors and any selector whose `..` segments would
/// escape `root`, before ever touching the filesystem.
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve_within_sandbox(&self, selector: &str) -> Result<PathBuf> {
        let requested = Path::new(selector);
        if requested.is_absolute() {
            return Err(Error::hook(format!(
                "file selector '{selector}' must be relative"
            )));
        }
        if requested
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(Error::hook(format!(
                "file selector '{selector}' escapes its sandbox root"
            )));
        }
        Ok(self.root.join(requested))
    }
}

impl ResourceResolver for FileResolver {
    fn resolve(&self, _resource_type: &str, selector: &str) -> Result<Node> {
        let path = self.resolve_within_sandbox(selector)?;
        let bytes = std::fs::read(&path)
            .map_err(|e| Error::hook(format!("failed to read '{}': {e}", path.display())))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") | Some("json") => {
                let value: serde_yaml::Value = serde_yaml::from_slice(&bytes).map_err(|e| {
                    Error::hook(format!("failed to parse '{}': {e}", path.display()))
                })?;
                Ok(Node::from(value))
            }
            _ => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    Error::hook(format!("'{}' is not valid UTF-8: {e}", path.display()))
                })?;
                Ok(Node::String(text))
            }
        }
    }
}
