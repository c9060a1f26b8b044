//! Process-global, append-only directive registry.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::node::Node;

pub type Validator = fn(&Node) -> Result<()>;
pub type Handler = fn(&EvalContext, &indexmap::IndexMap<String, Node>, &Node) -> Result<Node>;

#[derive(Clone, Copy)]
pub struct Descriptor {
    pub name: &'static str,
    pub validator: Validator,
    pub handler: Handler,
    pub allows_siblings: bool,
}

static REGISTRY: LazyLock<RwLock<HashMap<&'static str, Descriptor>>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for d in crate::directives::builtins() {
        map.insert(d.name, d);
    }
    RwLock::new(map)
});

/// Register a custom directive descriptor. Fails on a missing `$` prefix,
/// a missing handler, or a name that is already registered.
pub fn register(descriptor: Descriptor) -> Result<()> {
    if !descriptor.name.starts_with('$') {
        return Err(Error::structure(format!(
            "directive name '{}' must start with '$'",
            descriptor.name
        )));
    }
    let mut map = REGISTRY.write().expect("registry lock poisoned");
    if map.contains_key(descriptor.name) {
        return Err(Error::structure(format!(
            "directive '{}' is already registered",
            descriptor.name
        )));
    }
    map.insert(descriptor.name, descriptor);
    Ok(())
}

pub fn lookup(name: &str) -> Option<Descriptor> {
    let map = REGISTRY.read().expect("registry lock poisoned");
    map.get(name).copied()
}

pub fn is_registered(name: &str) -> bool {
    let map = REGISTRY.read().expect("registry lock poisoned");
    map.contains_key(name)
}

/// Test-only reset back to the three built-in directives, serialized behind
/// a mutex since the registry is process-global and tests run concurrently.
#[cfg(test)]
pub fn reset_for_tests() {
    use std::sync::Mutex;
    static RESET_LOCK: Mutex<()> = Mutex::new(());
    let _guard = RESET_LOCK.lock().expect("reset lock poisoned");
    let mut map = REGISTRY.write().expect("registry lock poisoned");
    map.clear();
    for d in crate::directives::builtins() {
        map.insert(d.name, d);
    }
}
