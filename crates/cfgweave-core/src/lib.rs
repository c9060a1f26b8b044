//! Directive-evaluation engine for composing configuration trees.
//!
//! Parses a document into a [`Node`] tree and expands `$ref`, `$use`, and
//! `$merge` directives against named [scopes](scope), producing a new tree
//! with no directives remaining.

pub mod cache;
pub mod context;
mod directives;
pub mod error;
pub mod merge;
mod node;
pub mod path;
mod process;
pub mod registry;
pub mod scope;

mod evaluator;

pub use context::EvalContext;
pub use error::{Error, ErrorKind, Result};
pub use evaluator::Evaluator;
pub use node::Node;
pub use process::{process, process_path, process_reader, process_with_evaluator, EvaluatorBuilder};
pub use registry::{register, Descriptor};
pub use scope::ResourceResolver;
