//! File and HTTP resource resolvers for the `resource` scope.
//!
//! Both resolvers are ordinary consumers of
//! [`cfgweave_core::ResourceResolver`]; neither is known to the core crate.
//!
//! ## File resolver
//!
//! ```yaml
//! config:
//!   $ref: "resource::file::app.yaml"
//! ```
//!
//! ## HTTP resolver (feature = "http")
//!
//! ```yaml
//! config:
//!   $ref: "resource::json::https://config.internal/app.json"
//! ```

mod file;

#[cfg(feature = "http")]
mod http;

pub use file::FileResolver;

#[cfg(feature = "http")]
pub use http::HttpResolver;
