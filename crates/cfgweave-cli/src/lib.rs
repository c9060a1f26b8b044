//! cfgweave CLI library
//!
//! Exposes the CLI entry point so other front-ends (tests, alternate
//! binaries) can invoke it without going through `main`.

mod cli;

pub use cli::run;
