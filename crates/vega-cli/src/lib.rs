//! Library wrapper around the `vega` CLI implementation.
//!
//! The CLI is primarily exercised via its binary (`src/main.rs`) and
//! integration tests, but `cargo test -p vega-cli --lib` is a cheap typecheck
//! of the CLI code without building the binary test suite. Compiling the
//! binary crate root as a module keeps that workflow working.
//!
//! Note: `fn main()` inside `main.rs` is just another function when compiled
//! as a module.

#[allow(dead_code)]
#[path = "main.rs"]
mod main_bin;
