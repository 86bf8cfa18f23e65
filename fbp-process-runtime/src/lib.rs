//! # fbp-process-runtime
//!
//! **Process-per-component executor variant for `fbp-core`.**
//!
//! Wraps an external command as a [`fbp_core::component::Component`],
//! exchanging primitive-valued packets over length-prefixed JSON frames on
//! the child's stdin/stdout. Use this when a component needs OS-level
//! isolation (a different language runtime, a crash boundary, a sandboxed
//! dependency) rather than running in-process with the rest of the graph.
//!
//! ```toml
//! [dependencies]
//! fbp-process-runtime = { version = "0.1" }
//! ```
//!
//! A child binary drives [`worker::run_worker`] from `main` to speak the
//! other side of the same protocol.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

mod codec;
mod process_component;
mod value;
pub mod worker;

pub use process_component::ProcessComponent;
pub use value::WireValue;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::process_component::ProcessComponent;
    pub use crate::value::WireValue;
    pub use crate::worker::run_worker;
}
