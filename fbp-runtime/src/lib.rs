//! # fbp-runtime
//!
//! A small, async flow-based programming runtime.
//!
//! ## Architecture
//!
//! Structured the way the engine this was built from structures a messaging
//! stack: a runtime-agnostic kernel plus a thin public facade.
//!
//! - **`fbp-core`**: packets, ports, components, graph, executor, scheduler
//! - **`fbp-runtime`** (this crate): built-in component library + CLI demo
//! - **`fbp-process-runtime`** (optional, `process` feature): an executor
//!   variant that runs each component as its own OS process
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fbp_core::prelude::*;
//! use fbp_runtime::components::{Generate, Sink};
//!
//! # async fn example() -> Result<()> {
//! let mut graph = GraphBuilder::new();
//! let gen = graph.add_component("Gen", Box::new(Generate::new([1_i64, 2, 3])))?;
//! let sink = graph.add_component("Sink", Box::new(Sink))?;
//! graph.connect(gen, "OUT", sink, "IN")?;
//!
//! let executor = Arc::new(Executor::new(graph.freeze(), Arc::new(CompioScheduler::new())));
//! let errors = executor.run().await;
//! assert!(errors.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

pub use fbp_core::prelude;
pub use fbp_core::{component, connection, error, executor, graph, packet, port, registry, scheduler, state};

pub mod components;

#[cfg(feature = "process")]
pub use fbp_process_runtime as process;
