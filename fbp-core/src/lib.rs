//! FBP Core
//!
//! Runtime-agnostic flow-based programming execution kernel:
//! - Packets and bracket (control) markers (`packet`)
//! - Component lifecycle state machine (`state`)
//! - Ports, port registries, and connections (`port`, `registry`, `connection`)
//! - Component trait and runtime bookkeeping (`component`)
//! - Graph construction and frozen topology (`graph`)
//! - The executor that drives components to completion (`executor`)
//! - Pluggable scheduling (`scheduler`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::needless_pass_by_ref_mut)]
#![allow(clippy::match_same_arms)]

pub mod component;
pub mod connection;
pub mod error;
pub mod executor;
pub mod graph;
pub mod packet;
pub mod port;
pub mod registry;
pub mod scheduler;
pub mod state;

/// A small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::component::{Component, ComponentId, ComponentRuntime};
    pub use crate::connection::Connection;
    pub use crate::error::{FbpError, Result};
    pub use crate::executor::{Activity, Executor};
    pub use crate::graph::{FrozenGraph, GraphBuilder};
    pub use crate::packet::{AttrValue, ControlTag, Packet};
    pub use crate::port::{PortId, PortSide, PortSpec};
    pub use crate::registry::PortRegistry;
    pub use crate::scheduler::{CompioScheduler, Scheduler};
    pub use crate::state::ComponentState;
}
