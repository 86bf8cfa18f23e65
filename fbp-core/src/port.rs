//! Ports: named endpoints attached to exactly one component.
//!
//! `PortRecord` is pure metadata — name, optionality, allowed types, open/closed
//! flag, bracket depth. The actual bounded queue backing a connected input
//! port lives in [`crate::connection::Connection`], looked up by the input
//! port's id, per invariant I5 (a connection has a bounded queue iff its
//! target port declares `max_queue_size`).

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::component::ComponentId;
use crate::packet::AttrValue;

slotmap::new_key_type! {
    /// Stable identifier for a port, valid for the lifetime of the graph it
    /// belongs to.
    pub struct PortId;
}

/// Which side of a component a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    Input,
    Output,
}

/// Declarative description of a port, built with [`initialize`](crate::component::Component::initialize)
/// via `inputs.add(name, spec)` / `outputs.add(name, spec)`.
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) optional: bool,
    pub(crate) allowed_types: HashSet<TypeId>,
    pub(crate) default: Option<AttrValue>,
    pub(crate) max_queue_size: Option<usize>,
}

impl PortSpec {
    /// A required port with no type restriction.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            optional: false,
            allowed_types: HashSet::new(),
            default: None,
            max_queue_size: None,
        }
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn allows<T: 'static>(mut self) -> Self {
        self.allowed_types.insert(TypeId::of::<T>());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: AttrValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Bound for the inbound buffer (inputs only; ignored on outputs).
    #[must_use]
    pub fn max_queue_size(mut self, n: usize) -> Self {
        self.max_queue_size = Some(n);
        self
    }

    #[must_use]
    pub fn supports_type(&self, type_id: TypeId) -> bool {
        self.allowed_types.is_empty() || self.allowed_types.contains(&type_id)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runtime record for a single port: metadata plus the mutable open/closed
/// flag and (for outputs) the bracket-depth counter.
///
/// Wiring fields (`source`/`target`) are fixed at graph-build time and never
/// mutated after `freeze()`, so they need no synchronization.
#[derive(Debug)]
pub struct PortRecord {
    pub owner: ComponentId,
    pub side: PortSide,
    pub spec: PortSpec,
    is_open: AtomicBool,
    bracket_depth: AtomicI64,
    /// Input: the upstream output port (or IIP output) feeding this port.
    pub source: Option<PortId>,
    /// Output: the downstream input port this output feeds.
    pub target: Option<PortId>,
}

impl PortRecord {
    pub(crate) fn new(owner: ComponentId, side: PortSide, spec: PortSpec) -> Self {
        Self {
            owner,
            side,
            spec,
            is_open: AtomicBool::new(true),
            bracket_depth: AtomicI64::new(0),
            source: None,
            target: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        match self.side {
            PortSide::Input => self.source.is_some(),
            PortSide::Output => self.target.is_some(),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Acquire)
    }

    /// Mark the port closed. Idempotent.
    pub fn close(&self) {
        self.is_open.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn bracket_depth(&self) -> i64 {
        self.bracket_depth.load(Ordering::Relaxed)
    }

    pub(crate) fn enter_bracket(&self) {
        self.bracket_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the depth *after* decrementing, so callers can detect the
    /// "closed too many times" case (I6: depth must return to zero).
    pub(crate) fn exit_bracket(&self) -> i64 {
        self.bracket_depth.fetch_sub(1, Ordering::Relaxed) - 1
    }

    #[must_use]
    pub fn id_string(&self, component_name: &str) -> String {
        format!("{component_name}.{}", self.spec.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowed_types_means_any() {
        let spec = PortSpec::new("IN");
        assert!(spec.supports_type(TypeId::of::<i32>()));
        assert!(spec.supports_type(TypeId::of::<String>()));
    }

    #[test]
    fn restricted_allowed_types_gate_the_boundary() {
        let spec = PortSpec::new("IN").allows::<i32>();
        assert!(spec.supports_type(TypeId::of::<i32>()));
        assert!(!spec.supports_type(TypeId::of::<String>()));
    }

    #[test]
    fn bracket_depth_tracks_nesting() {
        let owner = ComponentId::default();
        let rec = PortRecord::new(owner, PortSide::Output, PortSpec::new("OUT"));
        rec.enter_bracket();
        rec.enter_bracket();
        assert_eq!(rec.bracket_depth(), 2);
        assert_eq!(rec.exit_bracket(), 1);
        assert_eq!(rec.exit_bracket(), 0);
    }
}
