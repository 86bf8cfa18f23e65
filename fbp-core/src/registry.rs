//! Ordered name -> port-id registries, one per component per side.
//!
//! Declaration order matters for composite-graph export and for diagnostics,
//! so lookups are backed by [`indexmap::IndexMap`] rather than a hash map.

use indexmap::IndexMap;

use crate::error::{FbpError, Result};
use crate::port::PortId;

/// Ordered registry of a component's ports on one side (inputs or outputs).
#[derive(Debug, Default)]
pub struct PortRegistry {
    by_name: IndexMap<String, PortId>,
}

impl PortRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` under `name`.
    ///
    /// # Errors
    /// Returns [`FbpError::Flow`] if `name` is already registered — port
    /// names are unique per side, per component.
    pub fn insert(&mut self, name: impl Into<String>, id: PortId) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(FbpError::flow(format!("duplicate port name: {name}")));
        }
        self.by_name.insert(name, id);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<PortId> {
        self.by_name.get(name).copied()
    }

    /// Look up a port by name, or a structural error naming it if absent.
    pub fn require(&self, name: &str) -> Result<PortId> {
        self.get(name)
            .ok_or_else(|| FbpError::flow(format!("no such port: {name}")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterate ports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PortId)> {
        self.by_name.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Re-expose a port under a new name, as a composite subgraph does to
    /// surface one of its internal components' ports at the subgraph
    /// boundary. The underlying port id is shared, not duplicated.
    pub fn export(&mut self, exported_name: impl Into<String>, id: PortId) -> Result<()> {
        self.insert(exported_name, id)
    }
}
