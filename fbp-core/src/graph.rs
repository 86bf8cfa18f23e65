//! Graph construction and the frozen topology the executor runs against.
//!
//! `GraphBuilder` is mutable and is where `add_component`/`connect`/
//! `set_initial_packet` live. Per the design notes, mutation is only legal
//! before the graph starts running: `freeze()` consumes the builder and
//! hands back a [`FrozenGraph`] with no further mutation API, so there is no
//! way to reach a connect-while-running race at the type level.

use std::any::Any;

use async_trait::async_trait;
use slotmap::{SecondaryMap, SlotMap};

use crate::component::{Component, ComponentId};
use crate::connection::Connection;
use crate::error::{FbpError, Result};
use crate::executor::Activity;
use crate::packet::{AttrValue, Packet};
use crate::port::{PortId, PortRecord, PortSide, PortSpec};
use crate::registry::PortRegistry;

pub(crate) struct ComponentEntry {
    pub name: String,
    /// Taken by the executor when the component's task is spawned — `None`
    /// afterward for the lifetime of the run.
    pub behavior: parking_lot::Mutex<Option<Box<dyn Component>>>,
    pub inputs: PortRegistry,
    pub outputs: PortRegistry,
    pub keepalive: bool,
}

/// Mutable graph under construction.
#[derive(Default)]
pub struct GraphBuilder {
    pub(crate) components: SlotMap<ComponentId, ComponentEntry>,
    pub(crate) ports: SlotMap<PortId, PortRecord>,
    by_name: hashbrown::HashMap<String, ComponentId>,
    /// Target input port -> the synthetic IIP generator feeding it, so
    /// `unset_initial_packet` can find and remove exactly that component.
    iip_sources: hashbrown::HashMap<PortId, ComponentId>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, running its `initialize` to let it declare ports.
    ///
    /// # Errors
    /// Returns [`FbpError::Flow`] if `name` is already in use, or whatever
    /// `initialize` itself returns (a bad port declaration, for instance).
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        mut behavior: Box<dyn Component>,
    ) -> Result<ComponentId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(FbpError::flow(format!("duplicate component name: {name}")));
        }

        let keepalive_placeholder = self.components.insert(ComponentEntry {
            name: name.clone(),
            behavior: parking_lot::Mutex::new(Some(Box::new(NoopComponent))),
            inputs: PortRegistry::new(),
            outputs: PortRegistry::new(),
            keepalive: false,
        });

        let mut activity = Activity::new(keepalive_placeholder, &mut self.ports);
        let init_result = behavior.initialize(&mut activity);
        let (inputs, outputs) = activity.into_registries();

        let entry = self
            .components
            .get_mut(keepalive_placeholder)
            .expect("just inserted");
        entry.inputs = inputs;
        entry.outputs = outputs;
        *entry.behavior.get_mut() = Some(behavior);

        if let Err(err) = init_result {
            self.components.remove(keepalive_placeholder);
            return Err(err);
        }

        self.by_name.insert(name, keepalive_placeholder);
        Ok(keepalive_placeholder)
    }

    /// Mark a component's task as kept alive once its declared inputs have
    /// all reached end-of-stream (generators and other self-starters).
    pub fn set_keepalive(&mut self, component: ComponentId, keepalive: bool) -> Result<()> {
        let entry = self
            .components
            .get_mut(component)
            .ok_or_else(|| FbpError::flow("no such component"))?;
        entry.keepalive = keepalive;
        Ok(())
    }

    fn port_of(
        &self,
        component: ComponentId,
        side: PortSide,
        name: &str,
    ) -> Result<PortId> {
        let entry = self
            .components
            .get(component)
            .ok_or_else(|| FbpError::flow("no such component"))?;
        let registry = match side {
            PortSide::Input => &entry.inputs,
            PortSide::Output => &entry.outputs,
        };
        registry.require(name)
    }

    /// Wire `source`'s output port to `target`'s input port.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if either port does not exist, the input port
    /// already has a source (I1 — an input port has at most one upstream),
    /// or the output port already has a target.
    pub fn connect(
        &mut self,
        source: ComponentId,
        source_port: &str,
        target: ComponentId,
        target_port: &str,
    ) -> Result<()> {
        let out_id = self.port_of(source, PortSide::Output, source_port)?;
        let in_id = self.port_of(target, PortSide::Input, target_port)?;

        if self.ports[out_id].target.is_some() {
            return Err(FbpError::flow(format!(
                "output port {source_port} already connected"
            )));
        }
        if self.ports[in_id].source.is_some() {
            return Err(FbpError::flow(format!(
                "input port {target_port} already has a source"
            )));
        }

        self.ports[out_id].target = Some(in_id);
        self.ports[in_id].source = Some(out_id);
        Ok(())
    }

    /// Tear down an existing connection, given either end of it. Both the
    /// output's `target` and the input's `source` are cleared.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if `port` does not exist or is not connected.
    pub fn disconnect(&mut self, component: ComponentId, side: PortSide, port: &str) -> Result<()> {
        let port_id = self.port_of(component, side, port)?;
        let other = match side {
            PortSide::Output => self.ports[port_id].target.take(),
            PortSide::Input => self.ports[port_id].source.take(),
        };
        let Some(other_id) = other else {
            return Err(FbpError::flow(format!("port {port} is not connected")));
        };
        match side {
            PortSide::Output => self.ports[other_id].source = None,
            PortSide::Input => self.ports[other_id].target = None,
        }
        Ok(())
    }

    /// Feed `value` into `target_port` once, ahead of any live connection,
    /// via a synthetic self-starting generator component — the IIP pattern.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if the target port already has a source.
    pub fn set_initial_packet<T: Any + Send>(
        &mut self,
        target: ComponentId,
        target_port: &str,
        value: T,
    ) -> Result<()> {
        let in_id = self.port_of(target, PortSide::Input, target_port)?;
        if self.ports[in_id].source.is_some() {
            return Err(FbpError::flow(format!(
                "input port {target_port} already has a source"
            )));
        }

        let target_name = self.components[target].name.clone();
        let iip_name = format!("{target_name}.{target_port}#iip");
        let iip_id = self.add_component(iip_name, Box::new(IipGenerator::new(value)))?;
        let out_id = self.port_of(iip_id, PortSide::Output, IipGenerator::<T>::PORT_NAME)?;

        self.ports[out_id].target = Some(in_id);
        self.ports[in_id].source = Some(out_id);
        self.set_keepalive(iip_id, false)?;
        self.iip_sources.insert(in_id, iip_id);
        Ok(())
    }

    /// Remove a previously attached initial packet, undoing
    /// [`GraphBuilder::set_initial_packet`]: the synthetic generator
    /// component is deleted and the target port goes back to unconnected.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if `target_port` has no initial packet attached.
    pub fn unset_initial_packet(&mut self, target: ComponentId, target_port: &str) -> Result<()> {
        let in_id = self.port_of(target, PortSide::Input, target_port)?;
        let Some(iip_id) = self.iip_sources.remove(&in_id) else {
            return Err(FbpError::flow(format!(
                "port {target_port} has no initial packet attached"
            )));
        };

        if let Some(entry) = self.components.remove(iip_id) {
            for (_, port_id) in entry.outputs.iter() {
                self.ports.remove(port_id);
            }
            self.by_name.remove(&entry.name);
        }
        self.ports[in_id].source = None;
        Ok(())
    }

    /// Add a composite component: a bookkeeping node with no ports of its
    /// own until [`GraphBuilder::export_input`]/[`GraphBuilder::export_output`]
    /// alias some of its children's ports onto it. The children are ordinary
    /// components added to this same builder beforehand — a composite is a
    /// naming/export boundary, not a nested executor.
    ///
    /// # Errors
    /// Returns [`FbpError::Flow`] if `name` is already in use.
    pub fn add_composite(&mut self, name: impl Into<String>) -> Result<ComponentId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(FbpError::flow(format!("duplicate component name: {name}")));
        }
        let id = self.components.insert(ComponentEntry {
            name: name.clone(),
            behavior: parking_lot::Mutex::new(Some(Box::new(CompositeComponent))),
            inputs: PortRegistry::new(),
            outputs: PortRegistry::new(),
            keepalive: false,
        });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Surface `child`'s input port `child_port` as `name` on `composite`, so
    /// a sibling elsewhere in the graph can `connect` straight to it without
    /// knowing `child` exists. The proxy port is the same [`PortId`] as the
    /// child's own port — sends routed to it land directly in the child's
    /// queue, per the port registry's `export`.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if either component or port is missing, or if
    /// `child_port` is already connected (exporting a connected port is a
    /// structural error — the parent wiring and any existing connection would
    /// conflict over the same port).
    pub fn export_input(
        &mut self,
        composite: ComponentId,
        name: &str,
        child: ComponentId,
        child_port: &str,
    ) -> Result<()> {
        let child_id = self.port_of(child, PortSide::Input, child_port)?;
        if self.ports[child_id].source.is_some() {
            return Err(FbpError::flow(format!(
                "cannot export already-connected input port {child_port}"
            )));
        }
        let entry = self
            .components
            .get_mut(composite)
            .ok_or_else(|| FbpError::flow("no such component"))?;
        entry.inputs.export(name, child_id)
    }

    /// Surface `child`'s output port `child_port` as `name` on `composite`.
    /// See [`GraphBuilder::export_input`].
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if either component or port is missing, or if
    /// `child_port` is already connected.
    pub fn export_output(
        &mut self,
        composite: ComponentId,
        name: &str,
        child: ComponentId,
        child_port: &str,
    ) -> Result<()> {
        let child_id = self.port_of(child, PortSide::Output, child_port)?;
        if self.ports[child_id].target.is_some() {
            return Err(FbpError::flow(format!(
                "cannot export already-connected output port {child_port}"
            )));
        }
        let entry = self
            .components
            .get_mut(composite)
            .ok_or_else(|| FbpError::flow("no such component"))?;
        entry.outputs.export(name, child_id)
    }

    /// For every optional, unconnected input on `component` that declares a
    /// [`PortSpec::default_value`], install it as an initial packet.
    ///
    /// # Errors
    /// A [`FbpError::Flow`] if `component` does not exist.
    pub fn set_port_defaults(&mut self, component: ComponentId) -> Result<()> {
        let entry = self
            .components
            .get(component)
            .ok_or_else(|| FbpError::flow("no such component"))?;

        let candidates: Vec<(String, AttrValue)> = entry
            .inputs
            .iter()
            .filter_map(|(name, port_id)| {
                let port = &self.ports[port_id];
                if port.source.is_some() || !port.spec.optional {
                    return None;
                }
                port.spec.default.clone().map(|default| (name.to_string(), default))
            })
            .collect();

        for (name, default) in candidates {
            match default {
                AttrValue::Bool(v) => self.set_initial_packet(component, &name, v)?,
                AttrValue::Int(v) => self.set_initial_packet(component, &name, v)?,
                AttrValue::Float(v) => self.set_initial_packet(component, &name, v)?,
                AttrValue::Text(v) => self.set_initial_packet(component, &name, v)?,
            }
        }
        Ok(())
    }

    /// Consume the builder, producing the immutable topology the executor
    /// drives. No further structural mutation is possible on the result.
    #[must_use]
    pub fn freeze(self) -> FrozenGraph {
        let mut connections: SecondaryMap<PortId, Connection> = SecondaryMap::new();

        for (port_id, port) in &self.ports {
            if port.side != PortSide::Input {
                continue;
            }
            let Some(source) = port.source else { continue };
            let conn = match port.spec.max_queue_size {
                Some(n) => Connection::bounded(source, port_id, n),
                None => Connection::unbounded(source, port_id),
            };
            connections.insert(port_id, conn);
        }

        FrozenGraph {
            components: self.components,
            ports: self.ports,
            connections,
        }
    }
}

/// Immutable topology handed to the executor. No API on this type mutates
/// structure — only [`crate::port::PortRecord::close`] and the bracket
/// counters change at runtime, and both are internally synchronized.
pub struct FrozenGraph {
    pub(crate) components: SlotMap<ComponentId, ComponentEntry>,
    pub(crate) ports: SlotMap<PortId, PortRecord>,
    pub(crate) connections: SecondaryMap<PortId, Connection>,
}

impl FrozenGraph {
    #[must_use]
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.keys().collect()
    }

    #[must_use]
    pub fn component_name(&self, id: ComponentId) -> &str {
        &self.components[id].name
    }

    #[must_use]
    pub fn keepalive(&self, id: ComponentId) -> bool {
        self.components[id].keepalive
    }

    /// Take ownership of a component's behavior for the duration of its
    /// run. Returns `None` if already taken (the executor calls this once
    /// per component, at task-spawn time).
    pub(crate) fn take_behavior(&self, id: ComponentId) -> Option<Box<dyn Component>> {
        self.components[id].behavior.lock().take()
    }

    pub(crate) fn connection(&self, input_port: PortId) -> Option<&Connection> {
        self.connections.get(input_port)
    }

    pub(crate) fn port(&self, id: PortId) -> Option<&PortRecord> {
        self.ports.get(id)
    }

    #[must_use]
    pub fn inputs(&self, id: ComponentId) -> &PortRegistry {
        &self.components[id].inputs
    }

    #[must_use]
    pub fn outputs(&self, id: ComponentId) -> &PortRegistry {
        &self.components[id].outputs
    }

    /// Components with no declared inputs (or `keepalive` set) — the set the
    /// executor starts running immediately rather than waiting on upstream.
    #[must_use]
    pub fn self_starters(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, entry)| entry.inputs.is_empty() || entry.keepalive)
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn get_upstream(&self, input_port: PortId) -> Option<PortId> {
        self.ports.get(input_port).and_then(|p| p.source)
    }

    #[must_use]
    pub fn get_downstream(&self, output_port: PortId) -> Option<PortId> {
        self.ports.get(output_port).and_then(|p| p.target)
    }

    /// Whether no further packets can ever arrive on `input_port`: it has no
    /// source (never connected) or the upstream output is closed and the
    /// queue between them has drained.
    #[must_use]
    pub fn is_upstream_terminated(&self, input_port: PortId) -> bool {
        let Some(source) = self.get_upstream(input_port) else {
            return true;
        };
        let source_closed = self.ports.get(source).is_none_or(|p| !p.is_open());
        let queue_empty = self
            .connections
            .get(input_port)
            .is_none_or(Connection::is_empty);
        source_closed && queue_empty
    }
}

struct NoopComponent;

#[async_trait]
impl Component for NoopComponent {
    async fn run(&mut self, _activity: &mut Activity) -> Result<()> {
        Ok(())
    }
}

/// Behavior for a composite graph's bookkeeping node (see
/// [`GraphBuilder::add_composite`]): its ports are all aliases onto real
/// children, so it has no work of its own and terminates as soon as it runs.
struct CompositeComponent;

#[async_trait]
impl Component for CompositeComponent {
    async fn run(&mut self, _activity: &mut Activity) -> Result<()> {
        Ok(())
    }
}

/// Self-starting component that sends one value then terminates — the IIP
/// pattern, grounded on `pflow`'s `InitialPacketGenerator`.
struct IipGenerator<T> {
    value: Option<T>,
}

impl<T> IipGenerator<T> {
    const PORT_NAME: &'static str = "OUT";

    const fn new(value: T) -> Self {
        Self { value: Some(value) }
    }
}

#[async_trait]
impl<T: Any + Send> Component for IipGenerator<T> {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_output(Self::PORT_NAME, PortSpec::new(Self::PORT_NAME))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        if let Some(value) = self.value.take() {
            activity.send(Self::PORT_NAME, Packet::new_value(value, activity.id())).await?;
        }
        Ok(())
    }
}
