//! The executor: drives every component in a frozen graph to completion.
//!
//! One task per component (spawned on the configured [`Scheduler`]), talking
//! to its neighbors purely through port names resolved against the shared
//! [`FrozenGraph`] — no component ever holds a reference to another. A
//! component's `run` is handed an [`Activity`], the only handle it gets on
//! the outside world: port declaration during `initialize`, send/receive
//! during `run`.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::Mutex;
use slotmap::{SecondaryMap, SlotMap};

use crate::component::{ComponentId, ComponentRuntime};
use crate::error::{FbpError, Result};
use crate::graph::FrozenGraph;
use crate::packet::{ControlTag, Packet};
use crate::port::{PortId, PortRecord, PortSide, PortSpec};
use crate::registry::PortRegistry;
use crate::scheduler::Scheduler;
use crate::state::ComponentState;

/// The handle a [`crate::component::Component`] uses to declare ports
/// (build time) and to move packets (run time). Which operations are valid
/// depends on which phase the graph is in; calling the wrong one returns a
/// [`FbpError::Flow`] rather than panicking.
pub struct Activity<'a> {
    id: ComponentId,
    mode: ActivityMode<'a>,
}

enum ActivityMode<'a> {
    Building {
        ports: &'a mut SlotMap<PortId, PortRecord>,
        inputs: PortRegistry,
        outputs: PortRegistry,
    },
    Running {
        exec: &'a Executor,
    },
}

impl<'a> Activity<'a> {
    pub(crate) fn new(id: ComponentId, ports: &'a mut SlotMap<PortId, PortRecord>) -> Self {
        Self {
            id,
            mode: ActivityMode::Building {
                ports,
                inputs: PortRegistry::new(),
                outputs: PortRegistry::new(),
            },
        }
    }

    pub(crate) const fn for_run(id: ComponentId, exec: &'a Executor) -> Self {
        Self { id, mode: ActivityMode::Running { exec } }
    }

    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Declare an input port. Valid only during `initialize`.
    pub fn add_input(&mut self, name: impl Into<String>, spec: PortSpec) -> Result<()> {
        match &mut self.mode {
            ActivityMode::Building { ports, inputs, .. } => {
                let id = ports.insert(PortRecord::new(self.id, PortSide::Input, spec));
                inputs.insert(name, id)
            }
            ActivityMode::Running { .. } => {
                Err(FbpError::flow("ports may only be declared during initialize"))
            }
        }
    }

    /// Declare an output port. Valid only during `initialize`.
    pub fn add_output(&mut self, name: impl Into<String>, spec: PortSpec) -> Result<()> {
        match &mut self.mode {
            ActivityMode::Building { ports, outputs, .. } => {
                let id = ports.insert(PortRecord::new(self.id, PortSide::Output, spec));
                outputs.insert(name, id)
            }
            ActivityMode::Running { .. } => {
                Err(FbpError::flow("ports may only be declared during initialize"))
            }
        }
    }

    pub(crate) fn into_registries(self) -> (PortRegistry, PortRegistry) {
        match self.mode {
            ActivityMode::Building { inputs, outputs, .. } => (inputs, outputs),
            ActivityMode::Running { .. } => (PortRegistry::new(), PortRegistry::new()),
        }
    }

    fn exec(&self) -> Result<&'a Executor> {
        match self.mode {
            ActivityMode::Running { exec } => Ok(exec),
            ActivityMode::Building { .. } => {
                Err(FbpError::flow("send/receive are only valid while running"))
            }
        }
    }

    /// Send a packet out `port`, blocking if the downstream queue is full
    /// (I5 backpressure) or the port is not yet connected.
    ///
    /// # Errors
    /// [`FbpError::PortClosed`] if the port (or its downstream) is closed,
    /// a port error if the port is required but unconnected, a port error
    /// if a bracket-close packet would drive the nesting depth below zero,
    /// or [`FbpError::Cancelled`] if some other component has since errored
    /// and termination was requested.
    pub async fn send(&self, port: &str, packet: Packet) -> Result<()> {
        let exec = self.exec()?;
        let port_id = exec.graph.outputs(self.id).require(port)?;
        self.send_to_port(exec, port_id, packet).await
    }

    async fn send_to_port(&self, exec: &Executor, port_id: PortId, packet: Packet) -> Result<()> {
        let record = exec
            .graph
            .port(port_id)
            .ok_or_else(|| FbpError::flow("no such port"))?;
        let label = record.id_string(&exec.component_name(self.id));

        if !record.is_open() {
            return Err(FbpError::PortClosed(label));
        }

        let Some(target) = record.target else {
            return if record.spec.optional {
                exec.account_released(self.id);
                Ok(())
            } else {
                Err(FbpError::port(label, "output port is not connected"))
            };
        };

        if let Some(tag) = packet.control_tag() {
            match tag {
                ControlTag::StartSubStream | ControlTag::StartMap => record.enter_bracket(),
                ControlTag::EndSubStream | ControlTag::EndMap => {
                    if record.exit_bracket() < 0 {
                        return Err(FbpError::port(label, "bracket close with no matching open"));
                    }
                }
                ControlTag::SwitchMapNamespace(_) => {}
            }
        }

        let conn = exec
            .graph
            .connection(target)
            .ok_or_else(|| FbpError::flow("connected input port has no queue"))?;
        exec.touch_progress(self.id);
        exec.transition(self.id, ComponentState::SuspSend);
        futures::select! {
            res = conn.sender().send_async(packet).fuse() => {
                exec.transition(self.id, ComponentState::Active);
                res.map_err(|_| FbpError::PortClosed(label))?;
            }
            () = exec.cancel_signal().fuse() => {
                return Err(FbpError::Cancelled(exec.cancel_reason()));
            }
        }
        exec.account_released(self.id);
        exec.touch_progress(self.id);
        Ok(())
    }

    /// Receive the next packet, or `Ok(None)` once the upstream has reached
    /// end-of-stream. End-of-stream is an ordinary return value, never an
    /// error.
    pub async fn receive(&self, port: &str) -> Result<Option<Packet>> {
        let exec = self.exec()?;
        let port_id = exec.graph.inputs(self.id).require(port)?;
        self.receive_from_port(exec, port_id, None).await
    }

    /// Receive with an upper bound on how long to wait for the next packet.
    ///
    /// # Errors
    /// [`FbpError::PortTimeout`] if `timeout` elapses with nothing received.
    pub async fn receive_timeout(&self, port: &str, timeout: Duration) -> Result<Option<Packet>> {
        let exec = self.exec()?;
        let port_id = exec.graph.inputs(self.id).require(port)?;
        self.receive_from_port(exec, port_id, Some(timeout)).await
    }

    async fn receive_from_port(
        &self,
        exec: &Executor,
        port_id: PortId,
        timeout: Option<Duration>,
    ) -> Result<Option<Packet>> {
        let record = exec
            .graph
            .port(port_id)
            .ok_or_else(|| FbpError::flow("no such port"))?;
        let label = record.id_string(&exec.component_name(self.id));

        let Some(conn) = exec.graph.connection(port_id) else {
            return if record.spec.optional {
                Ok(None)
            } else {
                Err(FbpError::port(label, "input port is not connected"))
            };
        };

        let recv = conn.receiver();
        exec.touch_progress(self.id);
        let deadline = timeout.map(|d| Instant::now() + d);
        exec.transition(self.id, ComponentState::SuspRecv);

        // The connection's channel never reports itself disconnected — the
        // executor keeps one sender clone alive for the whole run — so
        // end-of-stream is driven off `is_upstream_terminated` rather than
        // `recv_async` returning `Err`. Poll it on a short tick alongside the
        // event-driven wakeup so a packet already in flight still arrives
        // with no added latency.
        loop {
            if exec.graph.is_upstream_terminated(port_id) {
                exec.transition(self.id, ComponentState::Active);
                exec.touch_progress(self.id);
                return match recv.try_recv() {
                    Ok(packet) => {
                        exec.account_created(self.id);
                        Ok(Some(packet))
                    }
                    Err(_) => Ok(None),
                };
            }

            let tick = match deadline {
                Some(dl) => {
                    let remaining = dl.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        exec.transition(self.id, ComponentState::Active);
                        return Err(FbpError::PortTimeout(
                            timeout.expect("deadline implies a timeout was given"),
                            label,
                        ));
                    }
                    remaining.min(UPSTREAM_POLL_INTERVAL)
                }
                None => UPSTREAM_POLL_INTERVAL,
            };

            futures::select! {
                res = recv.recv_async().fuse() => {
                    exec.transition(self.id, ComponentState::Active);
                    exec.touch_progress(self.id);
                    return match res {
                        Ok(packet) => {
                            exec.account_created(self.id);
                            Ok(Some(packet))
                        }
                        Err(_) => Ok(None),
                    };
                }
                () = exec.scheduler.suspend_for(tick).fuse() => {}
                () = exec.cancel_signal().fuse() => {
                    return Err(FbpError::Cancelled(exec.cancel_reason()));
                }
            }
        }
    }

    /// Create a new value packet owned by the calling component.
    #[must_use]
    pub fn create_packet<T: Any + Send>(&self, value: T) -> Packet {
        if let ActivityMode::Running { exec } = &self.mode {
            exec.account_created(self.id);
        }
        Packet::new_value(value, self.id)
    }

    /// Release ownership of a packet without forwarding it downstream.
    pub fn drop_packet(&self, packet: Packet) {
        if let ActivityMode::Running { exec } = &self.mode {
            exec.account_released(self.id);
        }
        drop(packet);
    }

    pub async fn start_substream(&self, port: &str) -> Result<()> {
        self.send(port, Packet::new_control(ControlTag::StartSubStream, self.id)).await
    }

    pub async fn end_substream(&self, port: &str) -> Result<()> {
        self.send(port, Packet::new_control(ControlTag::EndSubStream, self.id)).await
    }

    pub async fn start_map(&self, port: &str) -> Result<()> {
        self.send(port, Packet::new_control(ControlTag::StartMap, self.id)).await
    }

    pub async fn end_map(&self, port: &str) -> Result<()> {
        self.send(port, Packet::new_control(ControlTag::EndMap, self.id)).await
    }

    /// Suspend this component's task for `duration` without holding any
    /// port open or closed — used by components that pace their output.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        let exec = self.exec()?;
        exec.touch_progress(self.id);
        futures::select! {
            () = exec.scheduler.suspend_for(duration).fuse() => Ok(()),
            () = exec.cancel_signal().fuse() => Err(FbpError::Cancelled(exec.cancel_reason())),
        }
    }

    /// Whether the executor is still willing to do work for this component —
    /// `false` once some other component has errored and termination has
    /// been requested, or the executor itself was asked to [`Executor::stop`].
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.exec().is_ok_and(|exec| !exec.is_cancelled())
    }

    pub async fn switch_map_namespace(&self, port: &str, namespace: impl Into<String>) -> Result<()> {
        self.send(
            port,
            Packet::new_control(ControlTag::SwitchMapNamespace(namespace.into()), self.id),
        )
        .await
    }
}

/// How often the fairness watchdog checks for stalled components.
const WATCHDOG_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Default gap a component may go without touching a port before the
/// watchdog logs it as a possible offender. Purely advisory.
const WATCHDOG_STALL_THRESHOLD: Duration = Duration::from_secs(1);

/// How often a blocked `receive` re-checks `is_upstream_terminated` and any
/// timeout deadline, between event-driven wakeups on the channel itself.
const UPSTREAM_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Drives every component of a [`FrozenGraph`] to completion on a
/// [`Scheduler`]. The first component to terminate with `Error` requests
/// termination of every other still-alive component by closing off their
/// `send`/`receive` calls; the first error observed is the one `run()`
/// surfaces as this run's result.
pub struct Executor {
    graph: FrozenGraph,
    runtime: SecondaryMap<ComponentId, Mutex<ComponentRuntime>>,
    errors: Mutex<Vec<(ComponentId, FbpError)>>,
    scheduler: Arc<dyn Scheduler>,
    cancelled: AtomicBool,
    cancel_tx: Mutex<Option<flume::Sender<std::convert::Infallible>>>,
    cancel_rx: flume::Receiver<std::convert::Infallible>,
    first_fault: Mutex<Option<String>>,
    active_count: AtomicUsize,
    last_progress: SecondaryMap<ComponentId, Mutex<Instant>>,
    running: AtomicBool,
}

impl Executor {
    #[must_use]
    pub fn new(graph: FrozenGraph, scheduler: Arc<dyn Scheduler>) -> Self {
        let mut runtime = SecondaryMap::new();
        let mut last_progress = SecondaryMap::new();
        let component_ids = graph.component_ids();
        for id in &component_ids {
            let id = *id;
            let mut rt = ComponentRuntime::new(graph.component_name(id).to_string());
            rt.transition(ComponentState::Initialized)
                .expect("NotInitialized -> Initialized is always legal");
            runtime.insert(id, Mutex::new(rt));
            last_progress.insert(id, Mutex::new(Instant::now()));
        }
        let (cancel_tx, cancel_rx) = flume::bounded(0);
        Self {
            graph,
            runtime,
            errors: Mutex::new(Vec::new()),
            scheduler,
            cancelled: AtomicBool::new(false),
            cancel_tx: Mutex::new(Some(cancel_tx)),
            cancel_rx,
            first_fault: Mutex::new(None),
            active_count: AtomicUsize::new(component_ids.len()),
            last_progress,
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &FrozenGraph {
        &self.graph
    }

    fn component_name(&self, id: ComponentId) -> String {
        self.graph.component_name(id).to_string()
    }

    fn account_created(&self, id: ComponentId) {
        self.runtime[id].lock().account_created();
    }

    fn account_released(&self, id: ComponentId) {
        self.runtime[id].lock().account_released();
    }

    fn touch_progress(&self, id: ComponentId) {
        if let Some(cell) = self.last_progress.get(id) {
            *cell.lock() = Instant::now();
        }
    }

    /// Resolves once some component has errored, waking up any other
    /// component currently blocked in `send`/`receive`/`sleep`.
    async fn cancel_signal(&self) {
        let _ = self.cancel_rx.recv_async().await;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel_reason(&self) -> String {
        self.first_fault
            .lock()
            .clone()
            .unwrap_or_else(|| "execution cancelled".to_string())
    }

    /// Request termination of every component still running. Called
    /// internally the moment a component's `run` returns `Err`; also exposed
    /// so an embedder can stop a graph from outside (spec's `stop()`).
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.cancel_tx.lock().take();
    }

    /// Whether [`Executor::run`] is currently driving this graph.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn record_error(&self, id: ComponentId, err: FbpError) {
        if !matches!(err, FbpError::Cancelled(_)) {
            let mut first = self.first_fault.lock();
            if first.is_none() {
                *first = Some(err.to_string());
            }
            self.errors.lock().push((id, err));
        }
        self.stop();
    }

    #[must_use]
    pub fn state_of(&self, id: ComponentId) -> ComponentState {
        self.runtime[id].lock().state
    }

    /// Apply a lifecycle transition, logging rather than failing if it turns
    /// out to be illegal — `send`/`receive` use this around their blocking
    /// points purely for `SuspSend`/`SuspRecv` observability, and a rejected
    /// transition there shouldn't take down the component's actual work.
    fn transition(&self, id: ComponentId, next: ComponentState) {
        if let Err(err) = self.runtime[id].lock().transition(next) {
            tracing::warn!(component = %self.component_name(id), %err, "state transition skipped");
        }
    }

    /// Run every component to completion, returning the runtime faults
    /// collected along the way. A component's `ERROR` termination requests
    /// termination of every other still-alive component; the error recorded
    /// first is the one this method's non-empty result is dominated by.
    pub async fn run(self: Arc<Self>) -> Vec<(ComponentId, FbpError)> {
        self.running.store(true, Ordering::Release);
        for id in self.graph.component_ids() {
            let exec = Arc::clone(&self);
            self.scheduler.spawn(Box::pin(async move {
                exec.drive_component(id).await;
            }));
        }
        {
            let exec = Arc::clone(&self);
            self.scheduler.spawn(Box::pin(async move {
                exec.run_watchdog().await;
            }));
        }
        self.scheduler.wait_all().await;
        self.running.store(false, Ordering::Release);
        std::mem::take(&mut *self.errors.lock())
    }

    /// Advisory: logs a warning if some still-running component hasn't
    /// touched a port in longer than [`WATCHDOG_STALL_THRESHOLD`]. Never
    /// affects execution outcome, only observability.
    async fn run_watchdog(self: Arc<Self>) {
        loop {
            if self.active_count.load(Ordering::Acquire) == 0 {
                return;
            }
            self.scheduler.suspend_for(WATCHDOG_CHECK_INTERVAL).await;
            let now = Instant::now();
            for id in self.graph.component_ids() {
                if self.state_of(id).is_terminated() {
                    continue;
                }
                let Some(cell) = self.last_progress.get(id) else { continue };
                let elapsed = now.duration_since(*cell.lock());
                if elapsed > WATCHDOG_STALL_THRESHOLD {
                    tracing::warn!(
                        component = %self.component_name(id),
                        ?elapsed,
                        "no scheduler context switch observed; possible stall or CPU hog"
                    );
                }
            }
        }
    }

    async fn drive_component(self: Arc<Self>, id: ComponentId) {
        let Some(mut behavior) = self.graph.take_behavior(id) else {
            self.active_count.fetch_sub(1, Ordering::AcqRel);
            return;
        };

        if let Err(err) = self.runtime[id].lock().transition(ComponentState::Active) {
            tracing::error!(component = %self.component_name(id), %err, "could not activate component");
            self.record_error(id, err);
            self.active_count.fetch_sub(1, Ordering::AcqRel);
            return;
        }

        let mut activity = Activity::for_run(id, &self);
        let result = behavior.run(&mut activity).await;
        let name = self.component_name(id);

        {
            let mut rt = self.runtime[id].lock();
            match &result {
                Ok(()) => {
                    if let Err(err) = rt.transition(ComponentState::Terminated) {
                        tracing::error!(component = %name, %err, "could not terminate component");
                    }
                    if rt.has_leaked_packets() {
                        tracing::warn!(
                            component = %name,
                            owned = rt.owned_packet_count(),
                            "component terminated while still owning packets"
                        );
                    }
                }
                Err(_) => {
                    let _ = rt.transition(ComponentState::Error);
                }
            }
        }

        if let Err(err) = result {
            if matches!(err, FbpError::Cancelled(_)) {
                tracing::debug!(component = %name, "terminated in response to a sibling's error");
            } else {
                tracing::error!(component = %name, %err, "component run failed");
            }
            self.record_error(id, err);
        }

        // A composite's output registry can hold aliases onto a child's own
        // ports (see `GraphBuilder::export_output`) — only close the ones
        // this component actually owns, so the composite's own (immediate,
        // trivial) termination doesn't close a child that's still running.
        for (_, port_id) in self.graph.outputs(id).iter() {
            if let Some(port) = self.graph.port(port_id) {
                if port.owner == id {
                    port.close();
                }
            }
        }

        self.active_count.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::graph::GraphBuilder;
    use crate::scheduler::CompioScheduler;
    use async_trait::async_trait;

    struct Generator {
        values: Vec<i32>,
    }

    #[async_trait]
    impl Component for Generator {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_output("OUT", PortSpec::new("OUT"))
        }

        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            for v in self.values.drain(..) {
                activity.send("OUT", activity.create_packet(v)).await?;
            }
            Ok(())
        }
    }

    struct Collector {
        seen: Arc<Mutex<Vec<i32>>>,
    }

    #[async_trait]
    impl Component for Collector {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_input("IN", PortSpec::new("IN"))
        }

        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            while let Some(packet) = activity.receive("IN").await? {
                if let Some(v) = packet.value::<i32>() {
                    self.seen.lock().push(*v);
                }
                activity.drop_packet(packet);
            }
            Ok(())
        }
    }

    #[compio::test]
    async fn packets_flow_end_to_end_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut g = GraphBuilder::new();
        let gen = g
            .add_component("Gen", Box::new(Generator { values: vec![1, 2, 3] }))
            .unwrap();
        let col = g
            .add_component("Col", Box::new(Collector { seen: seen.clone() }))
            .unwrap();
        g.connect(gen, "OUT", col, "IN").unwrap();

        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;

        assert!(errors.is_empty());
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    struct Failing;

    #[async_trait]
    impl Component for Failing {
        async fn run(&mut self, _activity: &mut Activity) -> Result<()> {
            Err(FbpError::flow("boom"))
        }
    }

    #[compio::test]
    async fn a_failing_component_is_reported_without_panicking() {
        let mut g = GraphBuilder::new();
        g.add_component("Bad", Box::new(Failing)).unwrap();
        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;
        assert_eq!(errors.len(), 1);
    }

    #[compio::test]
    async fn a_component_error_cancels_a_sibling_blocked_in_receive() {
        struct Waits;
        #[async_trait]
        impl Component for Waits {
            fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
                activity.add_input("IN", PortSpec::new("IN"))
            }
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                activity.receive("IN").await?;
                Ok(())
            }
        }

        let mut g = GraphBuilder::new();
        let bad = g.add_component("Bad", Box::new(Failing)).unwrap();
        let waiter = g.add_component("Waiter", Box::new(Waits)).unwrap();
        // Leave "IN" connected to nothing but not optional, so it genuinely
        // blocks on its receive rather than failing fast — via a source that
        // never sends.
        struct NeverSends;
        #[async_trait]
        impl Component for NeverSends {
            fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
                activity.add_output("OUT", PortSpec::new("OUT"))
            }
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                activity.sleep(Duration::from_secs(30)).await
            }
        }
        let source = g.add_component("Source", Box::new(NeverSends)).unwrap();
        g.connect(source, "OUT", waiter, "IN").unwrap();

        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = Arc::clone(&exec).run().await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, bad);
        assert_eq!(exec.state_of(waiter), ComponentState::Error);
        assert_eq!(exec.state_of(source), ComponentState::Error);
        assert!(!exec.is_running());
    }

    #[compio::test]
    async fn stop_requests_cancellation_like_a_component_error() {
        struct WaitsForever;
        #[async_trait]
        impl Component for WaitsForever {
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                activity.sleep(Duration::from_secs(30)).await
            }
        }

        let mut g = GraphBuilder::new();
        g.add_component("C", Box::new(WaitsForever)).unwrap();
        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        assert!(!exec.is_running());
        exec.stop();

        let errors = Arc::clone(&exec).run().await;
        assert!(errors.is_empty(), "a Cancelled termination is not a fault: {errors:?}");
        assert!(!exec.is_running());
    }

    #[compio::test]
    async fn is_alive_reflects_cancellation() {
        struct ChecksAliveness {
            seen_alive: Arc<Mutex<bool>>,
        }
        #[async_trait]
        impl Component for ChecksAliveness {
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                *self.seen_alive.lock() = activity.is_alive();
                Ok(())
            }
        }

        let seen_alive = Arc::new(Mutex::new(false));
        let mut g = GraphBuilder::new();
        g.add_component("C", Box::new(ChecksAliveness { seen_alive: seen_alive.clone() }))
            .unwrap();
        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;

        assert!(errors.is_empty());
        assert!(*seen_alive.lock());
    }

    struct Double;

    #[async_trait]
    impl Component for Double {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_input("IN", PortSpec::new("IN"))?;
            activity.add_output("OUT", PortSpec::new("OUT"))
        }

        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            while let Some(packet) = activity.receive("IN").await? {
                let Some(v) = packet.value::<i32>().copied() else { continue };
                activity.drop_packet(packet);
                activity.send("OUT", activity.create_packet(v * 2)).await?;
            }
            Ok(())
        }
    }

    #[compio::test]
    async fn a_composites_exported_ports_forward_to_its_child() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut g = GraphBuilder::new();
        let gen = g
            .add_component("Gen", Box::new(Generator { values: vec![1, 2, 3] }))
            .unwrap();
        let composite = g.add_composite("Inner").unwrap();
        let worker = g.add_component("Inner.Worker", Box::new(Double)).unwrap();
        g.export_input(composite, "IN", worker, "IN").unwrap();
        g.export_output(composite, "OUT", worker, "OUT").unwrap();
        let col = g
            .add_component("Col", Box::new(Collector { seen: seen.clone() }))
            .unwrap();
        g.connect(gen, "OUT", composite, "IN").unwrap();
        g.connect(composite, "OUT", col, "IN").unwrap();

        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(*seen.lock(), vec![2, 4, 6]);
    }

    #[compio::test]
    async fn unconnected_optional_output_drops_silently() {
        struct Lonely;
        #[async_trait]
        impl Component for Lonely {
            fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
                activity.add_output("OUT", PortSpec::new("OUT").optional(true))
            }
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                let packet = activity.create_packet(1_i32);
                activity.send("OUT", packet).await
            }
        }

        let mut g = GraphBuilder::new();
        g.add_component("Lonely", Box::new(Lonely)).unwrap();
        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;
        assert!(errors.is_empty());
    }
}
