//! Components: the unit of computation in a flow graph.
//!
//! A component is a name, a set of input and output ports, a lifecycle state,
//! and a `run` loop that reads from inputs and writes to outputs until its
//! upstreams are exhausted. [`Component`] is the trait user code implements;
//! [`ComponentRuntime`] is the executor's bookkeeping for one instance
//! (lifecycle state plus owned-packet accounting, per invariant I7).

use async_trait::async_trait;

use crate::error::Result;
use crate::executor::Activity;
use crate::state::ComponentState;

slotmap::new_key_type! {
    /// Stable identifier for a component, valid for the lifetime of the
    /// graph it belongs to.
    pub struct ComponentId;
}

/// User-implemented unit of computation.
///
/// Implementors declare their ports in [`initialize`](Component::initialize)
/// and do their work in [`run`](Component::run), reading and writing through
/// the [`Activity`] handle rather than holding port references directly —
/// ports live in the graph's arenas, not on the component.
#[async_trait]
pub trait Component: Send + 'static {
    /// Declare input/output ports against `activity`. Called once, while the
    /// component is in state `NotInitialized`.
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        let _ = activity;
        Ok(())
    }

    /// Do the component's work. Returning `Ok(())` terminates the component
    /// normally; an `Err` is reported to the executor as a runtime fault,
    /// terminates this component in state `Error`, and requests termination
    /// of every other still-running component — their next `send`/`receive`
    /// returns [`crate::error::FbpError::Cancelled`] so they unwind instead
    /// of running to a now-pointless completion.
    async fn run(&mut self, activity: &mut Activity) -> Result<()>;

    /// When `true`, the executor keeps this component's task alive even
    /// after every input it declared has reached end-of-stream — used by
    /// generators and other self-starters that never read an input.
    const KEEPALIVE: bool = false;

    /// Human-readable name for diagnostics; defaults to the type name.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Executor-side bookkeeping for one running component instance: lifecycle
/// state and the owned-packet count used to detect leaks (I7 — a component
/// in state `Terminated` or `Error` must hold zero owned packets).
#[derive(Debug)]
pub struct ComponentRuntime {
    pub name: String,
    pub state: ComponentState,
    owned_packet_count: i64,
}

impl ComponentRuntime {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ComponentState::NotInitialized,
            owned_packet_count: 0,
        }
    }

    pub fn transition(&mut self, next: ComponentState) -> Result<()> {
        let name = self.name.clone();
        self.state.transition(next, &name)
    }

    /// Record that this component now owns one more packet (just created or
    /// just received).
    pub fn account_created(&mut self) {
        self.owned_packet_count += 1;
    }

    /// Record that this component no longer owns a packet (just sent
    /// downstream or just dropped).
    pub fn account_released(&mut self) {
        self.owned_packet_count -= 1;
    }

    #[must_use]
    pub const fn owned_packet_count(&self) -> i64 {
        self.owned_packet_count
    }

    /// I7: a terminated component must not be holding any packets.
    #[must_use]
    pub fn has_leaked_packets(&self) -> bool {
        self.state.is_terminated() && self.owned_packet_count != 0
    }
}
