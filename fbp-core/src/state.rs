//! Component lifecycle state machine.
//!
//! Mirrors the trajectory `NotInitialized -> Initialized -> Active <-> {SuspSend,
//! SuspRecv} -> Terminated | Error`, plus the direct `Initialized -> Terminated`
//! edge taken by a component whose upstream closes before it is ever run.

use crate::error::FbpError;

/// Lifecycle state of a [`crate::component::Component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    NotInitialized,
    Initialized,
    Active,
    SuspSend,
    SuspRecv,
    Terminated,
    Error,
}

impl ComponentState {
    /// Whether `self -> next` is one of the legal edges in the state graph.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use ComponentState::{Active, Error, Initialized, NotInitialized, SuspRecv, SuspSend, Terminated};

        matches!(
            (self, next),
            (NotInitialized, Initialized)
                | (Initialized, Active)
                | (Initialized, Terminated)
                | (Active, SuspSend)
                | (Active, SuspRecv)
                | (Active, Terminated)
                | (Active, Error)
                | (SuspSend, Active)
                | (SuspSend, Error)
                | (SuspRecv, Active)
                | (SuspRecv, Error)
                | (SuspRecv, Terminated)
        )
    }

    /// Validate and apply a transition, returning a [`FbpError::ComponentState`]
    /// for any edge outside the legal set in §3 — any other transition is a
    /// bug and must fail loudly rather than silently clamp.
    pub fn transition(&mut self, next: Self, component_name: &str) -> crate::error::Result<()> {
        if *self == next {
            return Ok(());
        }

        if !self.can_transition_to(next) {
            return Err(FbpError::component_state(
                component_name,
                format!("illegal transition {self:?} -> {next:?}"),
            ));
        }

        tracing::debug!(component = component_name, from = ?self, to = ?next, "state transitioned");
        *self = next;
        Ok(())
    }

    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated | Self::Error)
    }

    #[must_use]
    pub const fn is_suspended(self) -> bool {
        matches!(self, Self::SuspSend | Self::SuspRecv)
    }
}

/// Assert the current state is one of `allowed`, mirroring `pflow`'s
/// `assert_component_state` decorator as a plain guard call.
pub fn assert_state(
    current: ComponentState,
    allowed: &[ComponentState],
    component_name: &str,
    method: &str,
) -> crate::error::Result<()> {
    if allowed.contains(&current) {
        return Ok(());
    }

    Err(FbpError::component_state(
        component_name,
        format!(
            "{method}() called in unexpected state {current:?} (expecting one of: {allowed:?})"
        ),
    ))
}
