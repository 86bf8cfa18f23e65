//! Error Types
//!
//! Error taxonomy for the execution engine: structural (graph build time),
//! state (lifecycle misuse), port (runtime), and component (runtime) faults.

use thiserror::Error;

/// Main error type for flow execution.
#[derive(Error, Debug)]
pub enum FbpError {
    /// Structural fault at graph-build time (duplicate name, already-sourced
    /// input, exporting a connected port, IIP on a non-input, ...).
    #[error("flow error: {0}")]
    Flow(String),

    /// Illegal lifecycle transition or method call for the current state.
    #[error("component state error on {component}: {message}")]
    ComponentState { component: String, message: String },

    /// Port-level fault: type mismatch, receive on a never-sourced port, etc.
    #[error("port error on {port}: {message}")]
    Port { port: String, message: String },

    /// Send on a closed output port.
    #[error("port closed: {0}")]
    PortClosed(String),

    /// A `send`/`receive` call's timeout elapsed before progress was made.
    #[error("port timeout after {0:?} on {1}")]
    PortTimeout(std::time::Duration, String),

    /// Exception raised out of a component's `run`.
    #[error("component error in {component}: {source}")]
    Component {
        component: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Raised to a component's `send`/`receive` once some other component has
    /// terminated with `Error`, so the rest of the graph unwinds instead of
    /// running to a now-pointless completion.
    #[error("execution cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for flow execution operations.
pub type Result<T> = std::result::Result<T, FbpError>;

impl FbpError {
    /// Create a structural/flow-level error.
    pub fn flow(msg: impl Into<String>) -> Self {
        Self::Flow(msg.into())
    }

    /// Create a component-state error.
    pub fn component_state(component: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ComponentState {
            component: component.into(),
            message: msg.into(),
        }
    }

    /// Create a port error.
    pub fn port(port: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Port {
            port: port.into(),
            message: msg.into(),
        }
    }

    /// Create a component error wrapping an arbitrary `run()` failure.
    pub fn component(
        component: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Component {
            component: component.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error terminates just the originating component (a
    /// runtime fault) vs. signalling a build-time/programmer bug.
    #[must_use]
    pub const fn is_runtime_fault(&self) -> bool {
        matches!(
            self,
            Self::Port { .. } | Self::PortClosed(_) | Self::PortTimeout(_, _) | Self::Component { .. }
        )
    }
}
