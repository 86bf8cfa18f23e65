//! The serializable subset of a packet's value, for crossing a process
//! boundary. A `fbp_core::packet::Packet` carries a `Box<dyn Any + Send>`,
//! which cannot cross a pipe — `WireValue` is the closed set of primitive
//! payloads a process-hosted component can actually exchange.

use serde::{Deserialize, Serialize};

use fbp_core::packet::{AttrValue, Packet};
use fbp_core::component::ComponentId;

/// A packet value that can be written to, and read back from, a child
/// process's stdin/stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireValue {
    /// Downcast a packet's value into a `WireValue`, if it holds one of the
    /// supported primitive types.
    #[must_use]
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        if let Some(v) = packet.value::<bool>() {
            return Some(Self::Bool(*v));
        }
        if let Some(v) = packet.value::<i64>() {
            return Some(Self::Int(*v));
        }
        if let Some(v) = packet.value::<f64>() {
            return Some(Self::Float(*v));
        }
        if let Some(v) = packet.value::<String>() {
            return Some(Self::Text(v.clone()));
        }
        None
    }

    /// Rebuild a packet owned by `owner` from a wire value.
    #[must_use]
    pub fn into_packet(self, owner: ComponentId) -> Packet {
        match self {
            Self::Bool(v) => Packet::new_value(v, owner),
            Self::Int(v) => Packet::new_value(v, owner),
            Self::Float(v) => Packet::new_value(v, owner),
            Self::Text(v) => Packet::new_value(v, owner),
        }
    }
}

impl From<WireValue> for AttrValue {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Bool(v) => Self::Bool(v),
            WireValue::Int(v) => Self::Int(v),
            WireValue::Float(v) => Self::Float(v),
            WireValue::Text(v) => Self::Text(v),
        }
    }
}
