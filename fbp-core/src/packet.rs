//! Packets: the value carrier that flows across connections.
//!
//! A [`Packet`] is owned by exactly one component at a time. Ownership
//! transfers on enqueue into a downstream port and on dequeue by the
//! receiver; [`crate::executor::Activity::drop_packet`] is how a
//! component releases one. The packet's value is immutable once created —
//! there is deliberately no setter, so a packet handed to multiple
//! consumers via a splitter can't be mutated out from under a sibling.

use std::any::Any;
use std::collections::HashMap;

use crate::component::ComponentId;

/// A named attribute attached to a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// The bracket marker carried by a [`Packet`] with [`PacketBody::Control`].
///
/// Delimits nested structures (lists, keyed maps) end-to-end without ever
/// materializing them as a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlTag {
    StartSubStream,
    EndSubStream,
    StartMap,
    EndMap,
    SwitchMapNamespace(String),
}

enum PacketBody {
    Data(Box<dyn Any + Send>),
    Control(ControlTag),
}

impl std::fmt::Debug for PacketBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(_) => f.write_str("Data(..)"),
            Self::Control(tag) => write!(f, "Control({tag:?})"),
        }
    }
}

/// Information packet (IP). Carries one opaque value, an owner, and
/// optional named attributes.
#[derive(Debug)]
pub struct Packet {
    body: PacketBody,
    owner: ComponentId,
    attrs: HashMap<String, AttrValue>,
}

impl Packet {
    /// Construct a data packet owned by `owner`. Callers go through
    /// [`crate::executor::Activity::create_packet`] in practice, which
    /// also bumps the owner's owned-packet count.
    pub fn new_value<T: Any + Send>(value: T, owner: ComponentId) -> Self {
        Self {
            body: PacketBody::Data(Box::new(value)),
            owner,
            attrs: HashMap::new(),
        }
    }

    /// Construct a control (bracket) packet owned by `owner`.
    pub fn new_control(tag: ControlTag, owner: ComponentId) -> Self {
        Self {
            body: PacketBody::Control(tag),
            owner,
            attrs: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn owner(&self) -> ComponentId {
        self.owner
    }

    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(self.body, PacketBody::Control(_))
    }

    /// The bracket tag, if this is a control packet.
    #[must_use]
    pub fn control_tag(&self) -> Option<&ControlTag> {
        match &self.body {
            PacketBody::Control(tag) => Some(tag),
            PacketBody::Data(_) => None,
        }
    }

    /// Borrow the value as `T`, or `None` if this is a control packet or
    /// holds a different type.
    #[must_use]
    pub fn value<T: Any>(&self) -> Option<&T> {
        match &self.body {
            PacketBody::Data(v) => v.downcast_ref::<T>(),
            PacketBody::Control(_) => None,
        }
    }

    /// Consume the packet and take ownership of its value as `T`.
    ///
    /// # Errors
    /// Returns `self` back if this is a control packet or holds a different type.
    pub fn into_value<T: Any + Send>(self) -> Result<T, Self> {
        match self.body {
            PacketBody::Data(v) => match v.downcast::<T>() {
                Ok(boxed) => Ok(*boxed),
                Err(v) => Err(Self {
                    body: PacketBody::Data(v),
                    owner: self.owner,
                    attrs: self.attrs,
                }),
            },
            PacketBody::Control(tag) => Err(Self {
                body: PacketBody::Control(tag),
                owner: self.owner,
                attrs: self.attrs,
            }),
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attrs.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_owner() -> ComponentId {
        ComponentId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn value_roundtrips_through_downcast() {
        let p = Packet::new_value(42_i32, dummy_owner());
        assert_eq!(p.value::<i32>(), Some(&42));
        assert_eq!(p.value::<&str>(), None);
        assert!(!p.is_control());
    }

    #[test]
    fn into_value_wrong_type_returns_packet() {
        let p = Packet::new_value(42_i32, dummy_owner());
        let err = p.into_value::<String>().unwrap_err();
        assert_eq!(err.value::<i32>(), Some(&42));
    }

    #[test]
    fn control_packets_have_no_value() {
        let p = Packet::new_control(ControlTag::StartSubStream, dummy_owner());
        assert!(p.is_control());
        assert_eq!(p.value::<i32>(), None);
        assert_eq!(p.control_tag(), Some(&ControlTag::StartSubStream));
    }

    #[test]
    fn attrs_are_named_and_optional() {
        let mut p = Packet::new_value(1_i32, dummy_owner());
        assert!(p.attr("channel").is_none());
        p.set_attr("channel", AttrValue::Text("default".into()));
        assert_eq!(p.attr("channel"), Some(&AttrValue::Text("default".into())));
    }
}
