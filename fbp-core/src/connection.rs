//! Connections: the bounded or unbounded queue wiring one output port to
//! one input port.
//!
//! Backed by `flume`, the same MPMC channel the teacher uses for its
//! in-process transport — a connection has exactly one producer task (the
//! source component) and one consumer task (the target component), so the
//! multi-producer/multi-consumer generality goes unused but costs nothing.

use crate::packet::Packet;
use crate::port::PortId;

/// The live queue backing one graph edge.
pub struct Connection {
    pub source: PortId,
    pub target: PortId,
    sender: flume::Sender<Packet>,
    receiver: flume::Receiver<Packet>,
}

impl Connection {
    /// A connection whose target port declared `max_queue_size(n)` — sends
    /// block (I5) once `n` packets are in flight.
    #[must_use]
    pub fn bounded(source: PortId, target: PortId, capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self { source, target, sender, receiver }
    }

    /// A connection whose target port declared no `max_queue_size` — sends
    /// never block on queue depth.
    #[must_use]
    pub fn unbounded(source: PortId, target: PortId) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { source, target, sender, receiver }
    }

    #[must_use]
    pub fn sender(&self) -> flume::Sender<Packet> {
        self.sender.clone()
    }

    #[must_use]
    pub fn receiver(&self) -> flume::Receiver<Packet> {
        self.receiver.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.sender.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentId;
    use slotmap::KeyData;

    fn owner() -> ComponentId {
        ComponentId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn bounded_connection_reports_capacity() {
        let conn = Connection::bounded(PortId::default(), PortId::default(), 4);
        assert_eq!(conn.capacity(), Some(4));
    }

    #[test]
    fn unbounded_connection_has_no_capacity_limit() {
        let conn = Connection::unbounded(PortId::default(), PortId::default());
        assert_eq!(conn.capacity(), None);
    }

    #[test]
    fn fifo_ordering_is_preserved() {
        let conn = Connection::unbounded(PortId::default(), PortId::default());
        let tx = conn.sender();
        let rx = conn.receiver();
        tx.send(Packet::new_value(1_i32, owner())).unwrap();
        tx.send(Packet::new_value(2_i32, owner())).unwrap();
        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.value::<i32>(), Some(&1));
        assert_eq!(second.value::<i32>(), Some(&2));
    }
}
