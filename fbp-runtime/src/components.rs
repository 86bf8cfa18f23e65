//! Small built-in component library.
//!
//! Each of these is deliberately simple — they exist so a graph can be
//! assembled without every user writing a generator and a sink by hand, and
//! so the seed scenarios in the integration tests have something concrete to
//! wire together.

use std::time::Duration;

use async_trait::async_trait;
use fbp_core::prelude::{Activity, Component, PortSpec, Result};

/// Emits each value in `values`, in order, then terminates. A self-starter —
/// it declares no inputs.
pub struct Generate<T> {
    values: std::vec::IntoIter<T>,
}

impl<T> Generate<T> {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self { values: values.into_iter().collect::<Vec<_>>().into_iter() }
    }
}

#[async_trait]
impl<T: Send + 'static> Component for Generate<T> {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_output("OUT", PortSpec::new("OUT"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        for value in self.values.by_ref() {
            activity.send("OUT", activity.create_packet(value)).await?;
        }
        Ok(())
    }
}

/// Forwards each input packet to `OUT` `count` times, then terminates once
/// the upstream is exhausted. Used to exercise the repeat-through-limit
/// scenario: downstream sees `count` copies of every upstream value.
pub struct Repeat {
    count: usize,
}

impl Repeat {
    #[must_use]
    pub const fn new(count: usize) -> Self {
        Self { count }
    }
}

#[async_trait]
impl Component for Repeat {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))?;
        activity.add_output("OUT", PortSpec::new("OUT").allows::<i64>())
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        while let Some(packet) = activity.receive("IN").await? {
            let value = packet.value::<i64>().copied();
            activity.drop_packet(packet);
            let Some(value) = value else { continue };
            for _ in 0..self.count {
                activity.send("OUT", activity.create_packet(value)).await?;
            }
        }
        Ok(())
    }
}

/// Delays each packet by `delay` before forwarding it, preserving order.
pub struct Sleep {
    delay: Duration,
}

impl Sleep {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Component for Sleep {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))?;
        activity.add_output("OUT", PortSpec::new("OUT"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        while let Some(packet) = activity.receive("IN").await? {
            activity.sleep(self.delay).await?;
            activity.send("OUT", packet).await?;
        }
        Ok(())
    }
}

/// Drains an input to completion, discarding every packet. Useful as a
/// terminal sink when a graph's output doesn't need to be observed directly.
#[derive(Default)]
pub struct Sink;

#[async_trait]
impl Component for Sink {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        while let Some(packet) = activity.receive("IN").await? {
            activity.drop_packet(packet);
        }
        Ok(())
    }
}

/// Combines same-indexed packets from `IN1` and `IN2` with `op`, emitting one
/// result per pair on `OUT`. Terminates as soon as either input reaches
/// end-of-stream, so an upstream failure on one side cleanly stops the
/// combiner rather than hanging on the other.
pub struct BinaryOp<F> {
    op: F,
}

impl<F> BinaryOp<F> {
    #[must_use]
    pub const fn new(op: F) -> Self {
        Self { op }
    }
}

#[async_trait]
impl<F> Component for BinaryOp<F>
where
    F: Fn(i64, i64) -> i64 + Send + 'static,
{
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN1", PortSpec::new("IN1"))?;
        activity.add_input("IN2", PortSpec::new("IN2"))?;
        activity.add_output("OUT", PortSpec::new("OUT"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        loop {
            let (Some(a), Some(b)) = (activity.receive("IN1").await?, activity.receive("IN2").await?)
            else {
                break;
            };
            let (av, bv) = (a.value::<i64>().copied(), b.value::<i64>().copied());
            activity.drop_packet(a);
            activity.drop_packet(b);
            let (Some(av), Some(bv)) = (av, bv) else { continue };
            activity.send("OUT", activity.create_packet((self.op)(av, bv))).await?;
        }
        Ok(())
    }
}

/// Fans packets from `IN` out across `OUT0..OUTn` round-robin. Because a
/// packet has exactly one owner, this routes each packet to one output
/// rather than broadcasting a copy to all of them.
pub struct RoundRobinSplit {
    width: usize,
}

impl RoundRobinSplit {
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self { width }
    }

    #[must_use]
    pub fn output_name(index: usize) -> String {
        format!("OUT{index}")
    }
}

#[async_trait]
impl Component for RoundRobinSplit {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))?;
        for i in 0..self.width {
            activity.add_output(Self::output_name(i), PortSpec::new(Self::output_name(i)))?;
        }
        Ok(())
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        let mut next = 0usize;
        while let Some(packet) = activity.receive("IN").await? {
            activity.send(&Self::output_name(next), packet).await?;
            next = (next + 1) % self.width.max(1);
        }
        Ok(())
    }
}

/// Wraps every value from `IN` in a single substream bracket pair before
/// forwarding, exercising the bracket-balance invariant end-to-end.
#[derive(Default)]
pub struct BracketRoundTrip;

#[async_trait]
impl Component for BracketRoundTrip {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))?;
        activity.add_output("OUT", PortSpec::new("OUT"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        activity.start_substream("OUT").await?;
        while let Some(packet) = activity.receive("IN").await? {
            activity.send("OUT", packet).await?;
        }
        activity.end_substream("OUT").await?;
        Ok(())
    }
}
