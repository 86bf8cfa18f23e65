//! End-to-end scenarios exercising the invariants called out in the design:
//! FIFO per connection, packet-ownership conservation, termination,
//! bracket balance, legal state transitions, and backpressure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use fbp_core::prelude::{
    Activity, Component, CompioScheduler, ControlTag, Executor, FbpError, GraphBuilder, PortSpec,
    Result,
};
use fbp_runtime::components::{BinaryOp, BracketRoundTrip, Generate, Repeat, Sink, Sleep};

struct Collect {
    seen: Arc<Mutex<Vec<i64>>>,
}

#[async_trait]
impl Component for Collect {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        while let Some(packet) = activity.receive("IN").await? {
            if let Some(v) = packet.value::<i64>() {
                self.seen.lock().push(*v);
            }
            activity.drop_packet(packet);
        }
        Ok(())
    }
}

/// Repeat-through-limit: downstream sees `limit` copies of every upstream
/// value, in the order the generator produced them (FIFO per connection).
#[compio::test]
async fn repeat_through_limit_preserves_order_and_multiplicity() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut g = GraphBuilder::new();
    let gen = g.add_component("Gen", Box::new(Generate::new([1_i64, 2, 3]))).unwrap();
    let rep = g.add_component("Rep", Box::new(Repeat::new(2))).unwrap();
    let col = g.add_component("Col", Box::new(Collect { seen: seen.clone() })).unwrap();
    g.connect(gen, "OUT", rep, "IN").unwrap();
    g.connect(rep, "OUT", col, "IN").unwrap();

    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = exec.run().await;

    assert!(errors.is_empty());
    assert_eq!(*seen.lock(), vec![1, 1, 2, 2, 3, 3]);
}

/// Sleep pipeline: every packet is still delivered, in order, once the
/// configured delay per stage has elapsed for each of them.
#[compio::test]
async fn sleep_pipeline_delivers_everything_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut g = GraphBuilder::new();
    let gen = g.add_component("Gen", Box::new(Generate::new([1_i64, 2, 3]))).unwrap();
    let slp = g.add_component("Sleep", Box::new(Sleep::new(Duration::from_millis(2)))).unwrap();
    let col = g.add_component("Col", Box::new(Collect { seen: seen.clone() })).unwrap();
    g.connect(gen, "OUT", slp, "IN").unwrap();
    g.connect(slp, "OUT", col, "IN").unwrap();

    let start = Instant::now();
    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = exec.run().await;

    assert!(errors.is_empty());
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
    assert!(start.elapsed() >= Duration::from_millis(6));
}

/// A binary operator whose second upstream fails terminates cleanly (error
/// propagation does not hang the combiner waiting on a dead input).
#[compio::test]
async fn binary_operator_handles_an_upstream_failure() {
    struct Failing;
    #[async_trait]
    impl Component for Failing {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_output("OUT", PortSpec::new("OUT"))
        }
        async fn run(&mut self, _activity: &mut Activity) -> Result<()> {
            Err(FbpError::flow("upstream exploded"))
        }
    }

    let mut g = GraphBuilder::new();
    let a = g.add_component("A", Box::new(Generate::new([1_i64, 2, 3]))).unwrap();
    let b = g.add_component("B", Box::new(Failing)).unwrap();
    let op = g.add_component("Sum", Box::new(BinaryOp::new(|x, y| x + y))).unwrap();
    let sink = g.add_component("Sink", Box::new(Sink)).unwrap();
    g.connect(a, "OUT", op, "IN1").unwrap();
    g.connect(b, "OUT", op, "IN2").unwrap();
    g.connect(op, "OUT", sink, "IN").unwrap();

    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = exec.run().await;

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, b);
}

/// Backpressure: a bounded connection makes the generator's send future
/// resolve only as fast as a slow consumer drains it — total run time
/// reflects the consumer's pace, not the producer's.
#[compio::test]
async fn backpressure_paces_a_fast_producer_to_a_slow_consumer() {
    struct SlowSink {
        delay: Duration,
    }
    #[async_trait]
    impl Component for SlowSink {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_input("IN", PortSpec::new("IN").max_queue_size(1))
        }
        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            while let Some(packet) = activity.receive("IN").await? {
                activity.drop_packet(packet);
                activity.sleep(self.delay).await?;
            }
            Ok(())
        }
    }

    let mut g = GraphBuilder::new();
    let gen = g.add_component("Gen", Box::new(Generate::new(0_i64..20))).unwrap();
    let sink = g
        .add_component("Sink", Box::new(SlowSink { delay: Duration::from_millis(2) }))
        .unwrap();
    g.connect(gen, "OUT", sink, "IN").unwrap();

    let start = Instant::now();
    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = exec.run().await;

    assert!(errors.is_empty());
    assert!(start.elapsed() >= Duration::from_millis(20 * 2));
}

/// Bracket round-trip: every `StartSubStream` the wrapper emits is matched
/// by exactly one `EndSubStream`, with every data packet nested between.
#[compio::test]
async fn bracket_round_trip_stays_balanced() {
    let events = Arc::new(Mutex::new(Vec::new()));

    struct RecordingSink {
        events: Arc<Mutex<Vec<String>>>,
    }
    #[async_trait]
    impl Component for RecordingSink {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_input("IN", PortSpec::new("IN"))
        }
        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            while let Some(packet) = activity.receive("IN").await? {
                let entry = match packet.control_tag() {
                    Some(ControlTag::StartSubStream) => "start".to_string(),
                    Some(ControlTag::EndSubStream) => "end".to_string(),
                    _ => packet.value::<i64>().map_or_else(|| "?".to_string(), i64::to_string),
                };
                self.events.lock().push(entry);
                activity.drop_packet(packet);
            }
            Ok(())
        }
    }

    let mut g = GraphBuilder::new();
    let gen = g.add_component("Gen", Box::new(Generate::new([1_i64, 2]))).unwrap();
    let wrap = g.add_component("Wrap", Box::new(BracketRoundTrip)).unwrap();
    let sink = g
        .add_component("Sink", Box::new(RecordingSink { events: events.clone() }))
        .unwrap();
    g.connect(gen, "OUT", wrap, "IN").unwrap();
    g.connect(wrap, "OUT", sink, "IN").unwrap();

    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = exec.run().await;

    assert!(errors.is_empty());
    let log = events.lock().clone();
    assert_eq!(log, vec!["start", "1", "2", "end"]);
}

/// Error propagation: a component failure is reported with its own id and
/// does not stop an unrelated, independent branch of the graph.
#[compio::test]
async fn a_component_error_requests_termination_of_an_independent_branch() {
    struct Failing;
    #[async_trait]
    impl Component for Failing {
        async fn run(&mut self, _activity: &mut Activity) -> Result<()> {
            Err(FbpError::flow("independent failure"))
        }
    }

    // Sleeps far longer than this test should take; only wakes early if the
    // executor cancels it in response to `Failing`'s error.
    struct SlowSource;
    #[async_trait]
    impl Component for SlowSource {
        fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
            activity.add_output("OUT", PortSpec::new("OUT"))
        }
        async fn run(&mut self, activity: &mut Activity) -> Result<()> {
            activity.sleep(Duration::from_secs(30)).await?;
            activity.send("OUT", activity.create_packet(1_i64)).await
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut g = GraphBuilder::new();
    let bad = g.add_component("Bad", Box::new(Failing)).unwrap();
    let src = g.add_component("Slow", Box::new(SlowSource)).unwrap();
    let col = g.add_component("Col", Box::new(Collect { seen: seen.clone() })).unwrap();
    g.connect(src, "OUT", col, "IN").unwrap();

    let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
    let errors = Arc::clone(&exec).run().await;

    // Only the original fault is surfaced — the independent branch's own
    // termination was a response to cancellation, not a fresh error.
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, bad);
    assert_eq!(exec.state_of(src), fbp_core::prelude::ComponentState::Error);
    assert_eq!(exec.state_of(col), fbp_core::prelude::ComponentState::Error);
    assert!(seen.lock().is_empty());
}
