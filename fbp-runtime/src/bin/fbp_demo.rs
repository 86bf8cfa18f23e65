//! CLI demo: wires a small generator -> repeat -> sleep -> sink pipeline and
//! runs it to completion, logging each stage transition via `tracing`.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fbp_core::prelude::{CompioScheduler, Executor, GraphBuilder};
use fbp_runtime::components::{Generate, Repeat, Sink, Sleep};

/// Run a demo flow-based pipeline.
#[derive(Debug, Parser)]
#[command(name = "fbp-demo", version, about)]
struct Args {
    /// Number of values the generator emits, counting up from 1.
    #[arg(long, default_value_t = 5)]
    count: u32,

    /// How many times the repeat stage duplicates each value.
    #[arg(long, default_value_t = 2)]
    limit: usize,

    /// Milliseconds of delay the sleep stage adds per packet.
    #[arg(long, default_value_t = 10)]
    delay_ms: u64,
}

#[compio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let values: Vec<i64> = (1..=i64::from(args.count)).collect();

    let mut graph = GraphBuilder::new();
    let gen = graph
        .add_component("Gen", Box::new(Generate::new(values)))
        .expect("Gen registers cleanly");
    let rep = graph
        .add_component("Rep", Box::new(Repeat::new(args.limit)))
        .expect("Rep registers cleanly");
    let slp = graph
        .add_component("Sleep", Box::new(Sleep::new(Duration::from_millis(args.delay_ms))))
        .expect("Sleep registers cleanly");
    let sink = graph.add_component("Sink", Box::new(Sink)).expect("Sink registers cleanly");

    graph.connect(gen, "OUT", rep, "IN").expect("Gen -> Rep");
    graph.connect(rep, "OUT", slp, "IN").expect("Rep -> Sleep");
    graph.connect(slp, "OUT", sink, "IN").expect("Sleep -> Sink");

    let executor = Arc::new(Executor::new(graph.freeze(), Arc::new(CompioScheduler::new())));
    let errors = executor.run().await;

    if errors.is_empty() {
        tracing::info!("pipeline completed with no component faults");
    } else {
        for (id, err) in &errors {
            tracing::error!(?id, %err, "component faulted");
        }
        std::process::exit(1);
    }
}
