//! Host-side adapter: runs an external command as a component, talking to it
//! over the [`crate::codec`] framing on its stdin/stdout.
//!
//! Each instance owns a dedicated reader and writer OS thread bridging the
//! child's blocking pipes to `flume` channels the async `run` loop can await
//! — the same shape the teacher uses to keep blocking I/O off the reactor,
//! applied here to a child process instead of a socket.

use std::io::{BufReader, BufWriter};
use std::process::{Command, Stdio};

use async_trait::async_trait;

use fbp_core::component::Component;
use fbp_core::error::{FbpError, Result};
use fbp_core::executor::Activity;
use fbp_core::port::PortSpec;

use crate::codec::{read_frame, write_frame};
use crate::value::WireValue;

/// A component whose body is an external process. Declares one input
/// (`IN`) and one output (`OUT`) of primitive-valued packets.
pub struct ProcessComponent {
    command: Command,
}

impl ProcessComponent {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Component for ProcessComponent {
    fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
        activity.add_input("IN", PortSpec::new("IN"))?;
        activity.add_output("OUT", PortSpec::new("OUT"))
    }

    async fn run(&mut self, activity: &mut Activity) -> Result<()> {
        let mut child = self
            .command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| FbpError::component("process", e))?;
        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let (to_child_tx, to_child_rx) = flume::unbounded::<WireValue>();
        let writer_thread = std::thread::spawn(move || {
            let mut writer = BufWriter::new(stdin);
            while let Ok(value) = to_child_rx.recv() {
                if write_frame(&mut writer, &value).is_err() {
                    tracing::warn!("child process stdin closed while frames were still pending");
                    break;
                }
            }
        });

        let (from_child_tx, from_child_rx) = flume::unbounded::<WireValue>();
        let reader_thread = std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            loop {
                match read_frame::<_, WireValue>(&mut reader) {
                    Ok(Some(value)) => {
                        if from_child_tx.send(value).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!(%err, "child process framing error, stopping reader");
                        break;
                    }
                }
            }
        });

        while let Some(packet) = activity.receive("IN").await? {
            if let Some(value) = WireValue::from_packet(&packet) {
                let _ = to_child_tx.send(value);
            } else {
                tracing::debug!("dropped a packet with no wire representation");
            }
            activity.drop_packet(packet);
        }
        drop(to_child_tx);
        let _ = writer_thread.join();

        while let Ok(value) = from_child_rx.recv_async().await {
            activity.send("OUT", value.into_packet(activity.id())).await?;
        }
        let _ = reader_thread.join();

        let status = child.wait().map_err(|e| FbpError::component("process", e))?;
        if !status.success() {
            return Err(FbpError::flow(format!("child process exited with {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbp_core::executor::Executor;
    use fbp_core::graph::GraphBuilder;
    use fbp_core::scheduler::CompioScheduler;
    use std::sync::Arc;

    #[compio::test]
    async fn cat_echoes_frames_back_unchanged() {
        // `cat` passes stdin to stdout byte for byte, so our length-prefixed
        // frames round-trip through it unchanged.
        let mut g = GraphBuilder::new();

        struct OneShot(Option<i64>);
        #[async_trait]
        impl Component for OneShot {
            fn initialize(&mut self, activity: &mut Activity) -> Result<()> {
                activity.add_output("OUT", PortSpec::new("OUT"))
            }
            async fn run(&mut self, activity: &mut Activity) -> Result<()> {
                if let Some(v) = self.0.take() {
                    activity.send("OUT", activity.create_packet(v)).await?;
                }
                Ok(())
            }
        }

        let src = g.add_component("Src", Box::new(OneShot(Some(7)))).unwrap();
        let cat = g
            .add_component("Cat", Box::new(ProcessComponent::new(Command::new("cat"))))
            .unwrap();
        g.connect(src, "OUT", cat, "IN").unwrap();

        let exec = Arc::new(Executor::new(g.freeze(), Arc::new(CompioScheduler::new())));
        let errors = exec.run().await;
        assert!(errors.is_empty(), "{errors:?}");
    }
}
