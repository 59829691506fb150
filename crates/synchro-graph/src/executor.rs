//! The per-node executor thread (C11, §4.12).
//!
//! Each node runs its own OS thread for the duration of the graph's scoped
//! lifecycle: drain every incoming edge queue into `receive`, poll `emit`
//! once, forward anything emitted to every outgoing edge queue, then sleep.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use synchro_core::Frame;

use crate::node::GraphNode;

/// A single-producer/single-consumer unbounded FIFO between two nodes.
#[derive(Clone, Default)]
pub struct EdgeQueue {
    inner: Arc<Mutex<VecDeque<Frame>>>,
}

impl EdgeQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Frame) {
        self.inner.lock().unwrap().push_back(frame);
    }

    pub fn try_pop(&self) -> Option<Frame> {
        self.inner.lock().unwrap().pop_front()
    }
}

/// One node's incoming/outgoing wiring: which source name tags frames
/// arriving on which queue, and which queues to push emitted frames onto.
pub struct NodeWiring {
    pub incoming: Vec<(String, EdgeQueue)>,
    pub outgoing: Vec<EdgeQueue>,
}

/// Drives one node's executor loop until `running` is cleared, inside the
/// node's scoped `acquire`/`release` lifecycle.
pub struct NodeExecutor {
    name: String,
    node: Box<dyn GraphNode>,
    wiring: NodeWiring,
    sleep_interval: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl NodeExecutor {
    #[must_use]
    pub fn new(name: String, node: Box<dyn GraphNode>, wiring: NodeWiring, input_interval_secs: f64, processor_interval_secs: f64) -> Self {
        // §4.12 ADDED: keyed on whether the node has the Receiver capability
        // at all, not on whether it is purely an emitter.
        let caps = node.capabilities();
        let sleep_interval = if caps.receives {
            Duration::from_secs_f64(processor_interval_secs.max(0.0))
        } else {
            Duration::from_secs_f64(input_interval_secs.max(0.0))
        };

        Self {
            name,
            node,
            wiring,
            sleep_interval,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Acquires the node's resources and spawns its executor thread.
    ///
    /// The node is moved into the spawned thread; `stop` communicates via
    /// the shared `running` flag and a final `join`.
    pub fn start(mut self) -> Result<RunningExecutor, (String, String)> {
        if let Err(e) = self.node.acquire() {
            return Err((self.name.clone(), e.to_string()));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let name = self.name.clone();
        let mut node = self.node;
        let wiring = self.wiring;
        let sleep_interval = self.sleep_interval;

        let handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                for (source, queue) in &wiring.incoming {
                    while let Some(frame) = queue.try_pop() {
                        node.receive(source, frame);
                    }
                }

                if node.capabilities().emits {
                    if let Some(frame) = node.emit() {
                        for queue in &wiring.outgoing {
                            queue.push(frame.clone());
                        }
                    }
                }

                std::thread::sleep(sleep_interval);
            }
            node.release();
            tracing::debug!(node = %name, "executor: stopped");
        });

        Ok(RunningExecutor {
            name: self.name,
            running: self.running,
            handle: Some(handle),
        })
    }
}

/// A started executor; `stop` signals the loop to exit and joins the thread.
pub struct RunningExecutor {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RunningExecutor {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RunningExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synchro_core::{AudioFormat, StreamConfig};

    struct CountingEmitter {
        count: usize,
    }

    impl synchro_core::Contextual for CountingEmitter {}
    impl synchro_core::Emitter for CountingEmitter {
        fn emit(&mut self) -> Option<Frame> {
            self.count += 1;
            Some(Frame::new(StreamConfig::mono(AudioFormat::Int16, 16000), vec![0, 0]).unwrap())
        }
    }

    #[test]
    fn edge_queue_is_fifo() {
        let q = EdgeQueue::new();
        let f = |n: i16| Frame::new(StreamConfig::mono(AudioFormat::Int16, 16000), n.to_le_bytes().to_vec()).unwrap();
        q.push(f(1));
        q.push(f(2));
        assert_eq!(q.try_pop().unwrap().payload(), &[1, 0]);
        assert_eq!(q.try_pop().unwrap().payload(), &[2, 0]);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn emitter_only_node_pushes_to_outgoing_queue() {
        let out = EdgeQueue::new();
        let node: Box<dyn GraphNode> = Box::new(crate::node::EmitterOnly(CountingEmitter { count: 0 }));
        let executor = NodeExecutor::new(
            "src".to_string(),
            node,
            NodeWiring {
                incoming: vec![],
                outgoing: vec![out.clone()],
            },
            0.01,
            0.01,
        );
        let mut running = executor.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        running.stop();
        assert!(out.try_pop().is_some());
    }
}
