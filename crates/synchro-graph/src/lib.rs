//! The graph builder and manager (C10/C11, §4.11/§4.12).
//!
//! `synchro-graph` turns a declarative [`GraphConfig`] into running nodes:
//! [`builder::build`] materializes typed nodes and validates edges,
//! [`GraphManager`] owns the edge queues and one [`executor::NodeExecutor`]
//! thread per node, and drives the whole run's lifecycle (`execute`/`stop`,
//! plus an optional watchdog for `settings.limits.run_time_seconds`).

pub mod builder;
pub mod error;
pub mod executor;
pub mod node;
pub mod settings;
pub mod spec;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use synchro_core::EventBus;

pub use builder::{EdgeList, NodeTable};
pub use error::{Error, Result};
pub use executor::{EdgeQueue, NodeExecutor, NodeWiring, RunningExecutor};
pub use node::GraphNode;
pub use settings::{Limits, Metrics, NeuralConfig, QualityMetric, Settings};
pub use spec::{GraphConfig, NodeEntry, NodeSpec};

/// Owns a materialized graph's edge queues and per-node executors for the
/// duration of one run (§4.12).
///
/// Built via [`GraphManager::build`] + [`GraphManager::new`] (parse and
/// materialize, but start nothing), then driven with [`GraphManager::execute`]
/// once. `execute` is reentrancy-guarded by `executing`, mirroring
/// `original_source/synchro/graph/graph_manager.py`'s `self._executing` check:
/// a second `execute()` call on the same manager - concurrent or sequential -
/// is rejected with [`Error::AlreadyExecuting`] rather than silently racing
/// or rebuilding the edge queues.
pub struct GraphManager {
    events: EventBus,
    pending: Mutex<Option<(NodeTable, EdgeList)>>,
    executing: AtomicBool,
    running: Arc<AtomicBool>,
    executors: Mutex<Vec<RunningExecutor>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl GraphManager {
    /// Builds a [`BuiltGraph`] from a parsed graph config. Node construction
    /// and edge validation happen here (§4.11); nothing is started yet.
    pub fn build(graph: &GraphConfig, settings: &Settings, neural: &NeuralConfig, events: EventBus, working_dir: &Path) -> Result<BuiltGraph> {
        let (nodes, edges) = builder::build(graph, settings, neural, &events, working_dir)?;
        Ok(BuiltGraph { nodes, edges, events })
    }

    /// Wraps a [`BuiltGraph`] in an idle manager. Nothing runs until
    /// [`GraphManager::execute`] is called.
    #[must_use]
    pub fn new(built: BuiltGraph) -> Self {
        let BuiltGraph { nodes, edges, events } = built;
        Self {
            events,
            pending: Mutex::new(Some((nodes, edges))),
            executing: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            executors: Mutex::new(Vec::new()),
            watchdog: Mutex::new(None),
        }
    }

    /// Starts one executor thread per node and, if configured, a watchdog
    /// that calls [`GraphManager::stop`] after `run_time_seconds`.
    ///
    /// Node `acquire` failures are isolated per node (§7 `ResourceError`):
    /// a failing node is logged and skipped, the rest of the graph still
    /// starts, matching §8 scenario 5 (translation connector reconnect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExecuting`] if this manager has already been
    /// executed (concurrently or previously) - a graph runs exactly once.
    pub fn execute(&self, settings: &Settings) -> Result<()> {
        if self.executing.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyExecuting);
        }

        let (nodes, edges) = self.pending.lock().unwrap().take().ok_or(Error::AlreadyExecuting)?;

        let mut queues: HashMap<String, EdgeQueue> = HashMap::new();
        for (source, target) in &edges {
            queues.insert(edge_id(source, target), EdgeQueue::new());
        }

        let mut incoming: HashMap<String, Vec<(String, EdgeQueue)>> = HashMap::new();
        let mut outgoing: HashMap<String, Vec<EdgeQueue>> = HashMap::new();
        for (source, target) in &edges {
            let queue = queues[&edge_id(source, target)].clone();
            incoming.entry(target.clone()).or_default().push((source.clone(), queue.clone()));
            outgoing.entry(source.clone()).or_default().push(queue);
        }

        let mut executors = Vec::with_capacity(nodes.len());
        for (name, node) in nodes {
            let wiring = NodeWiring {
                incoming: incoming.remove(&name).unwrap_or_default(),
                outgoing: outgoing.remove(&name).unwrap_or_default(),
            };
            let executor = NodeExecutor::new(name.clone(), node, wiring, settings.input_interval_secs, settings.processor_interval_secs);
            match executor.start() {
                Ok(running_executor) => {
                    self.events.publish(synchro_core::Event::new(&name, "node.started", &name));
                    executors.push(running_executor);
                }
                Err((node_name, reason)) => {
                    self.events.publish(synchro_core::Event::new(&node_name, "node.acquire_failed", &reason));
                    tracing::error!(node = %node_name, reason = %reason, "node failed to acquire; graph continues without it");
                }
            }
        }

        *self.executors.lock().unwrap() = executors;
        self.running.store(true, Ordering::SeqCst);

        if settings.limits.run_time_seconds > 0 {
            self.arm_watchdog(settings.limits.run_time_seconds);
        }

        Ok(())
    }

    fn arm_watchdog(&self, run_time_seconds: u64) {
        let running = Arc::clone(&self.running);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(run_time_seconds));
            if running.load(Ordering::SeqCst) {
                tracing::info!(run_time_seconds, "watchdog: run-time limit reached, stopping");
                running.store(false, Ordering::SeqCst);
            }
        });
        *self.watchdog.lock().unwrap() = Some(handle);
    }

    /// Signals every executor to stop and joins them. Idempotent and safe to
    /// call from a Ctrl-C handler or the watchdog thread (§5 cancellation).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut executors = self.executors.lock().unwrap();
        for executor in executors.iter_mut() {
            executor.stop();
        }
        self.events.publish(synchro_core::Event::new("graph", "graph.stopped", "stop() completed"));
    }

    /// True once `stop()` has been called (by a signal, the watchdog, or the
    /// caller) but before the internal bookkeeping below has necessarily
    /// finished joining every thread.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Access to the event bus this manager was built with, for external
    /// collaborators (CLI, TUI, agent server) to subscribe to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl Drop for GraphManager {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.watchdog.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

/// Output of [`GraphManager::build`]: materialized nodes and validated
/// edges, not yet started.
pub struct BuiltGraph {
    nodes: NodeTable,
    edges: EdgeList,
    events: EventBus,
}

fn edge_id(source: &str, target: &str) -> String {
    format!("[{source} -> {target}]")
}
