//! Sequential background workers and request generations.
//!
//! A [`SerialWorker`] runs blocking jobs one at a time, in submission order,
//! on tokio's blocking pool. A [`Generation`] hands out [`RequestTicket`]s;
//! only the newest ticket is current, and work holding an older ticket
//! discards its result instead of publishing it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A single-threaded FIFO job queue.
#[derive(Debug, Clone)]
pub struct SerialWorker {
    name: &'static str,
    tx: mpsc::UnboundedSender<Job>,
}

impl SerialWorker {
    /// Start a worker on the current tokio runtime.
    pub fn spawn(name: &'static str) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            Error::Configuration(format!("Worker {name} needs a tokio runtime: {e}"))
        })?;
        Ok(Self::spawn_on(name, &handle))
    }

    /// Start a worker on `handle`. The worker stops once every clone of it
    /// has been dropped and its queue is drained.
    pub fn spawn_on(name: &'static str, handle: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let blocking = handle.clone();
        handle.spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = blocking.spawn_blocking(job).await {
                    warn!("Job on worker {} failed: {}", name, e);
                }
            }
            debug!("Worker {} stopped", name);
        });
        Self { name, tx }
    }

    /// Worker name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `job`. Returns `false` if the worker has stopped.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            warn!("Worker {} is gone, dropping job", self.name);
            return false;
        }
        true
    }

    /// Wait until every job queued before this call has finished.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.submit(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.await;
        }
    }
}

/// Source of monotonically increasing request ids.
#[derive(Debug, Clone)]
pub struct Generation {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl Generation {
    /// Start at generation zero.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Begin a new request, superseding every earlier ticket.
    #[must_use]
    pub fn advance(&self) -> RequestTicket {
        let mut id = 0;
        self.tx.send_modify(|current| {
            *current += 1;
            id = *current;
        });
        RequestTicket {
            id,
            rx: self.tx.subscribe(),
        }
    }

    /// Id of the newest request.
    #[must_use]
    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }
}

/// Proof of which request a piece of work belongs to.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    rx: watch::Receiver<u64>,
}

impl RequestTicket {
    /// Request id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether no newer request has started.
    #[must_use]
    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.id
    }
}
