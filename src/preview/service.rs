//! Render pool - owns worker threads and the request/response channels

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::cancel::CancellationToken;
use super::engine::{DocumentEngine, DocumentSource, PageSource, RenderTarget};
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::worker::render_worker;

/// Worker threads pulling from a shared request queue
pub struct RenderPool {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    workers: Vec<JoinHandle<()>>,
}

impl RenderPool {
    #[must_use]
    pub fn new(engine: Arc<dyn DocumentEngine>, num_workers: usize) -> Self {
        // flume channels are MPMC: every worker clones the receiver and pulls
        // from the same queue.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);
        for n in 0..num_workers {
            let engine = Arc::clone(&engine);
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("pagepick-render-{n}"))
                .spawn(move || render_worker(engine, rx, tx));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => warn!("Failed to spawn render worker {n}: {e}"),
            }
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            workers,
        }
    }

    /// Queue a document load
    pub fn load(&mut self, blob: Arc<[u8]>, cancel: CancellationToken) -> RequestId {
        let id = self.next_id();
        self.send(RenderRequest::Load { id, blob, cancel });
        id
    }

    /// Queue a page render
    pub fn render_page(
        &mut self,
        index: usize,
        page: Arc<dyn PageSource>,
        target: RenderTarget,
        cancel: CancellationToken,
    ) -> RequestId {
        let id = self.next_id();
        self.send(RenderRequest::Page {
            id,
            index,
            page,
            target,
            cancel,
        });
        id
    }

    /// Queue a metadata read
    pub fn metadata(&mut self, document: Arc<dyn DocumentSource>) -> RequestId {
        let id = self.next_id();
        self.send(RenderRequest::Metadata { id, document });
        id
    }

    /// Drain every response that is ready without blocking
    pub fn poll_responses(&self) -> Vec<RenderResponse> {
        self.response_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for one response
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RenderResponse> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("All render workers have exited");
                None
            }
        }
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.workers.len() {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    /// Shutdown all workers and wait for them to exit.
    ///
    /// Requests queued before the call are still answered, so every response
    /// a worker will ever send is in the channel once this returns.
    pub fn shutdown_and_join(&mut self) {
        self.shutdown();
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("render").to_string();
            if handle.join().is_err() {
                warn!("Render worker {name} panicked");
            }
        }
    }

    fn send(&self, request: RenderRequest) {
        if self.request_tx.send(request).is_err() {
            debug!("Render queue closed, dropping request");
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
