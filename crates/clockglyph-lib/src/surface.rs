//! Render surface — the isolated worker that actually rasterizes icons.
//!
//! The coordinator only sees [`RenderTransport`]: hand over a request, get a
//! reply channel back. [`OffscreenSurface`] is the production transport, a
//! lazily spawned worker thread that shuts itself down when idle and is
//! respawned on the next request.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::render::{self, RenderRequest, RenderResponse};

/// Request/response channel to a render surface.
///
/// Each dispatch gets its own reply channel, so a response can only ever be
/// matched to the request that produced it. Dropping the receiver discards a
/// late reply.
pub trait RenderTransport: Send + Sync {
    fn dispatch(&self, request: RenderRequest) -> Receiver<RenderResponse>;
}

/// One queued render: the request plus where to send the reply.
type Job = (RenderRequest, Sender<RenderResponse>);

/// How long the worker waits for work before exiting.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

struct Worker {
    jobs: Sender<Job>,
    handle: JoinHandle<()>,
}

/// Worker-thread render surface, created on first use.
pub struct OffscreenSurface {
    idle_timeout: Duration,
    /// Guards creation: concurrent first dispatches spawn exactly one worker.
    worker: Mutex<Option<Worker>>,
}

impl Default for OffscreenSurface {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl OffscreenSurface {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            worker: Mutex::new(None),
        }
    }

    /// Whether a worker thread is currently alive.
    pub fn is_running(&self) -> bool {
        let guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    fn spawn_worker(&self) -> Worker {
        let (jobs, rx) = mpsc::channel::<Job>();
        let idle_timeout = self.idle_timeout;
        let handle = std::thread::spawn(move || run_worker(rx, idle_timeout));
        log::debug!("[surface] render worker started");
        Worker { jobs, handle }
    }

    /// Stop the worker, waiting for it to finish the job it is on.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(Worker { jobs, handle }) = worker {
            drop(jobs);
            let _ = handle.join();
            log::debug!("[surface] render worker stopped");
        }
    }
}

impl RenderTransport for OffscreenSurface {
    fn dispatch(&self, request: RenderRequest) -> Receiver<RenderResponse> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let mut guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());

        let mut job = (request, reply_tx);
        // At most two attempts: the current worker, then a fresh one if the
        // current worker already exited on idle.
        for _ in 0..2 {
            let worker = guard.get_or_insert_with(|| self.spawn_worker());
            match worker.jobs.send(job) {
                Ok(()) => return reply_rx,
                Err(mpsc::SendError(returned)) => {
                    job = returned;
                    *guard = None;
                }
            }
        }
        log::warn!("[surface] could not reach render worker");
        // `job` (and its reply sender) is dropped here: the caller sees a disconnect.
        reply_rx
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(jobs: Receiver<Job>, idle_timeout: Duration) {
    loop {
        match jobs.recv_timeout(idle_timeout) {
            Ok((request, reply)) => {
                let cache_key = request.cache_key.clone();
                let response = match render::render_icon(&request) {
                    Ok(bitmap) => RenderResponse::Rendered { bitmap, cache_key },
                    Err(e) => RenderResponse::Failed {
                        error: e.to_string(),
                        cache_key,
                    },
                };
                // The requester may have timed out and gone; nothing to do then.
                let _ = reply.send(response);
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!("[surface] render worker idle, exiting");
                return;
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
