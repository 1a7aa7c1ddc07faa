//! Background asset loading with cancellation.
//!
//! Requests run on a rayon pool and report back over a channel owned by the requesting stage.
//! Each request carries a [`LoadTicket`] naming the slot its result belongs to, so arrival
//! order never decides placement. A request whose [`CancelToken`] has fired is never delivered.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::catalog::assets::{AccessoryKind, AssetPath};
use crate::foundation::error::{CakeError, CakeResult};
use crate::foundation::raster::RasterImage;
use crate::loader::source::AssetSource;
use crate::scene::model::SceneNode;

#[derive(Clone, Debug, Default)]
/// Shared cancellation flag. Clones observe the same flag.
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Identity of a load request.
pub enum LoadTicket {
    /// The base cake model.
    Cake { generation: u64 },
    /// The customer's uploaded image for the cake top.
    UploadedImage { generation: u64 },
    /// One catalog variant, destined for `slot` of its selector.
    Variant {
        kind: AccessoryKind,
        generation: u64,
        slot: usize,
    },
}

#[derive(Clone, Debug)]
pub enum LoadedAsset {
    Model(SceneNode),
    Image(RasterImage),
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub result: CakeResult<LoadedAsset>,
}

struct CompletionMsg {
    completion: LoadCompletion,
    token: CancelToken,
}

enum Request {
    Model(AssetPath),
    Image(String),
}

/// Worker pool plus the completion channel for one stage.
pub struct AssetLoadQueue {
    source: Arc<dyn AssetSource>,
    pool: rayon::ThreadPool,
    tx: mpsc::Sender<CompletionMsg>,
    rx: mpsc::Receiver<CompletionMsg>,
    in_flight: usize,
}

impl AssetLoadQueue {
    pub fn new(source: Arc<dyn AssetSource>, threads: Option<usize>) -> CakeResult<Self> {
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            source,
            pool: build_thread_pool(threads)?,
            tx,
            rx,
            in_flight: 0,
        })
    }

    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.source
    }

    /// Requests issued but not yet drained (including cancelled ones still running).
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn request_model(&mut self, ticket: LoadTicket, path: AssetPath, token: CancelToken) {
        self.spawn(ticket, Request::Model(path), token);
    }

    pub fn request_image(&mut self, ticket: LoadTicket, uri: String, token: CancelToken) {
        self.spawn(ticket, Request::Image(uri), token);
    }

    fn spawn(&mut self, ticket: LoadTicket, req: Request, token: CancelToken) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tracing::debug!(?ticket, in_flight = self.in_flight, "asset load requested");

        self.pool.spawn(move || {
            let result = if token.is_cancelled() {
                Err(CakeError::Cancelled)
            } else {
                match &req {
                    Request::Model(path) => source.load_model(path).map(LoadedAsset::Model),
                    Request::Image(uri) => source.load_image(uri).map(LoadedAsset::Image),
                }
            };
            // The receiver is gone when the owning stage was dropped; nothing to report to.
            let _ = tx.send(CompletionMsg {
                completion: LoadCompletion { ticket, result },
                token,
            });
        });
    }

    /// Completions that have already arrived, in arrival order.
    pub fn try_drain(&mut self) -> Vec<LoadCompletion> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let Some(c) = self.accept(msg) {
                out.push(c);
            }
        }
        out
    }

    /// Wait up to `timeout` for the next deliverable completion.
    ///
    /// Returns `None` on timeout or when nothing is in flight.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<LoadCompletion> {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            let msg = self.rx.recv_timeout(left).ok()?;
            if let Some(c) = self.accept(msg) {
                return Some(c);
            }
        }
        None
    }

    fn accept(&mut self, msg: CompletionMsg) -> Option<LoadCompletion> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if msg.token.is_cancelled() {
            tracing::debug!(ticket = ?msg.completion.ticket, "dropping cancelled load");
            return None;
        }
        Some(msg.completion)
    }
}

fn build_thread_pool(threads: Option<usize>) -> CakeResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("cake-load-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CakeError::asset(format!("failed to build loader thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/loader/queue.rs"]
mod tests;
