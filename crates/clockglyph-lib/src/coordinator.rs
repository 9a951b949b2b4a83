//! Draw coordinator — cache lookups, in-flight deduplication, bounded round-trips.
//!
//! [`DrawCoordinator::draw`] never dispatches two renders for the same cache
//! key at once: the first caller for a key becomes the leader and performs
//! the round-trip, later callers for that key wait for the leader's result.
//! Every round-trip is bounded by a timeout, and the key leaves the in-flight
//! set whether the render succeeded, failed, timed out or panicked. Followers
//! give up after twice the render timeout.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::RenderCache;
use crate::render::{Bitmap, RenderError, RenderRequest, RenderResponse};
use crate::surface::RenderTransport;

/// Default deadline for one render round-trip.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(5);

type DrawResult = Result<Bitmap, RenderError>;

#[derive(Debug, Default)]
struct DrawState {
    cache: RenderCache,
    /// Key → followers waiting on the leader's result.
    pending: HashMap<String, Vec<Sender<DrawResult>>>,
    /// Bumped by `clear()`; results from an older generation are not cached.
    generation: u64,
}

/// Outcome of the initial lookup under the lock.
enum Lookup {
    Cached(Bitmap),
    Follow(mpsc::Receiver<DrawResult>),
    Lead(u64),
}

/// Releases the leader's key if the round-trip unwinds before settling.
struct LeadGuard<'a, T: RenderTransport> {
    coordinator: &'a DrawCoordinator<T>,
    key: &'a str,
    generation: u64,
    settled: bool,
}

impl<T: RenderTransport> Drop for LeadGuard<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            let aborted = Err(RenderError::Surface("render surface panicked".into()));
            self.coordinator.settle(self.key, self.generation, &aborted);
        }
    }
}

/// Coordinates icon renders over a [`RenderTransport`].
pub struct DrawCoordinator<T: RenderTransport> {
    transport: T,
    timeout: Duration,
    state: Mutex<DrawState>,
}

impl<T: RenderTransport> DrawCoordinator<T> {
    /// Create a coordinator with the default cache capacity and timeout.
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, crate::cache::DEFAULT_CAPACITY, DEFAULT_RENDER_TIMEOUT)
    }

    pub fn with_limits(transport: T, cache_capacity: usize, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            state: Mutex::new(DrawState {
                cache: RenderCache::new(cache_capacity),
                ..DrawState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DrawState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the bitmap for `request`, rendering it at most once per key.
    pub fn draw(&self, request: RenderRequest) -> DrawResult {
        let key = request.cache_key.clone();

        let lookup = {
            let mut state = self.lock();
            if let Some(bitmap) = state.cache.get(&key) {
                Lookup::Cached(bitmap.clone())
            } else if let Some(followers) = state.pending.get_mut(&key) {
                let (tx, rx) = mpsc::channel();
                followers.push(tx);
                Lookup::Follow(rx)
            } else {
                state.pending.insert(key.clone(), Vec::new());
                Lookup::Lead(state.generation)
            }
        };

        match lookup {
            Lookup::Cached(bitmap) => Ok(bitmap),
            Lookup::Follow(rx) => match rx.recv_timeout(self.timeout * 2) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(RenderError::Timeout(self.timeout)),
                Err(RecvTimeoutError::Disconnected) => Err(RenderError::Cleared),
            },
            Lookup::Lead(generation) => {
                let mut lead = LeadGuard {
                    coordinator: self,
                    key: &key,
                    generation,
                    settled: false,
                };
                let result = self.round_trip(request);
                lead.settled = true;
                self.settle(&key, generation, &result);
                result
            }
        }
    }

    /// Dispatch one request and wait for its reply or the deadline.
    fn round_trip(&self, request: RenderRequest) -> DrawResult {
        let key = request.cache_key.clone();
        let reply = self.transport.dispatch(request);
        match reply.recv_timeout(self.timeout) {
            Ok(RenderResponse::Rendered { bitmap, cache_key }) if cache_key == key => Ok(bitmap),
            Ok(RenderResponse::Rendered { cache_key, .. }) => Err(RenderError::Surface(format!(
                "reply for \"{cache_key}\" while waiting for \"{key}\""
            ))),
            Ok(RenderResponse::Failed { error, .. }) => Err(RenderError::Surface(error)),
            Err(RecvTimeoutError::Timeout) => Err(RenderError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(RenderError::Disconnected),
        }
    }

    /// Cache a success, release the key, and hand the result to followers.
    fn settle(&self, key: &str, generation: u64, result: &DrawResult) {
        let followers = {
            let mut state = self.lock();
            if state.generation != generation {
                // Cleared mid-flight: followers were already rejected.
                return;
            }
            if let Ok(bitmap) = result {
                state.cache.insert(key.to_string(), bitmap.clone());
            }
            state.pending.remove(key).unwrap_or_default()
        };
        if let Err(e) = result {
            log::warn!("[draw] {key}: {e}");
        }
        for follower in followers {
            let _ = follower.send(result.clone());
        }
    }

    /// Drop all cached icons and abandon all in-flight renders.
    pub fn clear(&self) {
        let followers: Vec<Sender<DrawResult>> = {
            let mut state = self.lock();
            state.cache.clear();
            state.generation += 1;
            state.pending.drain().flat_map(|(_, f)| f).collect()
        };
        for follower in followers {
            let _ = follower.send(Err(RenderError::Cleared));
        }
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.lock().cache.contains(key)
    }

    pub fn cached_len(&self) -> usize {
        self.lock().cache.len()
    }

    /// Number of keys with a render in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of callers waiting on another caller's render of `key`.
    pub fn followers(&self, key: &str) -> usize {
        self.lock().pending.get(key).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Align;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that answers immediately by rasterizing on the calling thread.
    #[derive(Default)]
    struct InlineTransport {
        dispatches: AtomicUsize,
    }

    impl RenderTransport for InlineTransport {
        fn dispatch(&self, request: RenderRequest) -> mpsc::Receiver<RenderResponse> {
            self.dispatches.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel();
            let cache_key = request.cache_key.clone();
            let response = match crate::render::render_icon(&request) {
                Ok(bitmap) => RenderResponse::Rendered { bitmap, cache_key },
                Err(e) => RenderResponse::Failed {
                    error: e.to_string(),
                    cache_key,
                },
            };
            tx.send(response).unwrap();
            rx
        }
    }

    /// Transport that replies with a fixed cache key, whatever was asked.
    struct WrongKeyTransport;

    impl RenderTransport for WrongKeyTransport {
        fn dispatch(&self, _request: RenderRequest) -> mpsc::Receiver<RenderResponse> {
            let (tx, rx) = mpsc::channel();
            tx.send(RenderResponse::Rendered {
                bitmap: Bitmap::new(1, 1),
                cache_key: "someone-else".into(),
            })
            .unwrap();
            rx
        }
    }

    fn request(text: &str) -> RenderRequest {
        RenderRequest {
            text: text.into(),
            color: "#FFFFFF".into(),
            cache_key: format!("{text}|#FFFFFF"),
            align: Align::Center,
        }
    }

    #[test]
    fn first_draw_renders_and_caches() {
        let coord = DrawCoordinator::new(InlineTransport::default());
        let bitmap = coord.draw(request("9")).unwrap();
        assert!(bitmap.opaque_pixels() > 0);
        assert!(coord.is_cached("9|#FFFFFF"));
        assert_eq!(coord.in_flight(), 0);
    }

    #[test]
    fn cached_draw_does_not_dispatch() {
        let coord = DrawCoordinator::new(InlineTransport::default());
        let first = coord.draw(request("10")).unwrap();
        let second = coord.draw(request("10")).unwrap();
        assert_eq!(first, second);
        assert_eq!(coord.transport().dispatches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_not_cached_and_releases_key() {
        let coord = DrawCoordinator::new(InlineTransport::default());
        let err = coord.draw(request("")).unwrap_err();
        assert!(matches!(err, RenderError::Surface(_)));
        assert!(!coord.is_cached("|#FFFFFF"));
        assert_eq!(coord.in_flight(), 0);
        // A retry dispatches again.
        let _ = coord.draw(request(""));
        assert_eq!(coord.transport().dispatches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mismatched_reply_key_is_an_error() {
        let coord = DrawCoordinator::new(WrongKeyTransport);
        let err = coord.draw(request("3")).unwrap_err();
        assert!(err.to_string().contains("someone-else"), "got: {err}");
        assert_eq!(coord.cached_len(), 0);
    }

    #[test]
    fn cache_capacity_is_respected() {
        let coord =
            DrawCoordinator::with_limits(InlineTransport::default(), 2, DEFAULT_RENDER_TIMEOUT);
        for text in ["1", "2", "3"] {
            coord.draw(request(text)).unwrap();
        }
        assert_eq!(coord.cached_len(), 2);
        assert!(!coord.is_cached("1|#FFFFFF"));
    }

    #[test]
    fn clear_empties_cache() {
        let coord = Arc::new(DrawCoordinator::new(InlineTransport::default()));
        coord.draw(request("4")).unwrap();
        coord.clear();
        assert_eq!(coord.cached_len(), 0);
        coord.draw(request("4")).unwrap();
        assert_eq!(coord.transport().dispatches.load(Ordering::SeqCst), 2);
    }
}
