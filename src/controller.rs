use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::CalendarError;
use crate::observability::*;

/// One kind of fetch cycle: how to turn a request key into published data.
#[async_trait]
pub trait CycleFetch: Send + Sync + 'static {
    type Key: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// `Default` is the conservative value shown before any successful load.
    type Data: Default + Send + Sync + 'static;

    /// Label for logs and metrics.
    fn name(&self) -> &'static str;

    async fn fetch(&self, key: &Self::Key) -> Result<Self::Data, CalendarError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What a controller currently exposes. Replaced as a whole on every change.
#[derive(Debug)]
pub struct Published<K, D> {
    /// Last dispatched key.
    pub key: Option<K>,
    pub data: Arc<D>,
    /// Key `data` was fetched for; `None` for the conservative default.
    pub data_key: Option<K>,
    pub status: LoadStatus,
    /// Error of the last settled cycle, cleared by the next success.
    pub error: Option<CalendarError>,
    /// Generation of the last dispatched cycle.
    pub generation: u64,
}

impl<K: Clone, D> Clone for Published<K, D> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            data: self.data.clone(),
            data_key: self.data_key.clone(),
            status: self.status,
            error: self.error.clone(),
            generation: self.generation,
        }
    }
}

impl<K: PartialEq, D: Default> Published<K, D> {
    fn idle(generation: u64) -> Self {
        Self {
            key: None,
            data: Arc::new(D::default()),
            data_key: None,
            status: LoadStatus::Idle,
            error: None,
            generation,
        }
    }

    pub fn loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// The data belongs to the last dispatched key.
    pub fn is_current(&self) -> bool {
        self.key.is_some() && self.key == self.data_key
    }
}

struct InFlight {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

type Channel<F> = watch::Sender<Published<<F as CycleFetch>::Key, <F as CycleFetch>::Data>>;

/// Runs fetch cycles for a changing key and publishes only the newest one.
///
/// Every dispatch bumps a generation counter inside the watch channel's lock
/// and cancels the previous cycle's token. A cycle publishes only if its
/// generation is still the latest when it settles, so a later-started cycle
/// always wins regardless of completion order.
pub struct Controller<F: CycleFetch> {
    fetcher: Arc<F>,
    tx: Arc<Channel<F>>,
    in_flight: Mutex<Option<InFlight>>,
}

impl<F: CycleFetch> Controller<F> {
    pub fn new(fetcher: F) -> Self {
        let (tx, _) = watch::channel(Published::idle(0));
        Self {
            fetcher: Arc::new(fetcher),
            tx: Arc::new(tx),
            in_flight: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Published<F::Key, F::Data>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Published<F::Key, F::Data> {
        self.tx.borrow().clone()
    }

    pub fn data(&self) -> Arc<F::Data> {
        self.tx.borrow().data.clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.tx.borrow().status
    }

    pub fn loading(&self) -> bool {
        self.tx.borrow().loading()
    }

    pub fn key(&self) -> Option<F::Key> {
        self.tx.borrow().key.clone()
    }

    pub fn error(&self) -> Option<CalendarError> {
        self.tx.borrow().error.clone()
    }

    /// Start a new cycle for `key`, superseding any cycle in flight.
    /// Returns the new generation. Must be called within a Tokio runtime.
    pub fn dispatch(&self, key: F::Key) -> u64 {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = in_flight.take() {
            prev.token.cancel();
        }

        let mut generation = 0;
        self.tx.send_modify(|p| {
            p.generation += 1;
            generation = p.generation;
            p.key = Some(key.clone());
            p.status = LoadStatus::Loading;
        });

        let name = self.fetcher.name();
        debug!(controller = name, generation, ?key, "cycle dispatched");
        metrics::counter!(CYCLES_STARTED_TOTAL, "controller" => name).increment(1);

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let result = tokio::select! {
                _ = cancelled.cancelled() => None,
                r = fetcher.fetch(&key) => Some(r),
            };
            metrics::histogram!(CYCLE_DURATION_SECONDS, "controller" => name)
                .record(started.elapsed().as_secs_f64());
            match result {
                Some(result) => {
                    settle(&tx, name, generation, key, result);
                }
                None => {
                    debug!(controller = name, generation, "cycle cancelled");
                    metrics::counter!(CYCLES_DISCARDED_TOTAL, "controller" => name).increment(1);
                }
            }
        });

        *in_flight = Some(InFlight { token, handle });
        generation
    }

    /// Dispatch only if `key` differs from the last dispatched key.
    pub fn dispatch_if_changed(&self, key: F::Key) -> bool {
        if self.tx.borrow().key.as_ref() == Some(&key) {
            return false;
        }
        self.dispatch(key);
        true
    }

    /// New cycle for the last dispatched key. No-op while idle.
    pub fn refetch(&self) -> Option<u64> {
        let key = self.key()?;
        Some(self.dispatch(key))
    }

    /// Cancel any cycle in flight and return to the idle default.
    pub fn reset(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = in_flight.take() {
            prev.token.cancel();
        }
        self.tx.send_modify(|p| *p = Published::idle(p.generation + 1));
    }

    /// The task of the cycle in flight has finished (or there is none).
    pub fn is_settled(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|f| f.handle.is_finished())
    }
}

impl<F: CycleFetch> Drop for Controller<F> {
    fn drop(&mut self) {
        let in_flight = self.in_flight.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(f) = in_flight.take() {
            f.token.cancel();
            f.handle.abort();
        }
    }
}

/// Apply a settled cycle's result if it is still the newest one.
/// Returns whether anything was published.
pub(crate) fn settle<K, D>(
    tx: &watch::Sender<Published<K, D>>,
    name: &'static str,
    generation: u64,
    key: K,
    result: Result<D, CalendarError>,
) -> bool
where
    K: PartialEq + fmt::Debug,
    D: Default,
{
    tx.send_if_modified(|p| {
        if p.generation != generation {
            debug!(
                controller = name,
                generation,
                latest = p.generation,
                "stale cycle result dropped"
            );
            metrics::counter!(CYCLES_DISCARDED_TOTAL, "controller" => name).increment(1);
            return false;
        }
        match result {
            Ok(data) => {
                p.data = Arc::new(data);
                p.data_key = Some(key);
                p.status = LoadStatus::Ready;
                p.error = None;
                metrics::counter!(
                    CYCLES_PUBLISHED_TOTAL,
                    "controller" => name,
                    "status" => "ready"
                )
                .increment(1);
            }
            Err(e) => {
                warn!(controller = name, generation, ?key, "cycle failed: {e}");
                // keep last known-good data only if it is for this key
                if p.data_key.as_ref() != Some(&key) {
                    p.data = Arc::new(D::default());
                    p.data_key = None;
                }
                p.status = LoadStatus::Failed;
                p.error = Some(e);
                metrics::counter!(
                    CYCLES_PUBLISHED_TOTAL,
                    "controller" => name,
                    "status" => "failed"
                )
                .increment(1);
            }
        }
        true
    })
}
