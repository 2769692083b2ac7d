// src/forecast/bounded.rs

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::ForecastError;
use crate::forecast::{ForecastPoint, ForecastProvider, ForecastRequest};

type Reply = Result<Vec<ForecastPoint>, ForecastError>;

struct Lookup {
    request: ForecastRequest,
    /// Past this instant nobody is waiting for the answer.
    deadline: Instant,
    reply: Sender<Reply>,
}

impl std::fmt::Debug for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lookup").field("key", &self.request.key).finish()
    }
}

/// Decrements the live-worker count when a worker exits, panics included.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn worker_loop(inner: Arc<dyn ForecastProvider>, jobs: Receiver<Lookup>, live: Arc<AtomicUsize>) {
    let _guard = LiveGuard(live);
    while let Ok(lookup) = jobs.recv() {
        if Instant::now() >= lookup.deadline {
            continue;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| inner.forecast(&lookup.request)))
            .unwrap_or_else(|_| Err(ForecastError::unavailable("forecast provider panicked")));
        let _ = lookup.reply.send(result);
    }
}

/// Runs another provider on a fixed pool of worker threads and stops waiting
/// after `timeout`.
///
/// Lookups go through a bounded queue. A full queue fails fast with
/// [`ForecastError::Unavailable`]; a lookup that overruns returns
/// [`ForecastError::Timeout`] and its late answer is dropped. A hung provider
/// can therefore tie up at most `workers` threads, never more.
#[derive(Debug)]
pub struct BoundedForecaster {
    name: String,
    jobs: Sender<Lookup>,
    timeout: Duration,
    queue_capacity: usize,
    live_workers: Arc<AtomicUsize>,
}

impl BoundedForecaster {
    /// Starts `workers` threads (at least one) behind a queue of
    /// `queue_capacity` pending lookups.
    pub fn start(
        inner: Arc<dyn ForecastProvider>,
        timeout: Duration,
        workers: usize,
        queue_capacity: usize,
    ) -> io::Result<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (jobs, rx) = bounded::<Lookup>(queue_capacity);
        let live_workers = Arc::new(AtomicUsize::new(0));

        for idx in 0..workers {
            let inner = Arc::clone(&inner);
            let rx = rx.clone();
            let live = Arc::clone(&live_workers);
            live.fetch_add(1, Ordering::SeqCst);
            let spawned = thread::Builder::new()
                .name(format!("forecast-{idx}"))
                .spawn(move || worker_loop(inner, rx, live));
            if let Err(err) = spawned {
                live_workers.fetch_sub(1, Ordering::SeqCst);
                return Err(err);
            }
        }

        Ok(Self {
            name: inner.name().to_string(),
            jobs,
            timeout,
            queue_capacity,
            live_workers,
        })
    }

    /// Worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }
}

impl ForecastProvider for BoundedForecaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn forecast(&self, request: &ForecastRequest) -> Result<Vec<ForecastPoint>, ForecastError> {
        let (reply, rx) = bounded(1);
        let lookup = Lookup {
            request: request.clone(),
            deadline: Instant::now() + self.timeout,
            reply,
        };

        match self.jobs.try_send(lookup) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(ForecastError::unavailable(format!(
                    "forecast queue full ({} pending)",
                    self.queue_capacity
                )))
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(ForecastError::unavailable("forecast workers have shut down"))
            }
        }

        rx.recv_timeout(self.timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ForecastError::Timeout {
                timeout_ms: self.timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => ForecastError::unavailable("forecast worker exited without a result"),
        })?
    }
}
