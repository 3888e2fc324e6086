//! Stream-driven session: a location source and a one second ticker both
//! feed a single mutex-guarded [`Accumulator`].
//!
//! Every stream is spawned for one session epoch. Starting or stopping
//! bumps the epoch under the lock, so an update that was already in flight
//! when `stop()` ran finds a stale epoch and is discarded.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use model::Position;
use parking_lot::Mutex;
use stride_ingest_core::{channel, now_ms, LocationError, LocationEvent, LocationRx, LocationSource};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::accumulator::{Accumulator, SessionRecord, SessionState, TrackerConfig};
use crate::error::TrackError;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub tracker: TrackerConfig,
    /// Period of the elapsed-time tick; one second outside of tests.
    pub tick: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { tracker: TrackerConfig::default(), tick: Duration::from_secs(1) }
    }
}

struct Inner {
    acc: Accumulator,
    epoch: u64,
    last_error: Option<LocationError>,
}

struct Streams {
    source: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl Streams {
    fn cancel(self) {
        // dropping the source future drops its sender, which ends the pump
        self.source.abort();
        self.ticker.abort();
    }
}

pub struct LiveSession {
    inner: Arc<Mutex<Inner>>,
    tick: Duration,
    streams: Option<Streams>,
}

impl LiveSession {
    pub fn new(cfg: LiveConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                acc: Accumulator::new(cfg.tracker),
                epoch: 0,
                last_error: None,
            })),
            tick: cfg.tick,
            streams: None,
        }
    }

    /// Start (or restart) a session fed by `source`. Must be called from
    /// within a tokio runtime. Fails without touching the record when the
    /// source reports it cannot provide positions.
    pub fn start(&mut self, source: Arc<dyn LocationSource>) -> Result<(), TrackError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|_| TrackError::NoRuntime)?;
        if !source.is_available() {
            log::warn!("refusing to start: location source unavailable");
            return Err(TrackError::LocationUnavailable);
        }
        self.release_streams();

        let (tx, rx) = channel();
        let epoch = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.last_error = None;
            inner.acc.start(now_ms());
            inner.epoch
        };

        let shared = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name(format!("stride-pump-{epoch}"))
            .spawn(move || pump(shared, rx, epoch));
        if let Err(e) = spawned {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.acc.stop();
            return Err(TrackError::Spawn(e.to_string()));
        }

        let source = rt.spawn(async move {
            if let Err(e) = source.run(tx).await {
                log::error!("location source ended with error: {e}");
            }
        });
        let ticker = rt.spawn(tick_loop(Arc::clone(&self.inner), epoch, self.tick));
        self.streams = Some(Streams { source, ticker });
        log::info!("session {epoch} started");
        Ok(())
    }

    pub fn pause(&self) -> Result<(), TrackError> {
        self.inner.lock().acc.pause()
    }

    pub fn resume(&self) -> Result<(), TrackError> {
        self.inner.lock().acc.resume()
    }

    /// Cancel both streams and return the frozen record. Repeated calls
    /// return `None`.
    pub fn stop(&mut self) -> Option<SessionRecord> {
        let record = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.acc.stop()
        };
        self.release_streams();
        if let Some(r) = &record {
            log::info!(
                "session stopped: {} km in {}",
                r.formatted_distance(),
                r.formatted_elapsed()
            );
        }
        record
    }

    pub fn snapshot(&self) -> SessionRecord {
        self.inner.lock().acc.record().clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().acc.state()
    }

    /// Latest transient acquisition error, cleared on start.
    pub fn last_error(&self) -> Option<LocationError> {
        self.inner.lock().last_error.clone()
    }

    pub fn is_source_running(&self) -> bool {
        self.streams.as_ref().map(|s| !s.source.is_finished()).unwrap_or(false)
    }

    fn release_streams(&mut self) {
        if let Some(streams) = self.streams.take() {
            streams.cancel();
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.inner.lock().epoch += 1;
        self.release_streams();
    }
}

fn pump(shared: Arc<Mutex<Inner>>, rx: LocationRx, epoch: u64) {
    for event in rx.iter() {
        if !apply_event(&shared, epoch, event) {
            break;
        }
    }
    log::debug!("pump for session {epoch} finished");
}

/// Apply one event if `epoch` is still current. Returns false once stale.
fn apply_event(shared: &Mutex<Inner>, epoch: u64, event: LocationEvent) -> bool {
    let mut inner = shared.lock();
    if inner.epoch != epoch {
        return false;
    }
    match event {
        LocationEvent::Fix(s) => {
            let outcome = inner.acc.on_position(Position {
                latitude: s.latitude,
                longitude: s.longitude,
                timestamp_ms: s.timestamp_ms,
            });
            log::trace!("sample at {} -> {:?}", s.timestamp_ms, outcome);
        }
        LocationEvent::Error(e) => {
            log::warn!("location error: {e}");
            inner.last_error = Some(e);
        }
    }
    true
}

async fn tick_loop(shared: Arc<Mutex<Inner>>, epoch: u64, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let mut inner = shared.lock();
        if inner.epoch != epoch {
            break;
        }
        inner.acc.on_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stride_ingest_core::{IngestError, LocationSample, LocationTx, ReplaySource};

    const TICK: Duration = Duration::from_millis(10);

    fn session() -> LiveSession {
        LiveSession::new(LiveConfig { tick: TICK, ..Default::default() })
    }

    async fn wait_for(s: &LiveSession, what: impl Fn(&SessionRecord) -> bool) -> SessionRecord {
        for _ in 0..300 {
            let snap = s.snapshot();
            if what(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached: {:?}", s.snapshot());
    }

    struct Unavailable;

    #[async_trait::async_trait]
    impl LocationSource for Unavailable {
        fn is_available(&self) -> bool {
            false
        }
        async fn run(&self, _tx: LocationTx) -> Result<(), IngestError> {
            Ok(())
        }
    }

    /// Streams a fix every millisecond forever and flags when it is torn down.
    struct Endless {
        dropped: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl LocationSource for Endless {
        async fn run(&self, tx: LocationTx) -> Result<(), IngestError> {
            let _guard = SetOnDrop(Arc::clone(&self.dropped));
            let mut lat = 0.0;
            loop {
                tokio::time::sleep(Duration::from_millis(1)).await;
                lat += 0.0001;
                let _ = tx.send(LocationEvent::Fix(LocationSample::new(lat, 0.0, now_ms())));
            }
        }
    }

    fn track(n: usize) -> ReplaySource {
        let samples = (0..n)
            .map(|i| LocationSample::new(i as f64 * 0.0001, 0.0, i as i64 * 5_000))
            .collect();
        ReplaySource::from_samples(samples, Duration::from_millis(2))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unavailable_source_stays_idle() {
        let mut s = session();
        assert_eq!(s.start(Arc::new(Unavailable)), Err(TrackError::LocationUnavailable));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(!s.is_source_running());
        assert_eq!(s.snapshot(), SessionRecord::default());
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut s = session();
        assert_eq!(s.start(Arc::new(track(1))), Err(TrackError::NoRuntime));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_replay_accumulates_distance() {
        let mut s = session();
        s.start(Arc::new(track(10))).unwrap();
        let snap = wait_for(&s, |r| r.positions.len() == 10).await;
        // nine increments of 0.0001 degree latitude
        let expected = crate::geo::haversine_m(0.0, 0.0, 0.0009, 0.0);
        assert!((snap.distance_m - expected).abs() < 1e-6);
        assert!(snap.steps_estimate > 0);

        let rec = s.stop().unwrap();
        assert!(!rec.active);
        assert!(s.stop().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ticks_count_and_pause_freezes() {
        let mut s = session();
        s.start(Arc::new(track(0))).unwrap();
        wait_for(&s, |r| r.elapsed_seconds >= 3).await;

        s.pause().unwrap();
        let frozen = s.snapshot().elapsed_seconds;
        tokio::time::sleep(TICK * 10).await;
        assert_eq!(s.snapshot().elapsed_seconds, frozen);
        assert_eq!(s.state(), SessionState::Paused);

        s.resume().unwrap();
        wait_for(&s, |r| r.elapsed_seconds > frozen).await;
        s.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_nothing_changes_after_stop() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut s = session();
        s.start(Arc::new(Endless { dropped: Arc::clone(&dropped) })).unwrap();
        wait_for(&s, |r| r.positions.len() > 5 && r.elapsed_seconds > 1).await;

        let rec = s.stop().unwrap();
        tokio::time::sleep(TICK * 10).await;
        assert_eq!(s.snapshot(), rec);
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!s.is_source_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_releases_streams() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut s = session();
        s.start(Arc::new(Endless { dropped: Arc::clone(&dropped) })).unwrap();
        wait_for(&s, |r| !r.positions.is_empty()).await;
        drop(s);
        for _ in 0..100 {
            if dropped.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("source still running after drop");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_resets_and_replaces_streams() {
        let first = Arc::new(AtomicBool::new(false));
        let mut s = session();
        s.start(Arc::new(Endless { dropped: Arc::clone(&first) })).unwrap();
        wait_for(&s, |r| r.positions.len() > 3).await;

        s.start(Arc::new(track(0))).unwrap();
        let snap = s.snapshot();
        assert!(snap.positions.is_empty());
        assert_eq!(snap.distance_m, 0.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first.load(Ordering::SeqCst));
        assert!(s.snapshot().positions.is_empty());
        s.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_transient_errors_are_kept_not_fatal() {
        let src = ReplaySource::new(
            vec![
                LocationEvent::Fix(LocationSample::new(0.0, 0.0, 0)),
                LocationEvent::Error(LocationError::Timeout(Duration::from_secs(5))),
                LocationEvent::Fix(LocationSample::new(0.001, 0.0, 30_000)),
            ],
            Duration::from_millis(2),
        );
        let mut s = session();
        s.start(Arc::new(src)).unwrap();
        wait_for(&s, |r| r.positions.len() == 2).await;
        assert_eq!(s.last_error(), Some(LocationError::Timeout(Duration::from_secs(5))));
        assert_eq!(s.state(), SessionState::Active);
        s.stop();
    }

    #[test]
    fn test_stale_epoch_update_is_dropped() {
        let shared = Mutex::new(Inner { acc: Accumulator::default(), epoch: 1, last_error: None });
        shared.lock().acc.start(0);
        let fix = LocationEvent::Fix(LocationSample::new(0.0, 0.0, 0));

        assert!(apply_event(&shared, 1, fix.clone()));
        assert_eq!(shared.lock().acc.record().positions.len(), 1);

        // stop() bumps the epoch before an in-flight update gets the lock
        {
            let mut inner = shared.lock();
            inner.epoch += 1;
            inner.acc.stop();
        }
        let late = LocationEvent::Fix(LocationSample::new(0.01, 0.0, 1_000));
        assert!(!apply_event(&shared, 1, late));
        assert_eq!(shared.lock().acc.record().positions.len(), 1);
        assert_eq!(shared.lock().acc.record().distance_m, 0.0);
    }
}
