use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};

use crate::settings::KeyValueStore;

use super::{
    clock::Clock,
    notifier::{NotificationRequest, NotificationScheduler, REST_NOTIFICATION_ID},
    state::RestTimerState,
};

pub const END_AT_KEY: &str = "rest_timer.end_at_ms";
pub const TOTAL_SECONDS_KEY: &str = "rest_timer.total_seconds";

/// Total assumed when an end time is persisted without a usable total.
const RESYNC_FALLBACK_TOTAL_SECONDS: u32 = 90;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestTimerSnapshot {
    pub state: RestTimerState,
    pub progress: f64,
}

impl From<&RestTimerState> for RestTimerSnapshot {
    fn from(state: &RestTimerState) -> Self {
        Self {
            progress: state.progress(),
            state: state.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimerEvent {
    StateChanged(RestTimerSnapshot),
    #[serde(rename_all = "camelCase")]
    Tick { remaining_seconds: u32, progress: f64 },
    /// In-app completion cue. Distinct from the platform notification.
    Completed,
}

struct PersistedCountdown {
    end_at: DateTime<Utc>,
    total_seconds: u32,
}

enum ResyncOutcome {
    Idle,
    Running(u64),
    Expired,
}

/// Countdown between sets. The end time is written to durable storage so the
/// countdown survives suspension and relaunch; `resync` rebuilds state from it.
///
/// Storage and notification failures are logged and never returned.
#[derive(Clone)]
pub struct RestTimer {
    state: Arc<Mutex<RestTimerState>>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationScheduler>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<TimerEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl RestTimer {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationScheduler>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(RestTimerState::default())),
            store,
            notifier,
            clock,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> RestTimerSnapshot {
        let mut guard = self.state.lock().await;
        guard.refresh(self.clock.now());
        RestTimerSnapshot::from(&*guard)
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running()
    }

    pub async fn remaining_seconds(&self) -> u32 {
        self.snapshot().await.state.remaining_seconds
    }

    pub async fn progress(&self) -> f64 {
        self.snapshot().await.progress
    }

    /// Begin a countdown, replacing any running one.
    pub async fn start(&self, duration_seconds: u32) -> RestTimerSnapshot {
        self.cancel_ticker().await;

        let now = self.clock.now();
        let end_at = now + chrono::Duration::seconds(i64::from(duration_seconds));

        let (generation, snapshot) = {
            let mut state = self.state.lock().await;
            persist_countdown(self.store.as_ref(), end_at, duration_seconds);
            if let Err(err) = self
                .notifier
                .schedule(NotificationRequest::rest_complete(duration_seconds))
            {
                warn!("Failed to schedule rest notification: {err:#}");
            }
            let generation = state.begin(duration_seconds, end_at, now);
            (generation, RestTimerSnapshot::from(&*state))
        };

        info!("Rest timer started for {duration_seconds}s");
        self.spawn_ticker(generation).await;
        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Cancel the countdown and its pending notification. A second call with
    /// nothing running does nothing.
    pub async fn stop(&self) {
        self.cancel_ticker().await;

        let snapshot = {
            let mut state = self.state.lock().await;
            let persisted = read_countdown(self.store.as_ref()).is_some();
            if !state.is_running() && !persisted {
                return;
            }

            clear_countdown(self.store.as_ref());
            cancel_notification(self.notifier.as_ref());
            state.reset();
            RestTimerSnapshot::from(&*state)
        };

        info!("Rest timer stopped");
        self.emit(TimerEvent::StateChanged(snapshot));
    }

    pub async fn skip(&self) {
        self.stop().await;
    }

    /// Rebuild state from durable storage after resume or relaunch.
    ///
    /// A future end time resumes ticking without scheduling a new
    /// notification. A past end time counts as expiry and fires the in-app
    /// completion once.
    pub async fn resync(&self) -> RestTimerSnapshot {
        self.cancel_ticker().await;
        let now = self.clock.now();

        let (outcome, snapshot) = {
            let mut state = self.state.lock().await;
            let outcome = match read_countdown(self.store.as_ref()) {
                None => {
                    state.reset();
                    ResyncOutcome::Idle
                }
                Some(persisted) if persisted.end_at > now => ResyncOutcome::Running(state.begin(
                    persisted.total_seconds,
                    persisted.end_at,
                    now,
                )),
                Some(_) => {
                    expire(&mut state, self.store.as_ref(), self.notifier.as_ref());
                    ResyncOutcome::Expired
                }
            };
            (outcome, RestTimerSnapshot::from(&*state))
        };

        match outcome {
            ResyncOutcome::Idle => debug!("Rest timer resync: nothing persisted"),
            ResyncOutcome::Running(generation) => {
                info!(
                    "Rest timer resumed with {}s remaining",
                    snapshot.state.remaining_seconds
                );
                self.spawn_ticker(generation).await;
            }
            ResyncOutcome::Expired => {
                info!("Rest timer expired while suspended");
                self.emit(TimerEvent::Completed);
            }
        }

        self.emit(TimerEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Stop ticking while keeping the persisted countdown, as when the host
    /// process is backgrounded. `resync` picks it back up.
    pub async fn suspend(&self) {
        self.cancel_ticker().await;
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            loop {
                interval.tick().await;

                let expired_snapshot = {
                    let mut guard = state.lock().await;
                    if guard.generation != generation || !guard.is_running() {
                        break;
                    }

                    if guard.refresh(clock.now()) {
                        expire(&mut guard, store.as_ref(), notifier.as_ref());
                        Some(RestTimerSnapshot::from(&*guard))
                    } else {
                        let _ = events.send(TimerEvent::Tick {
                            remaining_seconds: guard.remaining_seconds,
                            progress: guard.progress(),
                        });
                        None
                    }
                };

                if let Some(snapshot) = expired_snapshot {
                    info!("Rest timer finished");
                    let _ = events.send(TimerEvent::Completed);
                    let _ = events.send(TimerEvent::StateChanged(snapshot));
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn expire(
    state: &mut RestTimerState,
    store: &dyn KeyValueStore,
    notifier: &dyn NotificationScheduler,
) {
    clear_countdown(store);
    cancel_notification(notifier);
    state.reset();
}

fn persist_countdown(store: &dyn KeyValueStore, end_at: DateTime<Utc>, total_seconds: u32) {
    let result = store
        .set(END_AT_KEY, json!(end_at.timestamp_millis()))
        .and_then(|_| store.set(TOTAL_SECONDS_KEY, json!(total_seconds)));
    if let Err(err) = result {
        warn!("Failed to persist rest timer: {err:#}");
    }
}

fn clear_countdown(store: &dyn KeyValueStore) {
    let result = store
        .remove(END_AT_KEY)
        .and_then(|_| store.remove(TOTAL_SECONDS_KEY));
    if let Err(err) = result {
        warn!("Failed to clear rest timer state: {err:#}");
    }
}

fn cancel_notification(notifier: &dyn NotificationScheduler) {
    if let Err(err) = notifier.cancel(REST_NOTIFICATION_ID) {
        warn!("Failed to cancel rest notification: {err:#}");
    }
}

/// A failed or malformed read is treated as nothing persisted.
fn read_countdown(store: &dyn KeyValueStore) -> Option<PersistedCountdown> {
    let end_at_ms = match store.get(END_AT_KEY) {
        Ok(value) => value?.as_i64()?,
        Err(err) => {
            warn!("Failed to read rest timer state: {err:#}");
            return None;
        }
    };
    let end_at = Utc.timestamp_millis_opt(end_at_ms).single()?;

    let total_seconds = store
        .get(TOTAL_SECONDS_KEY)
        .ok()
        .flatten()
        .and_then(|value| value.as_u64())
        .and_then(|value| u32::try_from(value).ok())
        .filter(|value| *value > 0)
        .unwrap_or(RESYNC_FALLBACK_TOTAL_SECONDS);

    Some(PersistedCountdown {
        end_at,
        total_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::MemoryStore,
        timer::clock::ManualClock,
    };
    use anyhow::anyhow;
    use serde_json::Value;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingNotifier {
        scheduled: StdMutex<Vec<NotificationRequest>>,
        cancelled: StdMutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn scheduled(&self) -> Vec<NotificationRequest> {
            self.scheduled.lock().unwrap().clone()
        }

        fn cancel_count(&self) -> usize {
            self.cancelled.lock().unwrap().len()
        }
    }

    impl NotificationScheduler for RecordingNotifier {
        fn schedule(&self, request: NotificationRequest) -> anyhow::Result<()> {
            self.scheduled.lock().unwrap().push(request);
            Ok(())
        }

        fn cancel(&self, id: &str) -> anyhow::Result<()> {
            self.cancelled.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
            Err(anyhow!("disk unavailable"))
        }

        fn set(&self, _key: &str, _value: Value) -> anyhow::Result<()> {
            Err(anyhow!("disk unavailable"))
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow!("disk unavailable"))
        }
    }

    struct Harness {
        timer: RestTimer,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<ManualClock>,
    }

    fn harness(tick: Duration) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::default());
        let timer = RestTimer::new(store.clone(), notifier.clone(), clock.clone(), tick);
        Harness {
            timer,
            store,
            notifier,
            clock,
        }
    }

    fn completed_count(rx: &mut broadcast::Receiver<TimerEvent>) -> usize {
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            if event == TimerEvent::Completed {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn immediate_resync_keeps_the_countdown_running() {
        let h = harness(Duration::from_secs(60));

        let started = h.timer.start(90).await;
        assert!(started.state.is_running());
        assert_eq!(started.state.remaining_seconds, 90);

        let resynced = h.timer.resync().await;
        assert!(resynced.state.is_running());
        assert_eq!(resynced.state.remaining_seconds, 90);
        assert_eq!(resynced.state.total_seconds, 90);

        // Resync relies on the notification scheduled by start.
        let scheduled = h.notifier.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, REST_NOTIFICATION_ID);
        assert_eq!(scheduled[0].fire_in_seconds, 90);
    }

    #[tokio::test]
    async fn resync_past_the_end_fires_completion_once() {
        let h = harness(Duration::from_secs(60));
        h.timer.start(5).await;
        h.timer.suspend().await;
        h.clock.advance(chrono::Duration::seconds(6));

        let mut rx = h.timer.subscribe();
        let snapshot = h.timer.resync().await;
        assert!(!snapshot.state.is_running());
        assert_eq!(snapshot.state.remaining_seconds, 0);
        assert_eq!(completed_count(&mut rx), 1);
        assert_eq!(h.store.get(END_AT_KEY).unwrap(), None);

        h.timer.resync().await;
        assert_eq!(completed_count(&mut rx), 0);
    }

    #[tokio::test]
    async fn relaunch_recovers_from_the_shared_store() {
        let h = harness(Duration::from_secs(60));
        h.timer.start(90).await;
        h.timer.suspend().await;
        h.clock.advance(chrono::Duration::seconds(30));

        let relaunched = RestTimer::new(
            h.store.clone(),
            h.notifier.clone(),
            h.clock.clone(),
            Duration::from_secs(60),
        );
        assert!(!relaunched.is_running().await);

        let snapshot = relaunched.resync().await;
        assert!(snapshot.state.is_running());
        assert_eq!(snapshot.state.remaining_seconds, 60);
        assert_eq!(snapshot.state.total_seconds, 90);
        assert!((snapshot.progress - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let h = harness(Duration::from_secs(60));
        h.timer.start(60).await;

        h.timer.stop().await;
        h.timer.stop().await;

        assert_eq!(h.notifier.cancel_count(), 1);
        assert!(!h.timer.is_running().await);
        assert_eq!(h.timer.progress().await, 0.0);
        assert_eq!(h.store.get(TOTAL_SECONDS_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn restarting_replaces_the_countdown() {
        let h = harness(Duration::from_secs(60));
        h.timer.start(90).await;
        h.clock.advance(chrono::Duration::seconds(10));
        let snapshot = h.timer.start(30).await;

        assert_eq!(snapshot.state.total_seconds, 30);
        assert_eq!(snapshot.state.remaining_seconds, 30);
        assert_eq!(h.store.get(TOTAL_SECONDS_KEY).unwrap(), Some(json!(30)));

        let ids: Vec<String> = h.notifier.scheduled().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![REST_NOTIFICATION_ID.to_string(); 2]);
    }

    #[tokio::test]
    async fn storage_failures_fall_back_to_idle() {
        let notifier = Arc::new(RecordingNotifier::default());
        let timer = RestTimer::new(
            Arc::new(FailingStore),
            notifier,
            Arc::new(ManualClock::default()),
            Duration::from_secs(60),
        );

        // The in-memory countdown still runs for this process.
        assert!(timer.start(45).await.state.is_running());

        let snapshot = timer.resync().await;
        assert!(!snapshot.state.is_running());
    }

    #[tokio::test]
    async fn ticker_expires_the_countdown() {
        let h = harness(Duration::from_millis(10));
        let mut rx = h.timer.subscribe();
        h.timer.start(5).await;
        h.clock.advance(chrono::Duration::seconds(6));

        let completed = time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(TimerEvent::Completed) => break true,
                    Ok(_) => continue,
                    Err(_) => break false,
                }
            }
        })
        .await
        .unwrap();
        assert!(completed);

        assert!(!h.timer.is_running().await);
        assert_eq!(h.store.get(END_AT_KEY).unwrap(), None);
        assert_eq!(h.notifier.cancel_count(), 1);
    }
}
