//! Countdown engine.
//!
//! Ties the time source, phase calculator, tick scheduler and milestone
//! latch together behind one explicitly constructed handle.
//!
//! ## Lifecycle
//!
//! ```text
//! build -> start -> (tick ...) -> stop
//! ```
//!
//! `start()` paints once immediately and then spawns the boundary-aligned
//! tick task on the current tokio runtime; `stop()` cancels it. A clock sync
//! still in flight when `stop()` runs is allowed to finish, but its result
//! is dropped.
//!
//! Ticks, scheduled or manual, and sync results are applied one at a time
//! under a single gate, so the phase sequence seen by subscribers never
//! goes backwards because of a race. Callbacks and the go-live effect may
//! query the engine but must not call `tick`, `sync`, `start` or `stop`.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = CountdownEngine::builder(window)
//!     .on_live(|| println!("we're live"))
//!     .build();
//! let mut events = engine.subscribe_events();
//! let _sub = engine.subscribe(|snap| println!("{}", snap.remaining));
//! engine.start();
//! engine.sync(&client).await;
//! while let Ok(event) = events.recv().await { /* ... */ }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::clock::{Clock, ClockState, SystemClock, TimeSource};
use super::milestone::{MilestoneEffect, MilestoneLatch};
use super::phase::{compute_phase_ms, notice_at_ms, CountdownNotice, Phase, RemainingDuration};
use super::scheduler::{TickScheduler, DEFAULT_TICK_EPSILON};
use super::window::EventWindow;
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::events::Event;

/// Events buffered per [`CountdownEngine::subscribe_events`] receiver.
const EVENT_CAPACITY: usize = 64;

/// Pull-based view of the engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub remaining: RemainingDuration,
    pub synced: bool,
    pub notice: Option<CountdownNotice>,
}

type Callback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Handle returned by [`CountdownEngine::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

struct EngineState {
    last_phase: Option<Phase>,
    snapshot: Snapshot,
    latch: MilestoneLatch,
}

struct Lifecycle {
    scheduler: Option<TickScheduler>,
    /// Cancelled and replaced on stop; sync results and scheduled ticks
    /// captured under a cancelled generation are discarded.
    generation: CancellationToken,
}

struct Inner {
    window: EventWindow,
    time: Arc<TimeSource>,
    tick_epsilon: Duration,
    /// Held for the whole of a tick or sync application.
    tick_gate: Mutex<()>,
    state: Mutex<EngineState>,
    subscribers: Arc<Mutex<Subscribers>>,
    events: broadcast::Sender<Event>,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

/// Builder for [`CountdownEngine`].
pub struct EngineBuilder {
    window: EventWindow,
    clock: Arc<dyn Clock>,
    tick_epsilon: Duration,
    on_live: Option<MilestoneEffect>,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tick_epsilon(mut self, epsilon: Duration) -> Self {
        self.tick_epsilon = epsilon;
        self
    }

    /// Effect run exactly once, when the event first goes live.
    pub fn on_live<F>(mut self, effect: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_live = Some(Box::new(effect));
        self
    }

    pub fn build(self) -> CountdownEngine {
        let time = Arc::new(TimeSource::new(self.clock));
        let snapshot = snapshot_at(time.now_ms(), &self.window, false);
        let latch = match self.on_live {
            Some(effect) => MilestoneLatch::with_effect(effect),
            None => MilestoneLatch::new(),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        CountdownEngine {
            inner: Arc::new(Inner {
                window: self.window,
                time,
                tick_epsilon: self.tick_epsilon,
                tick_gate: Mutex::new(()),
                state: Mutex::new(EngineState {
                    last_phase: None,
                    snapshot,
                    latch,
                }),
                subscribers: Arc::new(Mutex::new(Subscribers::default())),
                events,
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle {
                    scheduler: None,
                    generation: CancellationToken::new(),
                }),
            }),
        }
    }
}

/// Countdown engine handle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CountdownEngine {
    inner: Arc<Inner>,
}

impl CountdownEngine {
    pub fn builder(window: EventWindow) -> EngineBuilder {
        EngineBuilder {
            window,
            clock: Arc::new(SystemClock),
            tick_epsilon: DEFAULT_TICK_EPSILON,
            on_live: None,
        }
    }

    /// Engine on the system clock with no go-live effect.
    pub fn new(window: EventWindow) -> Self {
        Self::builder(window).build()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn window(&self) -> &EventWindow {
        &self.inner.window
    }

    pub fn snapshot(&self) -> Snapshot {
        lock(&self.inner.state).snapshot
    }

    pub fn clock_state(&self) -> ClockState {
        self.inner.time.state()
    }

    /// Corrected current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.time.now()
    }

    pub fn milestone_fired(&self) -> bool {
        lock(&self.inner.state).latch.fired()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Register a callback run after every tick and every sync.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let mut subs = lock(&self.inner.subscribers);
        let id = subs.next_id;
        subs.next_id += 1;
        subs.entries.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner.subscribers),
        }
    }

    /// Receive every event the engine emits from now on, including those
    /// of scheduled ticks, in emission order.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Paint once and start ticking.
    ///
    /// Returns `CountdownStarted` followed by the initial tick's events,
    /// or nothing if already running. Must be called from within a tokio
    /// runtime.
    pub fn start(&self) -> Vec<Event> {
        let mut lifecycle = lock(&self.inner.lifecycle);
        if lifecycle.scheduler.is_some() {
            return Vec::new();
        }
        self.inner.running.store(true, Ordering::SeqCst);

        let events = {
            let gate = lock(&self.inner.tick_gate);
            let tick_events = self.run_tick(&gate);
            let mut events = Vec::with_capacity(tick_events.len() + 1);
            events.push(Event::CountdownStarted {
                phase: self.snapshot().phase,
                at: self.now(),
            });
            events.extend(tick_events);
            self.broadcast(&events);
            events
        };

        let generation = lifecycle.generation.clone();
        let weak = Arc::downgrade(&self.inner);
        lifecycle.scheduler = Some(TickScheduler::spawn(
            self.inner.time.clone(),
            self.inner.tick_epsilon,
            move || {
                if let Some(inner) = weak.upgrade() {
                    CountdownEngine { inner }.scheduled_tick(&generation);
                }
            },
        ));
        tracing::info!(
            start = %self.inner.window.start(),
            end = %self.inner.window.end(),
            "countdown started"
        );
        events
    }

    /// Stop ticking. Returns `None` if not running.
    ///
    /// Waits for a tick already in progress; none starts after this returns.
    pub fn stop(&self) -> Option<Event> {
        let mut lifecycle = lock(&self.inner.lifecycle);
        let mut scheduler = lifecycle.scheduler.take()?;
        scheduler.stop();
        lifecycle.generation.cancel();
        lifecycle.generation = CancellationToken::new();
        self.inner.running.store(false, Ordering::SeqCst);

        let _gate = lock(&self.inner.tick_gate);
        drop(lifecycle);
        let event = Event::CountdownStopped { at: self.now() };
        self.broadcast(std::slice::from_ref(&event));
        tracing::info!("countdown stopped");
        Some(event)
    }

    /// Recompute phase and remaining time now and publish to subscribers.
    pub fn tick(&self) -> Vec<Event> {
        let gate = lock(&self.inner.tick_gate);
        let events = self.run_tick(&gate);
        self.broadcast(&events);
        events
    }

    /// Learn the backend clock offset from `GET /health`.
    ///
    /// Never fails: errors leave the previous offset in place and show up
    /// as [`Event::ClockSyncFailed`].
    pub async fn sync(&self, client: &ApiClient) -> Vec<Event> {
        self.sync_with(|| client.server_time()).await
    }

    /// Like [`sync`](Self::sync) with a caller-supplied server-time probe.
    pub async fn sync_with<F, Fut>(&self, probe: F) -> Vec<Event>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DateTime<Utc>, ApiError>>,
    {
        let generation = lock(&self.inner.lifecycle).generation.clone();
        let outcome = probe().await;
        let local_at_receipt = self.inner.time.local_ms();
        self.apply_sync_outcome(&generation, outcome, local_at_receipt)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply_sync_outcome(
        &self,
        generation: &CancellationToken,
        outcome: Result<DateTime<Utc>, ApiError>,
        local_at_receipt: i64,
    ) -> Vec<Event> {
        let gate = lock(&self.inner.tick_gate);
        if generation.is_cancelled() {
            tracing::debug!("engine stopped while syncing, discarding result");
            return Vec::new();
        }

        let state = self
            .inner
            .time
            .apply_sync(outcome.as_ref().copied(), local_at_receipt);
        let at = self.now();
        let mut events = vec![match outcome {
            Ok(_) => Event::ClockSynced {
                offset_ms: state.offset_ms,
                at,
            },
            Err(err) => Event::ClockSyncFailed {
                reason: err.to_string(),
                offset_ms: state.offset_ms,
                at,
            },
        }];
        events.extend(self.run_tick(&gate));
        self.broadcast(&events);
        events
    }

    /// Tick from the scheduler; skipped once its generation is cancelled.
    fn scheduled_tick(&self, generation: &CancellationToken) {
        let gate = lock(&self.inner.tick_gate);
        if generation.is_cancelled() {
            return;
        }
        let events = self.run_tick(&gate);
        self.broadcast(&events);
    }

    /// One recomputation. The clock is read while the gate is held so a
    /// concurrent sync lands either wholly before or wholly after it.
    fn run_tick(&self, _gate: &MutexGuard<'_, ()>) -> Vec<Event> {
        let now_ms = self.inner.time.now_ms();
        let synced = self.inner.time.is_synced();
        let at = DateTime::from_timestamp_millis(now_ms).unwrap_or_default();
        let snapshot = snapshot_at(now_ms, &self.inner.window, synced);

        let mut events = Vec::with_capacity(3);
        let firing = {
            let mut state = lock(&self.inner.state);
            let previous = state.last_phase;
            if previous != Some(snapshot.phase) {
                tracing::info!(from = ?previous, to = %snapshot.phase, "phase changed");
                events.push(Event::PhaseChanged {
                    from: previous,
                    to: snapshot.phase,
                    at,
                });
            }
            let firing = state.latch.trip(previous, snapshot.phase);
            state.last_phase = Some(snapshot.phase);
            state.snapshot = snapshot;
            firing
        };

        if let Some(firing) = firing {
            tracing::info!("event is live, firing milestone");
            firing.run();
            events.push(Event::MilestoneFired { at });
        }

        events.push(Event::CountdownTick {
            phase: snapshot.phase,
            remaining: snapshot.remaining,
            synced: snapshot.synced,
            notice: snapshot.notice,
            at,
        });

        self.publish(&snapshot);
        events
    }

    fn publish(&self, snapshot: &Snapshot) {
        let callbacks: Vec<Callback> = lock(&self.inner.subscribers)
            .entries
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(snapshot);
        }
    }

    fn broadcast(&self, events: &[Event]) {
        for event in events {
            // No receivers is fine.
            let _ = self.inner.events.send(event.clone());
        }
    }
}

impl std::fmt::Debug for CountdownEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownEngine")
            .field("window", &self.inner.window)
            .field("snapshot", &self.snapshot())
            .field("clock", &self.clock_state())
            .field("running", &self.is_running())
            .finish()
    }
}

fn snapshot_at(now_ms: i64, window: &EventWindow, synced: bool) -> Snapshot {
    let (phase, remaining) = compute_phase_ms(now_ms, window);
    Snapshot {
        phase,
        remaining,
        synced,
        notice: notice_at_ms(now_ms, window),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
