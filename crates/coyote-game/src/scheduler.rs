//! Pulse scheduler: one consumer draining the segment queue every 200ms and
//! producers filling it.
//!
//! - **Dispatch** pops one segment per tick and sends it to the sink. An empty
//!   queue zeroes both channels.
//! - **Continuous mode** appends one baseline segment per tick. The baseline
//!   decays towards a floor derived from player health and collected items.
//! - **Overrides** (hurt, death, manual restart) atomically replace the whole
//!   queue with a fixed run, then flag continuous mode to pick up from the
//!   new tail.
//!
//! The queue lock is only held to pop, push or swap, never across a send.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use coyote_protocol::{Channel, StrengthAction};
use coyote_settings::{OverrideSettings, SettingsHandle, StrengthOperator};
use metrics::{counter, gauge};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{CollectibleCatalog, ModMessage, Outbox};
use crate::cursor::WaveformCursor;
use crate::errors::SchedulerError;
use crate::events::{GameEvent, PlayerInfo};
use crate::metrics::{GAME_EVENTS_TOTAL, OVERRIDES_TOTAL, QUEUE_DEPTH, SEGMENTS_DISPATCHED_TOTAL};
use crate::progress::GameProgress;
use crate::segment::{SEGMENT_DURATION, Segment, SegmentQueue, segments_for};
use crate::sink::ActuationSink;

/// Event that triggers an override run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    /// Player took damage.
    Hurt,
    /// Player died.
    Death,
    /// Player restarted by hand.
    ManualRestart,
}

impl OverrideKind {
    /// Label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hurt => "hurt",
            Self::Death => "death",
            Self::ManualRestart => "manual_restart",
        }
    }

    fn settings(self, game: &coyote_settings::GameSettings) -> &OverrideSettings {
        match self {
            Self::Hurt => &game.on_hurt,
            Self::Death => &game.on_death,
            Self::ManualRestart => &game.on_manual_restart,
        }
    }
}

/// Result of one dispatch tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing sent; no device is paired.
    Unbound,
    /// Queue was empty; both channels were set to zero.
    Idle,
    /// This segment was sent, strengths already clamped to the device maximum.
    Sent(Segment),
}

/// Private state of the continuous producer.
#[derive(Debug, Clone)]
pub struct ContinuousState {
    last_decay: Instant,
    cursor_a: WaveformCursor,
    cursor_b: WaveformCursor,
    baseline: (u32, u32),
}

impl ContinuousState {
    /// Fresh state with the decay clock starting at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            last_decay: now,
            cursor_a: WaveformCursor::new(),
            cursor_b: WaveformCursor::new(),
            baseline: (0, 0),
        }
    }

    /// Strengths of the last produced segment.
    pub const fn baseline(&self) -> (u32, u32) {
        self.baseline
    }
}

/// Paces segments to an [`ActuationSink`].
pub struct PulseScheduler {
    sink: Arc<dyn ActuationSink>,
    settings: SettingsHandle,
    queue: Mutex<SegmentQueue>,
    recompute: AtomicBool,
    progress: RwLock<GameProgress>,
    catalog: Arc<CollectibleCatalog>,
    outbox: Option<Arc<Outbox>>,
}

impl PulseScheduler {
    /// Scheduler driving `sink`, reading settings on every tick.
    pub fn new(sink: Arc<dyn ActuationSink>, settings: SettingsHandle) -> Self {
        Self {
            sink,
            settings,
            queue: Mutex::new(SegmentQueue::new()),
            recompute: AtomicBool::new(true),
            progress: RwLock::new(GameProgress::default()),
            catalog: Arc::new(CollectibleCatalog::empty()),
            outbox: None,
        }
    }

    /// Price collected items with `catalog`.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<CollectibleCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Report strengths to the game mod through `outbox`.
    #[must_use]
    pub fn with_outbox(mut self, outbox: Arc<Outbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Segments waiting.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Copy of the current run's progress.
    pub fn progress(&self) -> GameProgress {
        self.progress.read().clone()
    }

    /// Whether continuous mode will rebase on its next tick.
    pub fn needs_recompute(&self) -> bool {
        self.recompute.load(Ordering::Acquire)
    }

    /// Continuous-mode floor on `channel` under current settings.
    pub fn floor(&self, channel: Channel) -> u32 {
        let settings = self.settings.current();
        self.progress
            .read()
            .floor(&settings.game.continuous_mode, channel)
    }

    /// Append a segment, refused when the queue is full.
    pub fn push_segment(&self, segment: Segment) -> Result<(), SchedulerError> {
        self.queue.lock().push_back(segment)
    }

    // ─── Consumer ───

    /// Send the next segment, or zero both channels if there is none.
    pub fn dispatch_tick(&self) -> Dispatch {
        if !self.sink.is_bound() {
            return Dispatch::Unbound;
        }
        let next = {
            let mut queue = self.queue.lock();
            let next = queue.pop_front();
            #[allow(clippy::cast_precision_loss)]
            gauge!(QUEUE_DEPTH).set(queue.len() as f64);
            next
        };

        let Some(mut segment) = next else {
            for channel in Channel::ALL {
                if let Err(e) = self.sink.set_strength(channel, StrengthAction::Set, 0) {
                    warn!(channel = %channel, error = %e, "failed to zero strength");
                }
            }
            return Dispatch::Idle;
        };

        let limits = self.sink.strength();
        segment.strength_a = segment.strength_a.min(limits.max_a);
        segment.strength_b = segment.strength_b.min(limits.max_b);

        for channel in Channel::ALL {
            let value = segment.strength(channel);
            if let Err(e) = self.sink.set_strength(channel, StrengthAction::Set, value) {
                warn!(channel = %channel, value, error = %e, "failed to set strength");
            }
        }
        for channel in Channel::ALL {
            if let Err(e) = self.sink.add_pulse(channel, segment.frames(channel)) {
                warn!(channel = %channel, error = %e, "failed to add pulse");
            }
        }
        counter!(SEGMENTS_DISPATCHED_TOTAL).increment(1);
        Dispatch::Sent(segment)
    }

    // ─── Producers ───

    /// Produce one continuous-mode segment.
    ///
    /// Returns the segment appended, or `None` when continuous mode is off,
    /// nothing is paired, or the queue is full.
    pub fn continuous_tick(&self, state: &mut ContinuousState, now: Instant) -> Option<Segment> {
        let settings = self.settings.current();
        let cm = &settings.game.continuous_mode;
        if !cm.enabled || !self.sink.is_bound() {
            return None;
        }

        let (floor_a, floor_b) = {
            let progress = self.progress.read();
            (progress.floor(cm, Channel::A), progress.floor(cm, Channel::B))
        };
        let live = self.sink.strength();

        let mut queue = self.queue.lock();
        if queue.is_full() {
            return None;
        }

        if self.recompute.swap(false, Ordering::AcqRel) {
            state.baseline = queue.back().map_or((live.current_a, live.current_b), |tail| {
                (tail.strength_a, tail.strength_b)
            });
            state.cursor_a.reset();
            state.cursor_b.reset();
            debug!(
                baseline_a = state.baseline.0,
                baseline_b = state.baseline.1,
                "continuous baseline recomputed"
            );
        }

        let (a, b) = if cm.decay_interval_ms > 0 {
            let step = decay_steps(state, now, cm.decay_interval_ms);
            let per_step = u32::try_from(cm.decay_value).unwrap_or(0);
            let decayed =
                u32::try_from(step.saturating_mul(u64::from(per_step))).unwrap_or(u32::MAX);
            (
                state.baseline.0.saturating_sub(decayed).max(floor_a),
                state.baseline.1.saturating_sub(decayed).max(floor_b),
            )
        } else {
            (floor_a, floor_b)
        };

        let segment = Segment {
            strength_a: a,
            strength_b: b,
            frames_a: state.cursor_a.next_two(&cm.pulse_a),
            frames_b: state.cursor_b.next_two(&cm.pulse_b),
        };
        queue.push_back(segment.clone()).ok()?;
        state.baseline = (a, b);
        Some(segment)
    }

    /// Replace the queue with the run configured for `kind`.
    ///
    /// Returns the number of segments queued; zero when the override is
    /// disabled or nothing is paired.
    pub fn trigger_override(&self, kind: OverrideKind) -> usize {
        let settings = self.settings.current();
        let cfg = kind.settings(&settings.game);
        if !cfg.enabled || !self.sink.is_bound() {
            return 0;
        }

        let (a, b) = match cfg.strength_operator {
            StrengthOperator::Increment => {
                let progress = self.progress.read();
                let cm = &settings.game.continuous_mode;
                (
                    clamp_strength(i64::from(progress.floor(cm, Channel::A)) + i64::from(cfg.strength_a)),
                    clamp_strength(i64::from(progress.floor(cm, Channel::B)) + i64::from(cfg.strength_b)),
                )
            }
            StrengthOperator::Set => (
                clamp_strength(i64::from(cfg.strength_a)),
                clamp_strength(i64::from(cfg.strength_b)),
            ),
        };

        let segments = override_run(cfg, a, b);
        let queued = {
            let mut queue = self.queue.lock();
            let dropped = queue.replace(segments);
            if dropped > 0 {
                warn!(kind = kind.as_str(), dropped, "override run longer than queue");
            }
            self.recompute.store(true, Ordering::Release);
            queue.len()
        };

        if kind == OverrideKind::Death {
            *self.progress.write() = GameProgress::default();
        }
        counter!(OVERRIDES_TOTAL, "kind" => kind.as_str()).increment(1);
        debug!(kind = kind.as_str(), segments = queued, strength_a = a, strength_b = b, "override queued");
        queued
    }

    // ─── Game events ───

    /// Apply one game event.
    pub fn handle_event(&self, event: &GameEvent) {
        counter!(GAME_EVENTS_TOTAL, "event" => event.name()).increment(1);
        match event {
            GameEvent::ModInit => info!("game mod connected"),
            GameEvent::PlayerHurt(hurt) => {
                let segments = self.trigger_override(OverrideKind::Hurt);
                debug!(damage = hurt.damage, segments, "player hurt");
            }
            GameEvent::PlayerDeath => {
                let _ = self.trigger_override(OverrideKind::Death);
            }
            GameEvent::ManualRestart => {
                let _ = self.trigger_override(OverrideKind::ManualRestart);
            }
            GameEvent::GameStart(start) => {
                if !start.is_continue {
                    self.reset();
                }
            }
            GameEvent::GameEnd | GameEvent::GameExit => self.reset(),
            GameEvent::NewCollectible(item) => {
                debug!(item = %item.name, quality = item.quality, "new collectible");
            }
            GameEvent::PlayerInfoUpdate(info) => self.update_player_info(info),
        }
    }

    /// Forget the current run.
    pub fn reset(&self) {
        *self.progress.write() = GameProgress::default();
        let clear = self.settings.current().game.clear_queue_on_reset;
        let mut queue = self.queue.lock();
        if clear {
            let _ = queue.replace(Vec::new());
        }
        self.recompute.store(true, Ordering::Release);
        debug!(cleared = clear, "game progress reset");
    }

    fn update_player_info(&self, info: &PlayerInfo) {
        let settings = self.settings.current();
        let collectibles = &settings.game.on_new_collectible;
        let mut progress = self.progress.write();
        progress.health = info.health;
        progress.max_health = info.max_health;
        if progress.collectibles == info.collectibles {
            return;
        }
        progress.collectibles.clone_from(&info.collectibles);
        if collectibles.enabled {
            let (a, b) = self
                .catalog
                .bonus(&info.collectibles, &collectibles.strength_by_quality);
            progress.bonus_a = a;
            progress.bonus_b = b;
            self.recompute.store(true, Ordering::Release);
            debug!(bonus_a = a, bonus_b = b, "collectible bonus updated");
        }
    }

    /// Push the device's current strengths to the game mod.
    pub fn indicator_tick(&self) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        if !self.sink.is_bound() {
            return;
        }
        let s = self.sink.strength();
        outbox.push(ModMessage::update_indicator(s.current_a, s.current_b));
    }

    // ─── Tasks ───

    /// Start the dispatch, continuous, indicator and event loops.
    pub fn spawn(
        self: &Arc<Self>,
        events: broadcast::Receiver<GameEvent>,
        cancel: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            tokio::spawn(Arc::clone(self).dispatch_loop(cancel.clone())),
            tokio::spawn(Arc::clone(self).continuous_loop(cancel.clone())),
            tokio::spawn(Arc::clone(self).event_loop(events, cancel.clone())),
        ];
        if self.outbox.is_some() {
            handles.push(tokio::spawn(Arc::clone(self).indicator_loop(cancel.clone())));
        }
        handles
    }

    async fn dispatch_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = segment_ticker();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let _ = self.dispatch_tick();
        }
        debug!("dispatch loop stopped");
    }

    async fn continuous_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = segment_ticker();
        let mut state = ContinuousState::new(Instant::now());
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                now = ticker.tick() => {
                    let _ = self.continuous_tick(&mut state, now);
                }
            }
        }
        debug!("continuous loop stopped");
    }

    async fn indicator_loop(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = segment_ticker();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.indicator_tick(),
            }
        }
    }

    async fn event_loop(
        self: Arc<Self>,
        mut events: broadcast::Receiver<GameEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break,
                r = events.recv() => r,
            };
            match received {
                Ok(event) => self.handle_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "game events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
        debug!("event loop stopped");
    }
}

impl std::fmt::Debug for PulseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseScheduler")
            .field("queue_len", &self.queue_len())
            .field("needs_recompute", &self.needs_recompute())
            .finish_non_exhaustive()
    }
}

fn segment_ticker() -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(SEGMENT_DURATION);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Whole decay intervals elapsed since the last step; advances the clock by
/// that many intervals so the remainder carries over.
fn decay_steps(state: &mut ContinuousState, now: Instant, interval_ms: u64) -> u64 {
    let elapsed = now.saturating_duration_since(state.last_decay);
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let steps = elapsed_ms / interval_ms;
    if steps > 0 {
        let remainder = Duration::from_millis(elapsed_ms % interval_ms);
        state.last_decay = now.checked_sub(remainder).unwrap_or(now);
    }
    steps
}

fn override_run(cfg: &OverrideSettings, strength_a: u32, strength_b: u32) -> Vec<Segment> {
    let mut cursor_a = WaveformCursor::new();
    let mut cursor_b = WaveformCursor::new();
    (0..segments_for(cfg.duration_ms))
        .map(|_| Segment {
            strength_a,
            strength_b,
            frames_a: cursor_a.next_two(&cfg.pulse_a),
            frames_b: cursor_b.next_two(&cfg.pulse_b),
        })
        .collect()
}

fn clamp_strength(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
