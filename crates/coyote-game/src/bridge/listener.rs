//! Polls the shared data file and turns mod messages into game events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use coyote_settings::BridgeSettings;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::model::{ModData, ModMessage, ModMessageKind};
use super::outbox::Outbox;
use crate::errors::BridgeError;
use crate::events::GameEvent;

/// Why a listener run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    /// No heartbeat from the mod within the staleness window.
    Stale,
    /// Shutdown was requested.
    Cancelled,
}

/// Events decoded from one poll.
#[derive(Debug, Default, PartialEq)]
pub struct Batch {
    /// Events in file order, hurt removed when a death is present.
    pub events: Vec<GameEvent>,
    /// The mod sent a heartbeat.
    pub heartbeat: bool,
    /// Messages consumed from the file.
    pub consumed: usize,
}

/// Decode a poll's worth of mod messages.
///
/// A death in the batch suppresses every hurt in the same batch. Messages
/// that fail to decode are logged and skipped.
pub fn collect_events(messages: &[ModMessage]) -> Batch {
    let mut batch = Batch {
        consumed: messages.len(),
        ..Batch::default()
    };
    for message in messages {
        match message.kind {
            ModMessageKind::Heartbeat => batch.heartbeat = true,
            ModMessageKind::Event => match message.to_event() {
                Ok(Some(event)) => batch.events.push(event),
                Ok(None) => debug!(frame = message.frame_count, "ignoring unknown event"),
                Err(e) => warn!(frame = message.frame_count, error = %e, "malformed event"),
            },
            _ => {}
        }
    }
    if batch.events.contains(&GameEvent::PlayerDeath) {
        batch
            .events
            .retain(|e| !matches!(e, GameEvent::PlayerHurt(_)));
    }
    batch
}

/// Resolve the data file.
///
/// A directory resolves to its most recently modified `save*.dat`.
pub async fn resolve_data_file(path: &Path) -> Result<PathBuf, BridgeError> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_dir() {
        return Ok(path.to_path_buf());
    }
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with("save") && name.ends_with(".dat")) {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }
    newest.map(|(_, p)| p).ok_or_else(|| {
        BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no save*.dat in {}", path.display()),
        ))
    })
}

/// Exchanges messages with the game mod through its data file.
#[derive(Debug)]
pub struct BridgeListener {
    data_path: PathBuf,
    poll_interval: Duration,
    heartbeat_interval: Duration,
    stale_after: Duration,
    retry_delay: Duration,
    outbox: Arc<Outbox>,
    events: broadcast::Sender<GameEvent>,
}

impl BridgeListener {
    /// Listener for `settings.data_file`, publishing on `events`.
    pub fn new(
        settings: &BridgeSettings,
        outbox: Arc<Outbox>,
        events: broadcast::Sender<GameEvent>,
    ) -> Self {
        Self {
            data_path: PathBuf::from(&settings.data_file),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
            stale_after: Duration::from_millis(settings.stale_after_ms),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            outbox,
            events,
        }
    }

    /// Configured data path (file or directory).
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// One connection to the mod, until it goes quiet or `cancel` fires.
    #[instrument(skip_all, fields(path = %self.data_path.display()))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<BridgeExit, BridgeError> {
        let path = resolve_data_file(&self.data_path).await?;
        self.outbox.push(ModMessage::connect());
        self.flush(&path).await?;
        info!(file = %path.display(), "game mod bridge connected");

        let mut last_inbound = Instant::now();
        let mut last_heartbeat = Instant::now();
        let _ = self.events.send(GameEvent::ModInit);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(BridgeExit::Cancelled),
                _ = ticker.tick() => {}
            }

            let mut consumed = 0;
            match read_data(&path).await {
                Ok(data) => {
                    let batch = collect_events(&data.send);
                    if batch.heartbeat {
                        last_inbound = Instant::now();
                    }
                    consumed = batch.consumed;
                    for event in batch.events {
                        debug!(event = event.name(), "game event");
                        let _ = self.events.send(event);
                    }
                }
                Err(BridgeError::Json(e)) => debug!(error = %e, "data file not parseable yet"),
                Err(e) => warn!(error = %e, "failed to read data file"),
            }

            if last_heartbeat.elapsed() >= self.heartbeat_interval {
                self.outbox.push(ModMessage::heartbeat());
                last_heartbeat = Instant::now();
            }

            if consumed > 0 || !self.outbox.is_empty() {
                if let Err(e) = self.flush(&path).await {
                    warn!(error = %e, "failed to write data file");
                }
            }

            if last_inbound.elapsed() > self.stale_after {
                return Ok(BridgeExit::Stale);
            }
        }
    }

    /// Run, reconnecting after staleness or errors, until `cancel` fires.
    pub async fn run_with_retry(&self, cancel: CancellationToken) {
        loop {
            match self.run(&cancel).await {
                Ok(BridgeExit::Cancelled) => return,
                Ok(BridgeExit::Stale) => info!("game mod went quiet, reconnecting"),
                Err(e) => warn!(error = %e, "game mod bridge failed"),
            }
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// Write the outbox for the mod and clear consumed messages.
    async fn flush(&self, path: &Path) -> Result<(), BridgeError> {
        let data = ModData {
            send: Vec::new(),
            receive: self.outbox.drain(),
        };
        let json = serde_json::to_vec(&data)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

async fn read_data(path: &Path) -> Result<ModData, BridgeError> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
