//! Wires the relay server, the paired session, the game bridge and the pulse
//! scheduler into one running relay.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use coyote_game::bridge::{BridgeListener, CollectibleCatalog, Outbox};
use coyote_game::{ActuationSink, GameEvent, PulseScheduler};
use coyote_server::observers::spawn_observer;
use coyote_server::pairing::{detect_lan_address, pairing_url};
use coyote_server::{CoyoteServer, RouterEvent, ServerConfig, Session, SessionEvent, ShutdownCoordinator};
use coyote_settings::SettingsHandle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the game event channel.
const GAME_EVENT_CAPACITY: usize = 64;

/// Bound on how long shutdown waits for background tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running relay.
pub struct Relay {
    addr: SocketAddr,
    pairing_url: String,
    server: CoyoteServer,
    session: Arc<Session>,
    scheduler: Arc<PulseScheduler>,
    events: broadcast::Sender<GameEvent>,
    handles: Vec<JoinHandle<()>>,
    observers: Vec<JoinHandle<()>>,
}

impl Relay {
    /// Bind the server, register the session and start all background loops.
    pub async fn start(settings: SettingsHandle) -> Result<Self> {
        let current = settings.current();
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let server = CoyoteServer::with_shutdown(ServerConfig::from(&current.server), shutdown);

        let (addr, serve_handle) = server.listen().await.context("Failed to bind relay")?;
        let session = server.router().new_session();
        let host = public_host(current.server.public_address.as_deref(), addr.ip());
        let pairing_url = pairing_url(&host, addr.port(), session.client_id());

        let mut handles = vec![serve_handle];
        let observers = vec![
            spawn_observer(session.subscribe(), log_session_event),
            spawn_observer(server.router().subscribe(), log_router_event),
        ];

        let (events, events_rx) = broadcast::channel(GAME_EVENT_CAPACITY);
        let sink: Arc<dyn ActuationSink> = Arc::clone(&session) as Arc<dyn ActuationSink>;
        let mut scheduler = PulseScheduler::new(sink, settings.clone());

        let token = server.shutdown().token();
        let bridge = &current.bridge;
        if bridge.data_file.is_empty() {
            info!("no game data file configured, game bridge disabled");
        } else {
            let outbox = Arc::new(Outbox::new());
            scheduler = scheduler
                .with_catalog(Arc::new(load_catalog(Path::new(&bridge.resources_file))))
                .with_outbox(Arc::clone(&outbox));
            let listener = BridgeListener::new(bridge, outbox, events.clone());
            let bridge_token = token.clone();
            handles.push(tokio::spawn(async move {
                listener.run_with_retry(bridge_token).await;
            }));
        }

        let scheduler = Arc::new(scheduler);
        handles.extend(scheduler.spawn(events_rx, &token));

        Ok(Self {
            addr,
            pairing_url,
            server,
            session,
            scheduler,
            events,
            handles,
            observers,
        })
    }

    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Text to encode in the pairing QR code.
    pub fn pairing_url(&self) -> &str {
        &self.pairing_url
    }

    /// The session the app pairs with.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The pulse scheduler.
    pub fn scheduler(&self) -> &Arc<PulseScheduler> {
        &self.scheduler
    }

    /// Sender for injecting game events.
    pub fn events(&self) -> &broadcast::Sender<GameEvent> {
        &self.events
    }

    /// Disconnect the app and stop every background task.
    pub async fn stop(self) {
        self.session.disconnect();
        let shutdown = Arc::clone(self.server.shutdown());
        shutdown.shutdown();
        shutdown
            .graceful_shutdown(self.handles, Some(SHUTDOWN_TIMEOUT))
            .await;
        // observer channels live as long as the session
        for observer in self.observers {
            observer.abort();
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("addr", &self.addr)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Host advertised in the pairing code.
///
/// Configured address first, then a detected LAN address when bound to all
/// interfaces, then the bound address itself.
fn public_host(configured: Option<&str>, bound: IpAddr) -> String {
    if let Some(host) = configured.filter(|h| !h.is_empty()) {
        return host.to_string();
    }
    if bound.is_unspecified() {
        if let Some(ip) = detect_lan_address() {
            return ip.to_string();
        }
    }
    bound.to_string()
}

fn load_catalog(path: &Path) -> CollectibleCatalog {
    match CollectibleCatalog::load(path) {
        Ok(catalog) => {
            info!(path = %path.display(), items = catalog.len(), "collectible catalog loaded");
            catalog
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "collectible catalog unavailable, item bonus disabled");
            CollectibleCatalog::empty()
        }
    }
}

async fn log_session_event(event: SessionEvent) {
    match event {
        SessionEvent::Bound { target_id } => info!(%target_id, "app paired"),
        SessionEvent::Break => info!("app pairing ended"),
        SessionEvent::Error { message } => warn!(%message, "app reported an error"),
        SessionEvent::StrengthChanged(s) => debug!(
            current_a = s.current_a,
            current_b = s.current_b,
            max_a = s.max_a,
            max_b = s.max_b,
            "strength report"
        ),
        SessionEvent::Feedback(button) => debug!(button = button.0, "feedback button"),
        SessionEvent::Heartbeat | SessionEvent::MessageReceived { .. } => {}
    }
}

async fn log_router_event(event: RouterEvent) {
    match event {
        RouterEvent::Connected { client_id, conn_id } => {
            debug!(%client_id, %conn_id, "app connected");
        }
        RouterEvent::Disconnected { client_id, conn_id } => {
            debug!(%client_id, %conn_id, "app disconnected");
        }
        RouterEvent::MessageReceived { .. } => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
