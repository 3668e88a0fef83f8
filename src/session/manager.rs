//! Session Manager
//!
//! Single-writer state machine for the proxy session. All work, including
//! disconnect reports from the engine's own thread, is funneled through one
//! queue into a dedicated worker thread, which is the only place native calls
//! are made and the only place the [`Session`] is mutated.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::bus::StatusEventBus;
use super::events::StatusEvent;
use super::state::{Session, SessionInfo, SessionPhase};
use crate::engine::{
    DisconnectRelay, EngineError, NativeEngine, NativeEngineAdapter, NativeNotice, ProxyConfig,
};

/// Manager settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Name of the worker thread that owns the engine
    pub worker_thread_name: String,
    /// Engine config cached for the first start
    pub initial_config: ProxyConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            worker_thread_name: "proxy-session".to_string(),
            initial_config: ProxyConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn with_initial_config(mut self, config: ProxyConfig) -> Self {
        self.initial_config = config;
        self
    }
}

/// Unit of work for the session worker
enum WorkItem {
    Start {
        address: String,
        /// Replaces the cached config once the start is admitted
        config: Option<ProxyConfig>,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Stop {
        reply: oneshot::Sender<SessionResult<()>>,
    },
    ChangeConfig {
        config: ProxyConfig,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionInfo>,
    },
    Disconnected(NativeNotice),
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// Session Manager - owns the proxy engine through a dedicated worker
pub struct ProxySessionManager {
    work_tx: mpsc::UnboundedSender<WorkItem>,
    bus: StatusEventBus,
    /// Set while a session is live or a start is queued
    start_claim: Arc<AtomicBool>,
}

impl ProxySessionManager {
    /// Create a manager with default settings
    pub fn new<E: NativeEngine>(engine: E, bus: StatusEventBus) -> SessionResult<Self> {
        Self::with_config(engine, bus, ManagerConfig::default())
    }

    /// Create a manager and spawn its worker thread
    pub fn with_config<E: NativeEngine>(
        engine: E,
        bus: StatusEventBus,
        config: ManagerConfig,
    ) -> SessionResult<Self> {
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let start_claim = Arc::new(AtomicBool::new(false));

        let worker = SessionWorker {
            adapter: NativeEngineAdapter::new(engine),
            session: Session::new(config.initial_config),
            bus: bus.clone(),
            work_tx: work_tx.clone(),
            start_claim: Arc::clone(&start_claim),
        };

        std::thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || worker.run(work_rx))?;

        info!("Proxy session manager ready ({})", config.worker_thread_name);
        Ok(Self {
            work_tx,
            bus,
            start_claim,
        })
    }

    /// Start the proxy for `address`.
    ///
    /// Rejected at once while another session is live or starting.
    pub async fn start(&self, address: impl Into<String>) -> SessionResult<()> {
        self.submit_start(address.into(), None).await
    }

    /// Start the proxy for `address` with `config`.
    ///
    /// The config is only adopted if the start is admitted, so a rejected
    /// start leaves the cached or running config untouched.
    pub async fn start_with_config(
        &self,
        address: impl Into<String>,
        config: ProxyConfig,
    ) -> SessionResult<()> {
        self.submit_start(address.into(), Some(config)).await
    }

    async fn submit_start(
        &self,
        address: String,
        config: Option<ProxyConfig>,
    ) -> SessionResult<()> {
        if self
            .start_claim
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::OperationRejected(
                "a proxy session is already live".to_string(),
            ));
        }

        let (reply, rx) = oneshot::channel();
        let item = WorkItem::Start {
            address,
            config,
            reply,
        };
        if self.work_tx.send(item).is_err() {
            self.start_claim.store(false, Ordering::Release);
            return Err(SessionError::ManagerUnavailable);
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => {
                // The worker exited without running the start.
                self.start_claim.store(false, Ordering::Release);
                Err(SessionError::ManagerUnavailable)
            }
        }
    }

    /// Stop the proxy. Succeeds without effect when nothing is running.
    pub async fn stop(&self) -> SessionResult<()> {
        self.request(|reply| WorkItem::Stop { reply }).await?
    }

    /// Apply `config` now if running, otherwise cache it for the next start
    pub async fn change_config(&self, config: ProxyConfig) -> SessionResult<()> {
        self.request(|reply| WorkItem::ChangeConfig { config, reply })
            .await?
    }

    /// Snapshot of the session, taken in order with other operations
    pub async fn session(&self) -> SessionResult<SessionInfo> {
        self.request(|reply| WorkItem::Snapshot { reply }).await
    }

    /// Stop any live session and end the worker
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self
            .work_tx
            .send(WorkItem::Shutdown { reply: Some(reply) })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// The bus this manager publishes on
    pub fn bus(&self) -> &StatusEventBus {
        &self.bus
    }

    /// Whether the proxy is running, per the latest published event
    pub fn query_current_status(&self) -> bool {
        self.bus.query_current_status()
    }

    async fn request<T>(
        &self,
        item: impl FnOnce(oneshot::Sender<T>) -> WorkItem,
    ) -> SessionResult<T> {
        let (reply, rx) = oneshot::channel();
        self.work_tx
            .send(item(reply))
            .map_err(|_| SessionError::ManagerUnavailable)?;
        rx.await.map_err(|_| SessionError::ManagerUnavailable)
    }
}

impl Drop for ProxySessionManager {
    fn drop(&mut self) {
        let _ = self.work_tx.send(WorkItem::Shutdown { reply: None });
    }
}

/// Lives on the worker thread; sole owner of the adapter and the session
struct SessionWorker<E: NativeEngine> {
    adapter: NativeEngineAdapter<E>,
    session: Session,
    bus: StatusEventBus,
    /// Cloned into disconnect relays so native reports join the same queue
    work_tx: mpsc::UnboundedSender<WorkItem>,
    start_claim: Arc<AtomicBool>,
}

impl<E: NativeEngine> SessionWorker<E> {
    fn run(mut self, mut work_rx: mpsc::UnboundedReceiver<WorkItem>) {
        debug!("Proxy session worker started");

        while let Some(item) = work_rx.blocking_recv() {
            match item {
                WorkItem::Start {
                    address,
                    config,
                    reply,
                } => {
                    let _ = reply.send(self.start(address, config));
                }
                WorkItem::Stop { reply } => {
                    let _ = reply.send(self.stop());
                }
                WorkItem::ChangeConfig { config, reply } => {
                    let _ = reply.send(self.change_config(config));
                }
                WorkItem::Snapshot { reply } => {
                    let _ = reply.send(SessionInfo::from(&self.session));
                }
                WorkItem::Disconnected(notice) => self.on_native_disconnect(notice),
                WorkItem::Shutdown { reply } => {
                    if let Err(e) = self.stop() {
                        error!("Error stopping proxy during shutdown: {}", e);
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    break;
                }
            }
        }

        info!("Proxy session worker exited");
    }

    fn start(&mut self, address: String, config: Option<ProxyConfig>) -> SessionResult<()> {
        if !self.session.phase.accepts_start() {
            return Err(SessionError::OperationRejected(format!(
                "cannot start while {}",
                self.session.phase
            )));
        }
        if let Some(config) = config {
            self.session.config = config;
        }

        let session_id = self.session.begin(address.as_str());
        info!("Starting proxy session {} for {}", session_id, address);

        if let Err(cause) = self.adapter.init(session_id) {
            return Err(self.fail_start(SessionError::EngineInitFailed, cause));
        }

        self.session.set_phase(SessionPhase::Configuring);
        if let Err(cause) = self.adapter.change_config(self.session.config) {
            self.adapter.stop();
            return Err(self.fail_start(SessionError::EngineInitFailed, cause));
        }

        if let Err(cause) = self.adapter.start_with_address(&address) {
            // The library allocates its client before resolving the address.
            self.adapter.stop();
            return Err(self.fail_start(SessionError::EngineStartRejected, cause));
        }

        let work_tx = self.work_tx.clone();
        let relay = DisconnectRelay::new(session_id, move |notice| {
            let _ = work_tx.send(WorkItem::Disconnected(notice));
        });
        if let Err(cause) = self.adapter.register_disconnect_callback(relay) {
            self.adapter.stop();
            return Err(self.fail_start(SessionError::EngineStartRejected, cause));
        }

        self.session.set_running();
        self.bus.publish(StatusEvent::started());
        info!("Proxy session {} running", session_id);
        Ok(())
    }

    fn fail_start(&mut self, error: SessionError, cause: EngineError) -> SessionError {
        warn!(
            "Proxy session {} failed to start: {} ({})",
            self.session.id, error, cause
        );
        self.session.set_faulted(error.to_string());
        self.start_claim.store(false, Ordering::Release);
        self.bus.publish(StatusEvent::stopped());
        error
    }

    fn stop(&mut self) -> SessionResult<()> {
        let phase = self.session.phase;
        if phase == SessionPhase::Faulted {
            self.session.reset();
            return Ok(());
        }
        if !phase.is_live() {
            debug!("Stop requested while {}; nothing to do", phase);
            return Ok(());
        }

        let session_id = self.session.id;
        self.session.set_phase(SessionPhase::Stopping);
        // Observers learn about the stop before the native call, which may block.
        self.bus.publish(StatusEvent::stopped());
        self.adapter.stop();

        self.session.reset();
        self.start_claim.store(false, Ordering::Release);
        info!("Proxy session {} stopped", session_id);
        Ok(())
    }

    fn change_config(&mut self, config: ProxyConfig) -> SessionResult<()> {
        let phase = self.session.phase;
        if phase == SessionPhase::Running {
            self.adapter.change_config(config).map_err(|e| {
                warn!("Failed to apply config {:?}: {}", config, e);
                SessionError::OperationRejected(e.to_string())
            })?;
            self.session.config = config;
            self.bus.publish(StatusEvent::config_changed());
            info!("Proxy config changed: {:?}", config);
            Ok(())
        } else if phase.accepts_start() {
            self.session.config = config;
            debug!("Proxy config cached for next start: {:?}", config);
            Ok(())
        } else {
            Err(SessionError::OperationRejected(format!(
                "cannot change config while {}",
                phase
            )))
        }
    }

    fn on_native_disconnect(&mut self, notice: NativeNotice) {
        if notice.session_id != self.session.id || self.session.phase != SessionPhase::Running {
            debug!(
                "Ignoring stale disconnect for session {} (current {} is {}): {}",
                notice.session_id, self.session.id, self.session.phase, notice.reason
            );
            return;
        }

        warn!(
            "Proxy session {} disconnected unexpectedly: {}",
            notice.session_id, notice.reason
        );
        self.adapter.release(notice.session_id);
        self.session.reset();
        self.session.last_error =
            Some(SessionError::UnexpectedDisconnect(notice.reason.clone()).to_string());
        self.start_claim.store(false, Ordering::Release);
        self.bus.publish(StatusEvent::disconnected(notice.reason));
    }
}

/// Session manager errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Engine init failed")]
    EngineInitFailed,

    #[error("Invalid address or engine rejected start")]
    EngineStartRejected,

    #[error("Operation rejected: {0}")]
    OperationRejected(String),

    #[error("Disconnected unexpectedly: {0}")]
    UnexpectedDisconnect(String),

    #[error("Session manager unavailable")]
    ManagerUnavailable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<SessionError> for String {
    fn from(err: SessionError) -> String {
        err.to_string()
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeEngine, NativeCall};
    use crate::engine::RawProxyConfig;
    use crate::session::events::StatusEventKind;
    use serial_test::serial;
    use std::time::Duration;

    fn manager() -> (ProxySessionManager, FakeEngine, mpsc::UnboundedReceiver<StatusEvent>) {
        let engine = FakeEngine::new();
        let bus = StatusEventBus::new();
        let (_, events) = bus.subscribe_channel();
        let manager = ProxySessionManager::new(engine.clone(), bus).unwrap();
        (manager, engine, events)
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<StatusEvent>) -> StatusEventKind {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for status event")
            .expect("bus closed")
            .kind
    }

    #[tokio::test]
    #[serial]
    async fn test_start_then_stop() {
        let (manager, engine, mut events) = manager();

        manager.start("10.0.0.1").await.unwrap();
        assert!(manager.query_current_status());
        assert_eq!(manager.session().await.unwrap().phase, SessionPhase::Running);

        manager.stop().await.unwrap();
        assert!(!manager.query_current_status());
        assert_eq!(manager.session().await.unwrap().phase, SessionPhase::Idle);

        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
        assert_eq!(
            engine.calls(),
            vec![
                NativeCall::Init,
                NativeCall::ChangeConfig(RawProxyConfig::default()),
                NativeCall::StartWithAddress("10.0.0.1".to_string()),
                NativeCall::SetOnDisconnectCallback,
                NativeCall::Stop,
            ]
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_stop_is_idempotent() {
        let (manager, engine, mut events) = manager();

        manager.stop().await.unwrap();
        assert!(drain(&mut events).is_empty());
        assert!(engine.calls().is_empty());

        manager.start("dap.local").await.unwrap();
        manager.stop().await.unwrap();
        manager.stop().await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
        assert_eq!(engine.count(|c| matches!(c, NativeCall::Stop)), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_start_while_live_is_rejected() {
        let (manager, engine, _events) = manager();

        manager.start("dap.local").await.unwrap();
        let result = manager.start("other.local").await;

        assert!(matches!(result, Err(SessionError::OperationRejected(_))));
        assert_eq!(engine.count(|c| matches!(c, NativeCall::Init)), 1);
        let info = manager.session().await.unwrap();
        assert_eq!(info.device_address.as_deref(), Some("dap.local"));
    }

    #[tokio::test]
    #[serial]
    async fn test_start_during_inflight_start_is_rejected() {
        let (manager, engine, _events) = manager();
        engine.delay_start(Duration::from_millis(200));

        let (first, second) = tokio::join!(manager.start("dap.local"), manager.start("dap.local"));

        assert!(first.is_ok());
        assert!(matches!(second, Err(SessionError::OperationRejected(_))));
        assert_eq!(engine.count(|c| matches!(c, NativeCall::Init)), 1);
    }

    #[tokio::test]
    #[serial]
    async fn test_stop_during_start_runs_after_it() {
        let (manager, engine, mut events) = manager();
        engine.delay_start(Duration::from_millis(200));

        let (started, stopped) = tokio::join!(manager.start("dap.local"), manager.stop());

        assert!(started.is_ok());
        assert!(stopped.is_ok());
        assert!(!manager.query_current_status());
        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
        assert_eq!(engine.calls().last(), Some(&NativeCall::Stop));
    }

    #[tokio::test]
    #[serial]
    async fn test_native_disconnect_returns_to_idle() {
        let (manager, engine, mut events) = manager();
        manager.start("10.0.0.1").await.unwrap();
        assert_eq!(next_event(&mut events).await, StatusEventKind::Started);

        assert!(engine.fire_disconnect("link lost"));

        assert_eq!(
            next_event(&mut events).await,
            StatusEventKind::DisconnectedUnexpectedly {
                reason: "link lost".to_string()
            }
        );
        assert!(!manager.query_current_status());

        let info = manager.session().await.unwrap();
        assert_eq!(info.phase, SessionPhase::Idle);
        assert!(info.last_error.unwrap().contains("link lost"));
        assert!(drain(&mut events).is_empty());
        assert_eq!(engine.count(|c| matches!(c, NativeCall::Stop)), 0);

        // No auto-reconnect, but a fresh start is accepted.
        manager.start("10.0.0.1").await.unwrap();
        assert!(manager.query_current_status());
    }

    #[tokio::test]
    #[serial]
    async fn test_disconnect_after_stop_is_ignored() {
        let (manager, engine, mut events) = manager();
        manager.start("dap.local").await.unwrap();
        manager.stop().await.unwrap();

        assert!(engine.fire_disconnect("late"));
        // Round-trip through the worker so any queued notice has been handled.
        manager.session().await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_disconnect_during_stop_is_ignored() {
        let (manager, engine, mut events) = manager();
        engine.disconnect_on_stop("closed by stop");

        manager.start("dap.local").await.unwrap();
        manager.stop().await.unwrap();
        // The notice was queued while the native stop ran; let the worker see it.
        manager.session().await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
        let info = manager.session().await.unwrap();
        assert_eq!(info.phase, SessionPhase::Idle);
        assert!(info.last_error.is_none());

        manager.start("dap.local").await.unwrap();
        assert_eq!(drain(&mut events), vec![StatusEventKind::Started]);
        assert!(manager.query_current_status());
    }

    #[tokio::test]
    #[serial]
    async fn test_start_with_config_applies_config() {
        let (manager, engine, _events) = manager();
        let vendor = ProxyConfig {
            enable_vendor_command: true,
        };

        manager.start_with_config("dap.local", vendor).await.unwrap();

        assert_eq!(
            engine.configs(),
            vec![RawProxyConfig {
                enable_vendor_command: 1
            }]
        );
        assert_eq!(manager.session().await.unwrap().config, vendor);
    }

    #[tokio::test]
    #[serial]
    async fn test_rejected_start_with_config_keeps_running_config() {
        let (manager, engine, mut events) = manager();
        manager.start("dap.local").await.unwrap();

        let result = manager
            .start_with_config(
                "dap.local",
                ProxyConfig {
                    enable_vendor_command: true,
                },
            )
            .await;

        assert!(matches!(result, Err(SessionError::OperationRejected(_))));
        assert_eq!(engine.configs().len(), 1);
        assert!(!manager.session().await.unwrap().config.enable_vendor_command);
        assert_eq!(drain(&mut events), vec![StatusEventKind::Started]);
    }

    #[tokio::test]
    #[serial]
    async fn test_initial_config_used_for_first_start() {
        let engine = FakeEngine::new();
        let config = ManagerConfig::default().with_initial_config(ProxyConfig {
            enable_vendor_command: true,
        });
        let manager =
            ProxySessionManager::with_config(engine.clone(), StatusEventBus::new(), config)
                .unwrap();

        manager.start("dap.local").await.unwrap();

        assert_eq!(
            engine.configs(),
            vec![RawProxyConfig {
                enable_vendor_command: 1
            }]
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_change_config_while_running() {
        let (manager, engine, mut events) = manager();
        let vendor = ProxyConfig {
            enable_vendor_command: true,
        };

        manager.start("dap.local").await.unwrap();
        manager.change_config(vendor).await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::ConfigChanged]
        );
        assert_eq!(engine.configs().last().unwrap().enable_vendor_command, 1);

        manager.stop().await.unwrap();
        manager.start("dap.local").await.unwrap();

        let configs = engine.configs();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[2].enable_vendor_command, 1);
        assert_eq!(manager.session().await.unwrap().config, vendor);
    }

    #[tokio::test]
    #[serial]
    async fn test_change_config_while_idle_is_cached() {
        let (manager, engine, mut events) = manager();

        manager
            .change_config(ProxyConfig {
                enable_vendor_command: true,
            })
            .await
            .unwrap();
        assert!(drain(&mut events).is_empty());
        assert!(engine.calls().is_empty());

        manager.start("dap.local").await.unwrap();
        assert_eq!(
            engine.configs(),
            vec![RawProxyConfig {
                enable_vendor_command: 1
            }]
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_init_failure_faults_session() {
        let (manager, engine, mut events) = manager();
        engine.fail_init(-1);

        let result = manager.start("10.0.0.1").await;

        assert!(matches!(result, Err(SessionError::EngineInitFailed)));
        let info = manager.session().await.unwrap();
        assert_eq!(info.phase, SessionPhase::Faulted);
        assert_eq!(info.last_error.as_deref(), Some("Engine init failed"));
        assert_eq!(
            engine.count(|c| matches!(c, NativeCall::StartWithAddress(_))),
            0
        );
        assert_eq!(drain(&mut events), vec![StatusEventKind::Stopped]);
        assert!(!manager.query_current_status());

        engine.fail_init(0);
        manager.start("10.0.0.1").await.unwrap();
        assert!(manager.session().await.unwrap().last_error.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_rejected_start_faults_session() {
        let (manager, engine, mut events) = manager();
        engine.reject_start(-1);

        let result = manager.start("no.such.device").await;

        assert!(matches!(result, Err(SessionError::EngineStartRejected)));
        assert_eq!(
            manager.session().await.unwrap().phase,
            SessionPhase::Faulted
        );
        assert_eq!(drain(&mut events), vec![StatusEventKind::Stopped]);
        assert_eq!(engine.calls().last(), Some(&NativeCall::Stop));
        assert_eq!(
            engine.count(|c| matches!(c, NativeCall::SetOnDisconnectCallback)),
            0
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_address_is_rejected() {
        let (manager, engine, _events) = manager();

        let result = manager.start("").await;

        assert!(matches!(result, Err(SessionError::EngineStartRejected)));
        assert_eq!(
            engine.count(|c| matches!(c, NativeCall::StartWithAddress(_))),
            0
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_stop_from_faulted_resets_to_idle() {
        let (manager, engine, mut events) = manager();
        engine.fail_init(1);
        let _ = manager.start("dap.local").await;
        drain(&mut events);

        manager.stop().await.unwrap();

        assert_eq!(manager.session().await.unwrap().phase, SessionPhase::Idle);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_shutdown_stops_engine() {
        let (manager, engine, mut events) = manager();
        manager.start("dap.local").await.unwrap();

        manager.shutdown().await;

        assert_eq!(engine.calls().last(), Some(&NativeCall::Stop));
        assert_eq!(
            drain(&mut events),
            vec![StatusEventKind::Started, StatusEventKind::Stopped]
        );
        assert!(matches!(
            manager.stop().await,
            Err(SessionError::ManagerUnavailable)
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_start_after_shutdown_releases_claim() {
        let (manager, _engine, _events) = manager();
        manager.shutdown().await;

        for _ in 0..2 {
            assert!(matches!(
                manager.start("dap.local").await,
                Err(SessionError::ManagerUnavailable)
            ));
        }
    }
}
