//! Proxy Commands
//!
//! Entry points for the desktop shell. Errors are flattened to strings for
//! the UI layer.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::engine::{NativeEngine, ProxyConfig};
use crate::session::{
    ProxySessionManager, SessionInfo, SessionResult, StatusEventBus, SubscriptionHandle,
};
use crate::settings::{keys, SessionSettings, SettingsExt, SettingsStore};

/// Shared state behind the proxy commands
pub struct ProxyManagerState {
    pub manager: Arc<ProxySessionManager>,
    pub settings: Arc<dyn SettingsStore>,
}

impl ProxyManagerState {
    /// Build a manager with a fresh bus around `engine`
    pub fn new<E: NativeEngine>(engine: E, settings: Arc<dyn SettingsStore>) -> SessionResult<Self> {
        let manager = ProxySessionManager::new(engine, StatusEventBus::new())?;
        Ok(Self {
            manager: Arc::new(manager),
            settings,
        })
    }

    pub fn bus(&self) -> &StatusEventBus {
        self.manager.bus()
    }
}

/// Start the proxy with the address and config stored in settings
pub async fn start_proxy(state: &ProxyManagerState) -> Result<(), String> {
    let settings = SessionSettings::load(state.settings.as_ref()).map_err(|e| e.to_string())?;

    info!("Launching proxy for {}", settings.device_address);
    state
        .manager
        .start_with_config(settings.device_address, settings.config)
        .await?;
    Ok(())
}

/// Stop the proxy
pub async fn stop_proxy(state: &ProxyManagerState) -> Result<(), String> {
    state.manager.stop().await?;
    Ok(())
}

/// Change the engine config, live if running
pub async fn change_proxy_config(
    state: &ProxyManagerState,
    config: ProxyConfig,
) -> Result<(), String> {
    state.manager.change_config(config).await?;
    Ok(())
}

/// Whether the proxy is running
pub async fn get_proxy_status(state: &ProxyManagerState) -> Result<bool, String> {
    Ok(state.manager.query_current_status())
}

/// Session details
pub async fn get_session_info(state: &ProxyManagerState) -> Result<SessionInfo, String> {
    Ok(state.manager.session().await?)
}

/// Mirror the running flag into settings on every status change
pub fn setup_status_persistence(
    bus: &StatusEventBus,
    settings: Arc<dyn SettingsStore>,
) -> SubscriptionHandle {
    if let Err(e) = settings.set(keys::IS_PROXY_RUNNING, bus.query_current_status()) {
        warn!("Failed to record initial proxy status: {}", e);
    }

    bus.subscribe(move |event| {
        let Some(running) = event.running_status() else {
            return;
        };
        match settings.set(keys::IS_PROXY_RUNNING, running) {
            Ok(()) => debug!("Recorded {} = {}", keys::IS_PROXY_RUNNING, running),
            Err(e) => warn!("Failed to record proxy status: {}", e),
        }
    })
}
