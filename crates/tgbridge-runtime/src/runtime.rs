//! The event loop tying a transport to the bridge.
//!
//! [`BridgeRuntime`] owns the inbound event queue. Transport drivers push
//! [`TransportEvent`]s into it and the runtime handles them one at a time:
//!
//! | Event | Handling |
//! |-------|----------|
//! | `Connected` / `Disconnected` | [`EventBus::trigger`] with the lifecycle id |
//! | `Update` | decode → ACL → echo mode or subscription dispatch |
//! | `Completed` | run the outbound call's completion |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tgbridge_runtime::BridgeRuntime;
//!
//! let runtime = BridgeRuntime::builder()
//!     .config_file("tgbridge.toml")
//!     .build()?;
//!
//! let bridge = runtime.bridge();
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tgbridge_core::foundation::error::panic_message;
use tgbridge_core::{
    Bridge, DispatchOutcome, EventBus, LifecycleEvent, OutboundRequest, PendingCall, RawRecord,
    SubmissionError, SubmitResult, Transport, TransportDriver, TransportEvent, UpdateKind,
    parse_update,
};

use crate::config::{BridgeConfig, ConfigLoader, ConfigResult};
use crate::error::RuntimeResult;
use crate::filter::AccessList;

/// What the runtime did with one transport event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A lifecycle event was raised on the event bus.
    Lifecycle {
        /// The event.
        event: LifecycleEvent,
        /// Number of host handlers invoked.
        handlers: usize,
    },
    /// The update was dispatched to subscriptions.
    Dispatched(DispatchOutcome),
    /// Echo mode answered the update.
    Echoed,
    /// The update came from a chat outside the access list.
    Rejected,
    /// The update record could not be decoded.
    Dropped,
    /// An outbound call completion ran.
    Completed,
}

/// Transport used when the bot is switched off; it accepts nothing.
struct DisabledTransport;

impl Transport for DisabledTransport {
    fn submit(&self, _request: OutboundRequest, _pending: Option<PendingCall>) -> SubmitResult<()> {
        Err(SubmissionError::Unavailable("telegram bot is disabled".into()))
    }
}

/// Drives a bridge from transport events.
pub struct BridgeRuntime {
    config: BridgeConfig,
    bridge: Arc<Bridge>,
    events: Arc<EventBus>,
    acl: AccessList,
    event_tx: mpsc::Sender<TransportEvent>,
    event_rx: mpsc::Receiver<TransportEvent>,
    driver: Option<Box<dyn TransportDriver>>,
    shutdown: CancellationToken,
}

impl BridgeRuntime {
    /// Creates a runtime builder that loads configuration from the usual places.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime with the Bot API transport.
    ///
    /// Initializes logging and validates `config`. When the bot is disabled
    /// no transport is created and every outbound call is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the transport
    /// cannot be created.
    #[cfg(feature = "http-client")]
    pub fn from_config(config: BridgeConfig) -> RuntimeResult<Self> {
        crate::logging::init_from_config(&config.logging);
        crate::config::validate_config(&config)?;

        if !config.telegram.enable {
            info!("Telegram bot is disabled in configuration");
            return Ok(Self::with_transport(config, Arc::new(DisabledTransport), None));
        }

        let (transport, driver) =
            tgbridge_transport::http_transport(config.telegram.to_transport_config())?;

        info!(
            server = %config.telegram.server,
            acl = config.telegram.acl.len(),
            echo_bot = config.telegram.echo_bot,
            "Runtime initialized from configuration"
        );

        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Some(Box::new(driver)),
        ))
    }

    /// Creates a runtime over an arbitrary transport.
    ///
    /// Without a driver, events have to be fed through
    /// [`event_sender`](Self::event_sender).
    pub fn with_transport(
        config: BridgeConfig,
        transport: Arc<dyn Transport>,
        driver: Option<Box<dyn TransportDriver>>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.telegram.rx_queue_len.max(1));
        let acl = AccessList::new(config.telegram.acl.iter().copied());
        if acl.is_empty() {
            warn!("ACL is empty, every update will be ignored");
        }

        Self {
            bridge: Arc::new(Bridge::new(transport)),
            events: Arc::new(EventBus::new()),
            acl,
            config,
            event_tx,
            event_rx,
            driver,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a runtime with no outbound transport.
    pub fn disabled(config: BridgeConfig) -> Self {
        Self::with_transport(config, Arc::new(DisabledTransport), None)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the bridge updates are dispatched through.
    pub fn bridge(&self) -> Arc<Bridge> {
        Arc::clone(&self.bridge)
    }

    /// Returns the bus lifecycle events are raised on.
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Returns a sender into the inbound event queue.
    pub fn event_sender(&self) -> mpsc::Sender<TransportEvent> {
        self.event_tx.clone()
    }

    /// Returns the token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handles one transport event.
    pub fn process(&self, event: TransportEvent) -> EventOutcome {
        match event {
            TransportEvent::Connected => self.raise(LifecycleEvent::Connected),
            TransportEvent::Disconnected => self.raise(LifecycleEvent::Disconnected),
            TransportEvent::Update(record) => self.handle_update(&record),
            TransportEvent::Completed { pending, record } => {
                let call_id = pending.id();
                debug!(call_id, method = %pending.method(), "Completing outbound call");
                if let Err(payload) =
                    panic::catch_unwind(AssertUnwindSafe(|| pending.complete(&record)))
                {
                    warn!(
                        call_id,
                        error = %panic_message(payload.as_ref()),
                        "Completion panicked"
                    );
                }
                EventOutcome::Completed
            }
        }
    }

    fn raise(&self, event: LifecycleEvent) -> EventOutcome {
        info!(event = ?event, id = event.id(), "Lifecycle event");
        let handlers = self.events.trigger(event.id());
        EventOutcome::Lifecycle { event, handlers }
    }

    fn handle_update(&self, record: &RawRecord) -> EventOutcome {
        let update = match parse_update(record) {
            Ok(update) => update,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable update");
                return EventOutcome::Dropped;
            }
        };

        info!(
            kind = %update.kind,
            chat_id = update.chat_id,
            user_id = ?update.user_id,
            text = update.text().unwrap_or_default(),
            "Received update"
        );

        if !self.acl.allows(update.chat_id) {
            info!(chat_id = update.chat_id, "Chat not found in ACL, ignoring update");
            return EventOutcome::Rejected;
        }
        debug!(chat_id = update.chat_id, "Chat found in ACL, accepting update");

        if self.config.telegram.echo_bot && update.kind == UpdateKind::Message {
            if let Some(text) = update.text()
                && let Err(e) = self.bridge.calls().send_message(update.chat_id, text)
            {
                warn!(chat_id = update.chat_id, error = %e, "Echo reply rejected");
            }
            return EventOutcome::Echoed;
        }

        EventOutcome::Dispatched(self.bridge.registry().dispatch(&update))
    }

    /// Runs the event loop until `shutdown` resolves or the shutdown token is
    /// cancelled.
    ///
    /// Returns immediately when the bot is disabled.
    pub async fn run_until<F>(mut self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if !self.config.telegram.enable {
            info!("Telegram bot is disabled, nothing to run");
            return Ok(());
        }

        let driver_task = self.driver.take().map(|driver| {
            let events = self.event_tx.clone();
            let token = self.shutdown.child_token();
            tokio::spawn(driver.run(events, token))
        });

        info!("tgbridge runtime is now running");
        tokio::pin!(shutdown);

        loop {
            let event = tokio::select! {
                () = &mut shutdown => None,
                () = self.shutdown.cancelled() => None,
                event = self.event_rx.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            self.process(event);
        }

        self.shutdown.cancel();
        if let Some(task) = driver_task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Transport driver task failed");
        }

        info!("tgbridge runtime stopped");
        Ok(())
    }

    /// Runs the event loop until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Signal`](crate::RuntimeError::Signal) if the
    /// signal handlers cannot be registered.
    pub async fn run(self) -> RuntimeResult<()> {
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        self.run_until(async move {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
                info!("Received Ctrl+C, shutting down");
            }
        })
        .await
    }
}

impl std::fmt::Debug for BridgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRuntime")
            .field("config", &self.config)
            .field("bridge", &self.bridge)
            .field("events", &self.events)
            .field("has_driver", &self.driver.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BridgeRuntime`] from loaded configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current and user config directories.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new()
                .with_current_dir()
                .with_user_config_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BridgeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration without building a runtime.
    pub fn load_config(self) -> ConfigResult<BridgeConfig> {
        self.config_loader.load()
    }

    /// Loads the configuration and builds the runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or validation fails, or the transport
    /// cannot be created.
    #[cfg(feature = "http-client")]
    pub fn build(self) -> RuntimeResult<BridgeRuntime> {
        let config = self.config_loader.load()?;
        BridgeRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
