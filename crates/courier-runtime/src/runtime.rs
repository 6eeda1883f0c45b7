//! Runtime orchestration.
//!
//! [`CourierRuntime`] wires the delivery pipeline together and keeps the bot
//! registry current:
//!
//! ```text
//! connect_bot / disconnect_bot ──► BotPool ──► BotRegistry::refresh_bots
//!                                                  ▲
//!                        periodic refresh task ────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let runtime = CourierRuntime::builder().build()?;
//! runtime.connect_bot(Arc::new(QqBot::new(app_id, caller))).await;
//! runtime.start().await;
//!
//! let target = Target::QqGuildChannel { channel_id: 2233 };
//! runtime.courier().send_to("scheduled hello", &target, None).await?;
//!
//! runtime.run().await;
//! ```

use std::path::Path;
use std::sync::Arc;

use courier_core::{
    AdapterKind, BotPool, BotRegistry, BoxedBot, Courier, IdentifierCache, RefreshSummary,
};
use parking_lot::Mutex;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, CourierConfig};
use crate::logging;

/// Handle to the periodic refresh task.
///
/// Installed by `start` before its first refresh; `handle` is set once the
/// loop is spawned.
struct RefreshTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    fn is_active(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| !handle.is_finished())
    }
}

/// Owns the bot pool, the registry, the identifier cache and the [`Courier`].
pub struct CourierRuntime {
    config: CourierConfig,
    pool: Arc<BotPool>,
    courier: Courier,
    refresh_task: Mutex<Option<RefreshTask>>,
}

impl CourierRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging from it.
    pub fn from_config(config: &CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        let pool = Arc::new(BotPool::new());
        let registry = Arc::new(BotRegistry::new(pool.clone()));
        let courier = Courier::new(registry, Arc::new(IdentifierCache::new()));

        info!(
            log_level = %config.logging.level,
            refresh_interval_secs = ?config.registry.refresh_interval_secs,
            refresh_on_connect = config.registry.refresh_on_connect,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            pool,
            courier,
            refresh_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// The connected sessions.
    pub fn pool(&self) -> &Arc<BotPool> {
        &self.pool
    }

    pub fn courier(&self) -> &Courier {
        &self.courier
    }

    pub fn registry(&self) -> &Arc<BotRegistry> {
        self.courier.registry()
    }

    pub fn cache(&self) -> &Arc<IdentifierCache> {
        self.courier.cache()
    }

    // =========================================================================
    // Bot Management
    // =========================================================================

    /// Adds a connected session, replacing an existing one with the same id.
    pub async fn connect_bot(&self, bot: BoxedBot) {
        let adapter = bot.adapter();
        let bot_id = bot.id().to_string();
        if self.pool.add(bot) {
            info!(adapter = %adapter, bot_id = %bot_id, "Bot connected");
        } else {
            debug!(adapter = %adapter, bot_id = %bot_id, "Bot session replaced");
        }

        if self.config.registry.refresh_on_connect {
            self.refresh().await;
        }
    }

    /// Removes a session. Returns it if it was connected.
    pub async fn disconnect_bot(&self, adapter: AdapterKind, bot_id: &str) -> Option<BoxedBot> {
        let removed = self.pool.remove(adapter, bot_id);
        match &removed {
            Some(_) => info!(adapter = %adapter, bot_id = %bot_id, "Bot disconnected"),
            None => warn!(adapter = %adapter, bot_id = %bot_id, "Disconnect for unknown bot"),
        }

        if removed.is_some() && self.config.registry.refresh_on_connect {
            self.refresh().await;
        }
        removed
    }

    /// Refreshes the bot registry now.
    pub async fn refresh(&self) -> RefreshSummary {
        self.registry().refresh_bots().await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns whether the periodic refresh task is running.
    pub fn is_running(&self) -> bool {
        self.refresh_task
            .lock()
            .as_ref()
            .and_then(|task| task.handle.as_ref())
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Refreshes the registry once, then starts the periodic refresh task if
    /// an interval is configured.
    pub async fn start(&self) {
        let token = {
            let mut slot = self.refresh_task.lock();
            if slot.as_ref().is_some_and(RefreshTask::is_active) {
                warn!("Runtime is already running");
                return;
            }
            let token = CancellationToken::new();
            *slot = Some(RefreshTask {
                token: token.clone(),
                handle: None,
            });
            token
        };

        info!("Starting Courier runtime");
        self.refresh().await;

        // A cancelled token means shutdown already took the slot.
        let mut slot = self.refresh_task.lock();
        if token.is_cancelled() {
            return;
        }

        let Some(period) = self.config.registry.refresh_interval() else {
            *slot = None;
            info!("Periodic registry refresh disabled");
            return;
        };

        let registry = self.registry().clone();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; start() has just refreshed.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        registry.refresh_bots().await;
                    }
                    () = cancelled.cancelled() => {
                        debug!("Registry refresh task stopped");
                        break;
                    }
                }
            }
        });

        info!(period_secs = period.as_secs(), "Registry refresh task started");
        *slot = Some(RefreshTask {
            token,
            handle: Some(handle),
        });
    }

    /// Stops the periodic refresh task and waits for it to finish.
    pub async fn shutdown(&self) {
        let Some(task) = self.refresh_task.lock().take() else {
            return;
        };

        info!("Stopping Courier runtime");
        task.token.cancel();
        if let Some(handle) = task.handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Registry refresh task failed");
            }
        }
        info!("Runtime stopped");
    }

    /// Starts, runs until Ctrl+C or SIGTERM, then shuts down.
    pub async fn run(&self) {
        self.run_until(wait_for_shutdown()).await;
    }

    /// Starts, runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        shutdown.await;
        self.shutdown().await;
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`CourierRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = CourierRuntime::builder()
///     .config_file("config/courier.toml")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<CourierRuntime> {
        let config = self.config_loader.load()?;
        Ok(CourierRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use std::any::Any;

    use async_trait::async_trait;
    use courier_adapter_console::ConsoleBot;
    use courier_core::{
        Bot, CourierError, CourierResult, Destination, Message, Rendered, SentMessage, Target,
    };
    use tokio::sync::mpsc;

    fn runtime(refresh_interval_secs: Option<u64>, refresh_on_connect: bool) -> CourierRuntime {
        let mut config = CourierConfig::default();
        config.registry.refresh_interval_secs = refresh_interval_secs;
        config.registry.refresh_on_connect = refresh_on_connect;
        CourierRuntime::from_config(&config)
    }

    fn console(id: &str, user_id: &str) -> (BoxedBot, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(ConsoleBot::new(id, user_id, tx)), rx)
    }

    fn target(user_id: &str) -> Target {
        Target::Console {
            user_id: user_id.into(),
        }
    }

    #[tokio::test]
    async fn test_connect_refreshes_registry() {
        let runtime = runtime(None, true);
        let (bot, mut rx) = console("console", "alice");
        runtime.connect_bot(bot.clone()).await;

        let selected = runtime.registry().get_bot(&target("alice")).unwrap();
        assert!(Arc::ptr_eq(&selected, &bot));

        runtime.courier().send_to("hi", &target("alice"), None).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "[to alice] hi");

        runtime.disconnect_bot(AdapterKind::Console, "console").await.unwrap();
        assert!(matches!(
            runtime.registry().get_bot(&target("alice")),
            Err(CourierError::NoCapableBot { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_refreshes_once_without_timer() {
        let runtime = runtime(Some(0), false);
        let (bot, _rx) = console("console", "alice");
        runtime.connect_bot(bot).await;
        assert!(matches!(
            runtime.registry().get_bot(&target("alice")),
            Err(CourierError::RegistryNotReady)
        ));

        runtime.start().await;
        assert!(runtime.registry().get_bot(&target("alice")).is_ok());
        assert!(!runtime.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_picks_up_new_bots() {
        let runtime = runtime(Some(60), false);
        runtime.start().await;
        assert!(runtime.is_running());
        let version = runtime.registry().version();

        let (bot, _rx) = console("console", "bob");
        runtime.connect_bot(bot).await;
        assert!(runtime.registry().get_bot(&target("bob")).is_err());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(runtime.registry().version() > version);
        assert!(runtime.registry().get_bot(&target("bob")).is_ok());

        runtime.shutdown().await;
        assert!(!runtime.is_running());
    }

    /// A session whose topology query takes a while.
    struct SlowBot;

    #[async_trait]
    impl Bot for SlowBot {
        fn id(&self) -> &str {
            "slow"
        }

        fn adapter(&self) -> AdapterKind {
            AdapterKind::Console
        }

        fn render(&self, message: &Message) -> CourierResult<Rendered> {
            Ok(Rendered::new(AdapterKind::Console, message.extract_plain_text()))
        }

        async fn send_rendered(
            &self,
            _rendered: Rendered,
            _destination: Destination<'_>,
        ) -> CourierResult<SentMessage> {
            Ok(SentMessage::new("1"))
        }

        async fn list_targets(&self) -> CourierResult<Vec<Target>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![target("slow")])
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_start_spawns_one_task() {
        let runtime = runtime(Some(60), false);
        runtime.connect_bot(Arc::new(SlowBot)).await;

        tokio::join!(runtime.start(), runtime.start());
        assert!(runtime.is_running());

        runtime.shutdown().await;
        assert!(!runtime.is_running());

        let version = runtime.registry().version();
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(runtime.registry().version(), version);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_bot() {
        let runtime = runtime(None, true);
        assert!(
            runtime
                .disconnect_bot(AdapterKind::Qq, "missing")
                .await
                .is_none()
        );
        assert!(!runtime.registry().is_ready());
    }
}
