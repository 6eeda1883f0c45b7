//! Bot selection.
//!
//! The [`BotRegistry`] answers "which connected bot can deliver to this
//! target?". A target only carries its own identifiers, not the guild or
//! session it belongs to, so the answer cannot be derived by inspecting the
//! target. Instead every refresh walks each connected bot's visible topology
//! via [`Bot::list_targets`](crate::Bot::list_targets) and rebuilds a `Target -> bots` index.
//!
//! # States
//!
//! - `Uninitialized`: no refresh has completed; [`BotRegistry::get_bot`]
//!   fails with [`CourierError::RegistryNotReady`].
//! - `Ready`: the index reflects the most recent completed refresh.
//!
//! # Concurrency
//!
//! Each refresh builds a fresh immutable index snapshot and publishes it
//! with a single pointer swap, so readers see either the previous index or
//! the new one. Topology queries run without any lock held. When refreshes
//! overlap, an older refresh never overwrites a newer one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::bot::{BoxedBot, same_bot};
use crate::error::{CourierError, CourierResult};
use crate::target::{AdapterKind, Target};

// =============================================================================
// BotSource
// =============================================================================

/// The host's view of currently connected sessions.
pub trait BotSource: Send + Sync {
    /// Returns every connected bot, in registration order.
    fn connected_bots(&self) -> Vec<BoxedBot>;

    /// Returns the live handle of a connected session.
    fn get(&self, adapter: AdapterKind, bot_id: &str) -> Option<BoxedBot> {
        self.connected_bots()
            .into_iter()
            .find(|bot| bot.adapter() == adapter && bot.id() == bot_id)
    }
}

// =============================================================================
// BotPool
// =============================================================================

/// An ordered set of connected bots maintained by the host.
///
/// Hosts call [`add`](Self::add) when a session connects and
/// [`remove`](Self::remove) when it drops.
#[derive(Default)]
pub struct BotPool {
    bots: RwLock<Vec<BoxedBot>>,
}

impl BotPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connected bot.
    ///
    /// A bot with the same adapter and id replaces the previous handle in
    /// place, keeping its registration position. Returns true if the bot was
    /// not already present.
    pub fn add(&self, bot: BoxedBot) -> bool {
        let mut bots = self.bots.write();
        if let Some(slot) = bots.iter_mut().find(|existing| same_bot(existing, &bot)) {
            *slot = bot;
            return false;
        }
        debug!(bot_id = %bot.id(), adapter = %bot.adapter(), "Bot added to pool");
        bots.push(bot);
        true
    }

    /// Removes a bot, returning its handle if it was present.
    pub fn remove(&self, adapter: AdapterKind, bot_id: &str) -> Option<BoxedBot> {
        let mut bots = self.bots.write();
        let position = bots
            .iter()
            .position(|bot| bot.adapter() == adapter && bot.id() == bot_id)?;
        debug!(bot_id = %bot_id, adapter = %adapter, "Bot removed from pool");
        Some(bots.remove(position))
    }

    /// Looks up a connected bot.
    pub fn get(&self, adapter: AdapterKind, bot_id: &str) -> Option<BoxedBot> {
        self.bots
            .read()
            .iter()
            .find(|bot| bot.adapter() == adapter && bot.id() == bot_id)
            .cloned()
    }

    /// Returns the number of connected bots.
    pub fn len(&self) -> usize {
        self.bots.read().len()
    }

    /// Returns true if no bot is connected.
    pub fn is_empty(&self) -> bool {
        self.bots.read().is_empty()
    }
}

impl BotSource for BotPool {
    fn connected_bots(&self) -> Vec<BoxedBot> {
        self.bots.read().clone()
    }

    fn get(&self, adapter: AdapterKind, bot_id: &str) -> Option<BoxedBot> {
        BotPool::get(self, adapter, bot_id)
    }
}

// =============================================================================
// Registry Index
// =============================================================================

/// Identifies one session independently of its current handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    adapter: AdapterKind,
    bot_id: String,
}

impl SessionKey {
    fn of(bot: &BoxedBot) -> Self {
        Self {
            adapter: bot.adapter(),
            bot_id: bot.id().to_string(),
        }
    }
}

/// An immutable snapshot produced by one refresh.
///
/// Sessions are stored by key, never by handle: a session that reconnects
/// under the same id is served through its new handle.
struct RegistryIndex {
    version: u64,
    /// Sessions that were connected when the refresh started, in registration order.
    sessions: Vec<SessionKey>,
    /// Reachable target -> positions in `sessions`, ascending.
    routes: HashMap<Target, Vec<usize>>,
}

impl RegistryIndex {
    fn candidates<'a>(&'a self, target: &Target) -> impl Iterator<Item = &'a SessionKey> + 'a {
        self.routes
            .get(target)
            .into_iter()
            .flatten()
            .map(|&position| &self.sessions[position])
    }
}

/// Lifecycle state of a [`BotRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No refresh has completed yet.
    Uninitialized,
    /// The index reflects the most recent completed refresh.
    Ready,
}

/// Outcome of one [`BotRegistry::refresh_bots`] cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshSummary {
    /// Version assigned to this refresh.
    pub version: u64,
    /// Number of bots queried.
    pub bots: usize,
    /// Number of bots whose topology query failed.
    pub failed: usize,
    /// Number of distinct reachable targets indexed.
    pub targets: usize,
    /// False if a newer refresh completed first and this one was discarded.
    pub published: bool,
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "refresh #{}: {} bot(s) ({} failed), {} target(s)",
            self.version, self.bots, self.failed, self.targets
        )
    }
}

// =============================================================================
// BotRegistry
// =============================================================================

/// Index from targets to the connected bots able to reach them.
pub struct BotRegistry {
    source: Arc<dyn BotSource>,
    index: RwLock<Option<Arc<RegistryIndex>>>,
    next_version: AtomicU64,
}

impl BotRegistry {
    /// Creates an uninitialized registry over `source`.
    pub fn new(source: Arc<dyn BotSource>) -> Self {
        Self {
            source,
            index: RwLock::new(None),
            next_version: AtomicU64::new(0),
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> RegistryState {
        if self.index.read().is_some() {
            RegistryState::Ready
        } else {
            RegistryState::Uninitialized
        }
    }

    /// Returns true once a refresh has completed.
    pub fn is_ready(&self) -> bool {
        self.state() == RegistryState::Ready
    }

    /// Returns the version of the published index, if any.
    pub fn version(&self) -> Option<u64> {
        self.snapshot().map(|index| index.version)
    }

    /// Returns the number of targets in the published index.
    pub fn target_count(&self) -> usize {
        self.snapshot().map_or(0, |index| index.routes.len())
    }

    /// Rebuilds the index from every connected bot's topology.
    ///
    /// Bots are queried concurrently. A bot whose query fails is left out of
    /// this cycle's index and logged; the refresh itself never fails.
    pub async fn refresh_bots(&self) -> RefreshSummary {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        let bots = self.source.connected_bots();

        let topologies = join_all(bots.iter().map(|bot| bot.list_targets())).await;

        let mut routes: HashMap<Target, Vec<usize>> = HashMap::new();
        let mut failed = 0;
        for (position, (bot, topology)) in bots.iter().zip(topologies).enumerate() {
            match topology {
                Ok(targets) => {
                    debug!(
                        bot_id = %bot.id(),
                        adapter = %bot.adapter(),
                        targets = targets.len(),
                        "Collected bot topology"
                    );
                    for target in targets {
                        let positions = routes.entry(target).or_default();
                        if positions.last() != Some(&position) {
                            positions.push(position);
                        }
                    }
                }
                Err(error) => {
                    failed += 1;
                    warn!(
                        bot_id = %bot.id(),
                        adapter = %bot.adapter(),
                        %error,
                        "Topology query failed, bot omitted from this refresh"
                    );
                }
            }
        }

        let mut summary = RefreshSummary {
            version,
            bots: bots.len(),
            failed,
            targets: routes.len(),
            published: false,
        };

        let index = Arc::new(RegistryIndex {
            version,
            sessions: bots.iter().map(SessionKey::of).collect(),
            routes,
        });

        {
            let mut slot = self.index.write();
            if slot.as_ref().is_some_and(|current| current.version > version) {
                debug!(version, "Discarding refresh superseded by a newer one");
                return summary;
            }
            *slot = Some(index);
        }

        summary.published = true;
        info!(
            version,
            bots = summary.bots,
            failed = summary.failed,
            targets = summary.targets,
            "Bot registry refreshed"
        );
        summary
    }

    /// Returns a connected bot able to deliver to `target`.
    ///
    /// Bot-scoped targets resolve to the connected bot named by their
    /// `bot_id`. Other targets resolve through the index; when several bots
    /// qualify the earliest registered one that is still connected wins.
    pub fn get_bot(&self, target: &Target) -> CourierResult<BoxedBot> {
        let index = self.snapshot().ok_or(CourierError::RegistryNotReady)?;
        let no_bot = || CourierError::NoCapableBot {
            target: target.clone(),
        };

        if let Some(bot_id) = target.bot_id() {
            return self.source.get(target.adapter(), bot_id).ok_or_else(no_bot);
        }

        index
            .candidates(target)
            .find_map(|key| self.source.get(key.adapter, &key.bot_id))
            .ok_or_else(no_bot)
    }

    fn snapshot(&self) -> Option<Arc<RegistryIndex>> {
        self.index.read().clone()
    }
}

impl fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotRegistry")
            .field("state", &self.state())
            .field("version", &self.version())
            .field("targets", &self.target_count())
            .finish()
    }
}
