pub mod game;
pub mod slice;
pub mod state_machine;

use std::{sync::Arc, time::Duration};

use tokio::sync::RwLock;

use crate::dao::{
    backend::GameBackend, guest_stats::GuestStatsStore, level_stats::LevelStatsCache,
    session::SessionStore, storage::KeyValueStore,
};

pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId};
use self::{
    game::{Instrument, Player},
    slice::{AdvancedSlice, RegularSlice},
};

pub type SharedState = Arc<AppState>;

/// Tunables of the game screens.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Quiet period after the last chord before a full sequence is submitted.
    pub auto_submit_delay: Duration,
    /// Instrument id used for guitar when none was stored on the device.
    pub default_guitar_id: String,
    /// Instrument id used for piano when none was stored on the device.
    pub default_piano_id: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            auto_submit_delay: Duration::from_millis(1_000),
            default_guitar_id: "guitar".into(),
            default_piano_id: "piano".into(),
        }
    }
}

/// Application store: backend seam, local stores, the signed-in player and one slice per
/// game screen. Passed explicitly to every service instead of living in a global.
pub struct AppState {
    backend: Arc<dyn GameBackend>,
    guest_stats: GuestStatsStore,
    level_stats: LevelStatsCache,
    sessions: SessionStore,
    player: RwLock<Player>,
    instrument: RwLock<Instrument>,
    regular: RwLock<RegularSlice>,
    advanced: RwLock<AdvancedSlice>,
    settings: GameSettings,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in guest mode with the guitar selected.
    pub fn new(
        backend: Arc<dyn GameBackend>,
        store: Arc<dyn KeyValueStore>,
        settings: GameSettings,
    ) -> SharedState {
        Arc::new(Self {
            backend,
            guest_stats: GuestStatsStore::new(store.clone()),
            level_stats: LevelStatsCache::new(store.clone()),
            sessions: SessionStore::new(store),
            player: RwLock::new(Player::Guest),
            instrument: RwLock::new(Instrument::Guitar),
            regular: RwLock::new(RegularSlice::new()),
            advanced: RwLock::new(AdvancedSlice::new()),
            settings,
        })
    }

    /// Game endpoints.
    pub fn backend(&self) -> &Arc<dyn GameBackend> {
        &self.backend
    }

    /// Guest statistics accumulator.
    pub fn guest_stats(&self) -> &GuestStatsStore {
        &self.guest_stats
    }

    /// Mirror of the signed-in user's stats.
    pub fn level_stats(&self) -> &LevelStatsCache {
        &self.level_stats
    }

    /// Credential and instrument keys.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Screen tunables.
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Who is playing right now.
    pub async fn player(&self) -> Player {
        self.player.read().await.clone()
    }

    /// Switch between guest and signed-in play.
    pub async fn set_player(&self, player: Player) {
        *self.player.write().await = player;
    }

    /// Instrument whose samples are requested.
    pub async fn instrument(&self) -> Instrument {
        *self.instrument.read().await
    }

    /// Change the instrument used for the next rounds.
    pub async fn set_instrument(&self, instrument: Instrument) {
        *self.instrument.write().await = instrument;
    }

    /// Regular screen slice.
    pub fn regular(&self) -> &RwLock<RegularSlice> {
        &self.regular
    }

    /// Advanced screen slice.
    pub fn advanced(&self) -> &RwLock<AdvancedSlice> {
        &self.advanced
    }

    /// Clear both screens, e.g. on logout.
    pub async fn reset_slices(&self) {
        self.regular.write().await.reset();
        self.advanced.write().await.reset();
    }
}
