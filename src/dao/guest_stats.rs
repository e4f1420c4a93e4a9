//! Guest statistics kept on-device, replicating the server scoring rules.
//!
//! The two game modes deliberately keep different policies:
//! regular mode counts one attempt per answer and a consecutive-correct streak, while
//! advanced mode counts every chord of a sequence and keeps a consecutive-day streak.

use std::sync::Arc;

use indexmap::IndexMap;
use time::Date;
use tracing::debug;

use crate::{
    dao::storage::{KEY_GUEST_GAME_STATS, KeyValueStore, StorageResult, read_json, write_json},
    state::game::{AggregateStats, GameMode, accuracy_percent},
};

/// Persisted shape of `guestGameStats`.
pub type GuestStatsMap = IndexMap<String, AggregateStats>;

/// Regular-mode policy: one answer is one attempt; the streak counts consecutive correct answers.
pub fn apply_answer(
    stats: &AggregateStats,
    is_correct: bool,
    is_win: bool,
    today: Date,
) -> AggregateStats {
    let total_attempts = stats.total_attempts.saturating_add(1);
    let correct_answers = stats.correct_answers.saturating_add(u32::from(is_correct));

    AggregateStats {
        streak: if is_correct { stats.streak.saturating_add(1) } else { 0 },
        accuracy: accuracy_percent(correct_answers, total_attempts),
        total_attempts,
        correct_answers,
        wins: stats.wins.saturating_add(u32::from(is_win)),
        last_played_date: Some(today),
    }
}

/// Advanced-mode policy: every chord is an attempt and every correct chord is a win.
///
/// A fully correct sequence earns nothing beyond its per-chord wins.
pub fn apply_sequence(
    stats: &AggregateStats,
    sequence_length: usize,
    correct_chords: usize,
    today: Date,
) -> AggregateStats {
    let attempts = u32::try_from(sequence_length).unwrap_or(u32::MAX);
    let correct = u32::try_from(correct_chords.min(sequence_length)).unwrap_or(u32::MAX);

    let total_attempts = stats.total_attempts.saturating_add(attempts);
    let correct_answers = stats.correct_answers.saturating_add(correct);

    AggregateStats {
        streak: day_streak(stats.streak, stats.last_played_date, today, correct > 0),
        accuracy: accuracy_percent(correct_answers, total_attempts),
        total_attempts,
        correct_answers,
        wins: stats.wins.saturating_add(correct),
        last_played_date: Some(today),
    }
}

/// Same day keeps the streak, the following day with a correct chord extends it,
/// anything else restarts it (at 1 when this session had a correct chord).
fn day_streak(current: u32, last_played: Option<Date>, today: Date, any_correct: bool) -> u32 {
    let restart = u32::from(any_correct);
    let Some(last_played) = last_played else {
        return restart;
    };

    match (today - last_played).whole_days() {
        days if days <= 0 => current,
        1 if any_correct => current.saturating_add(1),
        _ => restart,
    }
}

/// Read-modify-write access to `guestGameStats`.
#[derive(Clone)]
pub struct GuestStatsStore {
    store: Arc<dyn KeyValueStore>,
}

impl GuestStatsStore {
    /// Wrap the device store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load(&self) -> StorageResult<GuestStatsMap> {
        Ok(read_json(self.store.as_ref(), KEY_GUEST_GAME_STATS)
            .await?
            .unwrap_or_default())
    }

    /// Stats of `mode`, defaulting every missing counter to zero.
    pub async fn get_game_mode_stats(&self, mode: GameMode) -> StorageResult<AggregateStats> {
        let mut all = self.load().await?;
        Ok(all.swap_remove(mode.key()).unwrap_or_default())
    }

    /// Count one answer in `mode` with the regular-mode policy.
    pub async fn update_game_stats(
        &self,
        mode: GameMode,
        is_correct: bool,
        is_win: bool,
        today: Date,
    ) -> StorageResult<AggregateStats> {
        self.update(mode, |stats| apply_answer(stats, is_correct, is_win, today))
            .await
    }

    /// Count a submitted sequence with the advanced-mode policy.
    pub async fn update_sequence_stats(
        &self,
        sequence_length: usize,
        correct_chords: usize,
        today: Date,
    ) -> StorageResult<AggregateStats> {
        self.update(GameMode::Advanced, |stats| {
            apply_sequence(stats, sequence_length, correct_chords, today)
        })
        .await
    }

    /// Forget every guest stat.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.remove(KEY_GUEST_GAME_STATS).await
    }

    async fn update<F>(&self, mode: GameMode, apply: F) -> StorageResult<AggregateStats>
    where
        F: FnOnce(&AggregateStats) -> AggregateStats,
    {
        let mut all = self.load().await?;
        let current = all.get(mode.key()).cloned().unwrap_or_default();
        let next = apply(&current);
        all.insert(mode.key().to_string(), next.clone());
        write_json(self.store.as_ref(), KEY_GUEST_GAME_STATS, &all).await?;

        debug!(
            mode = mode.key(),
            streak = next.streak,
            accuracy = next.accuracy,
            total_attempts = next.total_attempts,
            "guest stats updated"
        );
        Ok(next)
    }
}
