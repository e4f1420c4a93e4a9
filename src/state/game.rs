//! Domain types shared by the game slices, the backend client and the local stores.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, macros::format_description};

/// Difficulty/content tier of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

/// Raised when a level outside `1..=4` is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("level {0} is outside {min}..={max}", min = Level::MIN, max = Level::MAX)]
pub struct LevelError(pub u8);

impl Level {
    /// Lowest playable level.
    pub const MIN: u8 = 1;
    /// Highest playable level.
    pub const MAX: u8 = 4;

    /// Validate and wrap a raw level number.
    pub fn new(value: u8) -> Result<Self, LevelError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(LevelError(value))
        }
    }

    /// Raw level number.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for Level {
    type Error = LevelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruments the backend ships chord samples for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    /// Guitar samples.
    Guitar,
    /// Piano samples.
    Piano,
}

impl Instrument {
    /// Name used in logs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Instrument::Guitar => "guitar",
            Instrument::Piano => "piano",
        }
    }
}

/// Who is playing: a guest tracked only on-device, or a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Player {
    /// Unauthenticated play; stats live in local storage.
    #[default]
    Guest,
    /// Signed-in player; stats are owned by the server.
    Authenticated {
        /// Backend identifier of the user.
        user_id: String,
    },
}

impl Player {
    /// Backend user id, absent for guests.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Player::Guest => None,
            Player::Authenticated { user_id } => Some(user_id),
        }
    }

    /// True when stats must be accumulated locally.
    pub fn is_guest(&self) -> bool {
        matches!(self, Player::Guest)
    }
}

/// The two game variants; also the key of the guest stats map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    /// One chord per round.
    Regular,
    /// A sequence of chords per round.
    Advanced,
}

impl GameMode {
    /// Key used inside the persisted guest stats map.
    pub fn key(self) -> &'static str {
        match self {
            GameMode::Regular => "regular",
            GameMode::Advanced => "advanced",
        }
    }
}

/// A selectable chord offered by a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordOption {
    /// Backend identifier of the chord.
    pub id: String,
    /// Display name ("C major", "Am7", ...).
    pub name: String,
    /// Sample the player can preview, if any.
    pub audio_url: Option<String>,
}

/// A single-chord question instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRound {
    /// Identifier the answer must be submitted against.
    pub round_id: String,
    /// Level the round was generated for.
    pub level: Level,
    /// Audio clip(s) of the target chord.
    pub target_audio: Vec<String>,
    /// Chords the player can choose from.
    pub options: Vec<ChordOption>,
}

/// Outcome of a submitted single-chord answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Whether the selected chord was the target.
    pub is_correct: bool,
    /// The chord that was played.
    pub correct_chord: ChordOption,
    /// The chord the player picked.
    pub selected_chord_id: String,
    /// Server-side stats after this answer (absent for guests).
    pub stats: Option<AggregateStats>,
    /// Time between the round becoming ready and the submission.
    pub response_time_ms: u64,
}

/// A chord-sequence question instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRound {
    /// Session grouping the rounds of one sequence game.
    pub session_id: String,
    /// Level the sequence was generated for.
    pub level: Level,
    /// Number of chords the player must identify.
    pub sequence_length: usize,
    /// One audio clip per chord of the target sequence, in order.
    pub target_audio: Vec<String>,
    /// Chords the player can choose from at each position.
    pub chord_pool: Vec<ChordOption>,
}

/// Outcome of a submitted sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceResult {
    /// True only when every position matched.
    pub is_correct: bool,
    /// The target sequence.
    pub correct_sequence: Vec<ChordOption>,
    /// Chord ids the player submitted.
    pub submitted_sequence: Vec<String>,
    /// Per-position comparison.
    pub comparison: Vec<bool>,
    /// Server-side stats after this sequence (absent for guests).
    pub stats: Option<AggregateStats>,
    /// Time between the round becoming ready and the submission.
    pub response_time_ms: u64,
}

impl SequenceResult {
    /// Number of positions the player got right.
    pub fn correct_chords(&self) -> usize {
        self.comparison.iter().filter(|hit| **hit).count()
    }
}

/// Cumulative performance counters.
///
/// Missing fields decode to their defaults so partially written records stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateStats {
    /// Consecutive-correct (regular) or consecutive-day (advanced) counter.
    pub streak: u32,
    /// Percentage of correct answers, rounded.
    pub accuracy: u32,
    /// Number of answers counted.
    pub total_attempts: u32,
    /// Number of correct answers counted.
    pub correct_answers: u32,
    /// Wins, per round (regular) or per chord (advanced).
    pub wins: u32,
    /// Calendar day of the last update.
    #[serde(with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub last_played_date: Option<Date>,
}

/// `round(correct / total * 100)`, zero when nothing was attempted.
pub fn accuracy_percent(correct_answers: u32, total_attempts: u32) -> u32 {
    if total_attempts == 0 {
        return 0;
    }
    (f64::from(correct_answers) / f64::from(total_attempts) * 100.0).round() as u32
}

/// Serde adapter storing dates as `YYYY-MM-DD`.
///
/// Full timestamps (`2024-05-01T10:00:00.000Z`) are accepted on read and truncated
/// to their date; unparseable values decode to `None`.
mod calendar_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => {
                let text = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|text| {
            let day = text.get(..10)?;
            Date::parse(day, DATE_FORMAT).ok()
        }))
    }
}

const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
