//! Conversions from wire payloads to domain types, enforcing the round invariants.

use crate::{
    dto::{
        common::ChordDto,
        game::{AnswerResultDto, SequenceResultDto, SequenceRoundDto, SimpleRoundDto},
    },
    state::game::{ChordOption, GameResult, GameRound, Level, SequenceResult, SequenceRound},
};

impl From<ChordDto> for ChordOption {
    fn from(value: ChordDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            audio_url: value.audio_url,
        }
    }
}

impl TryFrom<SimpleRoundDto> for GameRound {
    type Error = String;

    fn try_from(value: SimpleRoundDto) -> Result<Self, Self::Error> {
        let level = Level::new(value.level).map_err(|err| err.to_string())?;
        if value.options.is_empty() {
            return Err("round offers no chord options".into());
        }

        Ok(Self {
            round_id: value.round_id,
            level,
            target_audio: value.audio_urls,
            options: value.options.into_iter().map(Into::into).collect(),
        })
    }
}

impl TryFrom<SequenceRoundDto> for SequenceRound {
    type Error = String;

    fn try_from(value: SequenceRoundDto) -> Result<Self, Self::Error> {
        let level = Level::new(value.level).map_err(|err| err.to_string())?;
        if value.sequence_length == 0 {
            return Err("sequence length must be positive".into());
        }
        if value.audio_urls.len() != value.sequence_length {
            return Err(format!(
                "sequence length {} does not match {} audio clips",
                value.sequence_length,
                value.audio_urls.len()
            ));
        }
        if value.chord_pool.is_empty() {
            return Err("sequence offers no chord options".into());
        }

        Ok(Self {
            session_id: value.session_id,
            level,
            sequence_length: value.sequence_length,
            target_audio: value.audio_urls,
            chord_pool: value.chord_pool.into_iter().map(Into::into).collect(),
        })
    }
}

/// Attach the measured response time to an answer result.
pub fn answer_result(value: AnswerResultDto, response_time_ms: u64) -> GameResult {
    GameResult {
        is_correct: value.is_correct,
        correct_chord: value.correct_chord.into(),
        selected_chord_id: value.selected_chord_id,
        stats: value.stats,
        response_time_ms,
    }
}

/// Attach the measured response time to a sequence result, deriving the
/// per-position comparison when the backend left it out.
pub fn sequence_result(
    value: SequenceResultDto,
    response_time_ms: u64,
) -> Result<SequenceResult, String> {
    let comparison = if value.comparison.is_empty() {
        value
            .submitted_sequence
            .iter()
            .zip(&value.correct_sequence)
            .map(|(submitted, correct)| *submitted == correct.id)
            .collect()
    } else {
        value.comparison
    };

    if comparison.len() != value.submitted_sequence.len() {
        return Err(format!(
            "comparison covers {} positions for {} submitted chords",
            comparison.len(),
            value.submitted_sequence.len()
        ));
    }

    Ok(SequenceResult {
        is_correct: value.is_correct,
        correct_sequence: value.correct_sequence.into_iter().map(Into::into).collect(),
        submitted_sequence: value.submitted_sequence,
        comparison,
        stats: value.stats,
        response_time_ms,
    })
}
