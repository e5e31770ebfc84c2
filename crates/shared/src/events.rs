//! Events published by the game engine to presentation subscribers.

use serde::{Deserialize, Serialize};

use crate::domain::{Color, Phase};

/// Sound cue handed to the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", content = "color", rename_all = "snake_case")]
pub enum Cue {
    Color(Color),
    Error,
    Victory,
}

/// Why a button is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashSource {
    /// Part of the sequence the player has to repeat.
    Sequence,
    /// Feedback for the player's own press.
    Press,
    /// Cosmetic sweep after a round or a restart.
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged { phase: Phase, round: u32 },
    FlashOn { color: Color, source: FlashSource },
    FlashOff { color: Color },
    Progress { entered: usize, total: usize },
    Cue(Cue),
    BestRoundChanged { best_round: u32 },
}

impl GameEvent {
    /// Sound to play for this event, if any.
    pub fn cue(&self) -> Option<Cue> {
        match self {
            GameEvent::FlashOn { color, .. } => Some(Cue::Color(*color)),
            GameEvent::Cue(cue) => Some(*cue),
            _ => None,
        }
    }
}
