//! Game session state machine.
//!
//! `Session` is synchronous and knows nothing about time; the engine owns one
//! and supplies the delays between transitions. Calls made in the wrong phase
//! return `None`/`false` and leave the session untouched.

use rand::Rng;
use serde::Serialize;
use shared::domain::{Color, Phase};

use crate::{playback::Playback, timing::Timing};

/// Identifies one start/restart run. Work scheduled under an older
/// generation must be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Generation(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub round: u32,
    pub best_round: u32,
    pub sequence_len: usize,
    pub progress_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Correct so far; more input expected.
    Continue { entered: usize, total: usize },
    RoundComplete { round: u32, new_best: bool },
    Mismatch {
        round: u32,
        expected: Color,
        got: Color,
        new_best: bool,
    },
}

/// Result of a forced restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ended {
    pub round: u32,
    pub new_best: bool,
    pub generation: Generation,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    phase: Phase,
    sequence: Vec<Color>,
    progress: Vec<Color>,
    round: u32,
    best_round: u32,
    generation: Generation,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_best_round(best_round: u32) -> Self {
        Self {
            best_round,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn sequence(&self) -> &[Color] {
        &self.sequence
    }

    pub fn progress(&self) -> &[Color] {
        &self.progress
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn best_round(&self) -> u32 {
        self.best_round
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            round: self.round,
            best_round: self.best_round,
            sequence_len: self.sequence.len(),
            progress_len: self.progress.len(),
        }
    }

    /// Idle/Over → Armed with an empty sequence.
    pub fn start(&mut self) -> Option<Generation> {
        if !self.phase.can_start() {
            return None;
        }
        self.sequence.clear();
        self.progress.clear();
        self.round = 0;
        self.phase = Phase::Armed;
        Some(self.bump_generation())
    }

    /// Armed/RoundComplete → Presenting, one random color longer.
    pub fn present_sequence<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        timing: &Timing,
    ) -> Option<Playback> {
        if !matches!(self.phase, Phase::Armed | Phase::RoundComplete) {
            return None;
        }
        let color = Color::random(rng);
        self.present_with(color, timing)
    }

    pub(crate) fn present_with(&mut self, color: Color, timing: &Timing) -> Option<Playback> {
        if !matches!(self.phase, Phase::Armed | Phase::RoundComplete) {
            return None;
        }
        self.sequence.push(color);
        self.round = u32::try_from(self.sequence.len()).unwrap_or(u32::MAX);
        self.progress.clear();
        self.phase = Phase::Presenting;
        Some(Playback::new(self.sequence.clone(), timing))
    }

    /// Presenting → AwaitingInput once the playback of `generation` is done.
    pub fn finish_presentation(&mut self, generation: Generation) -> bool {
        if generation != self.generation || self.phase != Phase::Presenting {
            return false;
        }
        self.phase = Phase::AwaitingInput;
        true
    }

    /// AwaitingInput → Validating, recording the press.
    pub fn accept_input(&mut self, color: Color) -> bool {
        if !self.phase.accepts_input() || self.progress.len() >= self.sequence.len() {
            return false;
        }
        self.progress.push(color);
        self.phase = Phase::Validating;
        true
    }

    /// Checks the newest press against the sequence at the same index.
    pub fn validate(&mut self) -> Option<Verdict> {
        if self.phase != Phase::Validating {
            return None;
        }
        let index = self.progress.len().checked_sub(1)?;
        let got = self.progress[index];
        let expected = self.sequence[index];

        if got != expected {
            let new_best = self.raise_best();
            self.phase = Phase::Over { round: self.round };
            return Some(Verdict::Mismatch {
                round: self.round,
                expected,
                got,
                new_best,
            });
        }

        if self.progress.len() == self.sequence.len() {
            let new_best = self.raise_best();
            self.phase = Phase::RoundComplete;
            return Some(Verdict::RoundComplete {
                round: self.round,
                new_best,
            });
        }

        self.phase = Phase::AwaitingInput;
        Some(Verdict::Continue {
            entered: self.progress.len(),
            total: self.sequence.len(),
        })
    }

    /// `accept_input` followed by `validate`.
    pub fn submit_input(&mut self, color: Color) -> Option<Verdict> {
        if !self.accept_input(color) {
            return None;
        }
        self.validate()
    }

    /// Any non-Idle phase → Over, cancelling whatever run was in flight.
    pub fn restart(&mut self) -> Option<Ended> {
        if self.phase == Phase::Idle {
            return None;
        }
        let new_best = self.raise_best();
        self.phase = Phase::Over { round: self.round };
        Some(Ended {
            round: self.round,
            new_best,
            generation: self.bump_generation(),
        })
    }

    /// Over → Idle for the restart tagged `generation`.
    pub fn reset_to_idle(&mut self, generation: Generation) -> bool {
        if generation != self.generation || !self.phase.is_over() {
            return false;
        }
        self.sequence.clear();
        self.progress.clear();
        self.round = 0;
        self.phase = Phase::Idle;
        true
    }

    fn raise_best(&mut self) -> bool {
        if self.round > self.best_round {
            self.best_round = self.round;
            true
        } else {
            false
        }
    }

    fn bump_generation(&mut self) -> Generation {
        self.generation = Generation(self.generation.0.wrapping_add(1));
        self.generation
    }
}
