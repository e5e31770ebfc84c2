//! Text for the terminal board.

use shared::{
    domain::{Phase, ScoreRecord},
    events::{FlashSource, GameEvent},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub fn prompt(phase: Phase, round: u32) -> Option<String> {
    Some(match phase {
        Phase::Idle => "PRESS START (s)".to_string(),
        Phase::Armed => "GET READY".to_string(),
        Phase::Presenting => format!("WATCH THE SEQUENCE - ROUND {round}"),
        Phase::AwaitingInput => "YOUR TURN".to_string(),
        Phase::Validating => return None,
        Phase::RoundComplete => format!("ROUND {round} COMPLETE"),
        Phase::Over { round } => format!("GAME OVER - ROUND {round}"),
    })
}

pub fn record_text(best: Option<&ScoreRecord>) -> String {
    match best {
        Some(record) => record.display_text(),
        None => "Record: none yet".to_string(),
    }
}

/// Turns engine events into board lines, folding partial progress into the
/// next "your turn" prompt.
#[derive(Debug, Default)]
pub struct Screen {
    progress: Option<(usize, usize)>,
}

impl Screen {
    pub fn line_for(&mut self, event: &GameEvent) -> Option<String> {
        match *event {
            GameEvent::PhaseChanged {
                phase: Phase::AwaitingInput,
                ..
            } => Some(match self.progress.take() {
                Some((entered, total)) => format!("KEEP GOING {entered}/{total}"),
                None => "YOUR TURN".to_string(),
            }),
            GameEvent::PhaseChanged { phase, round } => {
                if phase != Phase::Validating {
                    self.progress = None;
                }
                prompt(phase, round)
            }
            GameEvent::FlashOn {
                color,
                source: FlashSource::Sequence,
            } => Some(format!("  [ {} ]", color.name().to_ascii_uppercase())),
            GameEvent::FlashOn {
                color,
                source: FlashSource::Press,
            } => Some(format!("  ( {} )", color.name())),
            GameEvent::Progress { entered, total } if entered < total => {
                self.progress = Some((entered, total));
                None
            }
            GameEvent::BestRoundChanged { best_round } => Some(format!("NEW BEST: ROUND {best_round}")),
            GameEvent::FlashOn {
                source: FlashSource::Sweep,
                ..
            }
            | GameEvent::FlashOff { .. }
            | GameEvent::Progress { .. }
            | GameEvent::Cue(_) => None,
        }
    }
}

pub async fn render_events(mut events: broadcast::Receiver<GameEvent>) {
    let mut screen = Screen::default();
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = screen.line_for(&event) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "render: board fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("render: event channel closed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
