//! Forwarding of engine events to an audio collaborator.

use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use shared::events::{Cue, GameEvent};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, warn};

pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: Cue);
}

/// Drops every cue.
pub struct SilentCuePlayer;

impl CuePlayer for SilentCuePlayer {
    fn play(&self, _cue: Cue) {}
}

/// Keeps every cue it is asked to play, in order.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingCuePlayer {
    played: Mutex<Vec<Cue>>,
}

#[cfg(test)]
impl RecordingCuePlayer {
    pub fn played(&self) -> Vec<Cue> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl CuePlayer for RecordingCuePlayer {
    fn play(&self, cue: Cue) {
        if let Ok(mut played) = self.played.lock() {
            played.push(cue);
        }
    }
}

/// Plays the cue of every event until the engine's event channel closes.
pub fn spawn_cue_forwarder(
    mut events: broadcast::Receiver<GameEvent>,
    player: Arc<dyn CuePlayer>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(cue) = event.cue() {
                        player.play(cue);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "cues: receiver lagged; dropping missed cues");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("cues: event channel closed");
                    break;
                }
            }
        }
    })
}
