//! Async driver around a [`Session`].
//!
//! One task owns the session and applies commands in arrival order. Timed
//! steps are spawned sleeps that post back into the same mailbox tagged with
//! the session generation that scheduled them; a start or restart aborts the
//! pending sleep and anything already queued under the old generation is
//! dropped on arrival.

use std::{sync::Arc, time::Duration};

use rand::{rngs::SmallRng, SeedableRng};
use shared::{
    domain::{Color, Phase},
    events::{Cue, FlashSource, GameEvent},
};
use storage::ScoreStore;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::EngineError,
    machine::{Generation, Session, SessionSnapshot, Verdict},
    playback::{Flash, Sweep},
    timing::Timing,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub timing: Timing,
    /// Fixed seed for reproducible sequences.
    pub seed: Option<u64>,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Present,
    NextFlash,
    FlashEnd,
    Validate,
}

#[derive(Debug)]
enum Command {
    Start,
    Submit(Color),
    Restart,
    Shutdown,
    Elapsed { generation: Generation, step: Step },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterShow {
    AwaitInput,
    NextRound,
    Idle,
}

struct Show {
    flashes: Box<dyn Iterator<Item = Flash> + Send>,
    source: FlashSource,
    lit: Option<Flash>,
    then: AfterShow,
}

pub struct GameHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<GameEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl GameHandle {
    pub fn start(&self) -> Result<(), EngineError> {
        self.send(Command::Start)
    }

    pub fn submit_input(&self, color: Color) -> Result<(), EngineError> {
        self.send(Command::Submit(color))
    }

    pub fn restart(&self) -> Result<(), EngineError> {
        self.send(Command::Restart)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.borrow()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub async fn shutdown(self) -> Result<(), EngineError> {
        self.send(Command::Shutdown)?;
        if let Err(error) = self.task.await {
            warn!(%error, "engine: task ended abnormally");
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::Stopped)
    }
}

pub struct GameEngine {
    session: Session,
    rng: SmallRng,
    timing: Timing,
    store: Arc<ScoreStore>,
    player_name: Option<String>,
    events: broadcast::Sender<GameEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    commands: mpsc::WeakUnboundedSender<Command>,
    pending: Option<JoinHandle<()>>,
    show: Option<Show>,
    pressed: Option<Color>,
}

impl GameEngine {
    /// Seeds the best round from `store` and starts the engine task.
    pub async fn spawn(config: EngineConfig, store: Arc<ScoreStore>) -> GameHandle {
        let best_round = store.best_score().await;
        let session = Session::with_best_round(best_round);
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let engine = GameEngine {
            session,
            rng,
            timing: config.timing,
            store,
            player_name: config.player_name,
            events: events.clone(),
            snapshot: snapshot_tx,
            commands: commands_tx.downgrade(),
            pending: None,
            show: None,
            pressed: None,
        };
        info!(best_round, seeded = config.seed.is_some(), "engine: ready");

        GameHandle {
            commands: commands_tx,
            events,
            snapshot: snapshot_rx,
            task: tokio::spawn(engine.run(commands_rx)),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start => self.on_start(),
                Command::Submit(color) => self.on_submit(color),
                Command::Restart => self.on_restart().await,
                Command::Elapsed { generation, step } => self.on_elapsed(generation, step).await,
                Command::Shutdown => break,
            }
            self.snapshot.send_replace(self.session.snapshot());
        }
        self.cancel_pending();
        debug!("engine: stopped");
    }

    fn on_start(&mut self) {
        let Some(generation) = self.session.start() else {
            debug!(phase = ?self.session.phase(), "engine: ignoring start while a game is running");
            return;
        };
        self.cancel_pending();
        if let Some(color) = self.lit_color() {
            self.emit(GameEvent::FlashOff { color });
        }
        self.show = None;
        self.pressed = None;
        info!(generation = generation.0, "engine: game started");
        self.emit_phase();
        self.schedule(self.timing.arm_delay, Step::Present);
    }

    fn on_submit(&mut self, color: Color) {
        if !self.session.accept_input(color) {
            debug!(%color, phase = ?self.session.phase(), "engine: ignoring input outside the player's turn");
            return;
        }
        self.pressed = Some(color);
        self.emit_phase();
        self.emit(GameEvent::FlashOn {
            color,
            source: FlashSource::Press,
        });
        self.schedule(self.timing.press_feedback, Step::Validate);
    }

    async fn on_restart(&mut self) {
        let Some(ended) = self.session.restart() else {
            debug!("engine: ignoring restart while idle");
            return;
        };
        self.cancel_pending();
        if let Some(color) = self.lit_color() {
            self.emit(GameEvent::FlashOff { color });
        }
        self.show = None;
        self.pressed = None;
        info!(
            round = ended.round,
            generation = ended.generation.0,
            "engine: game restarted"
        );
        if ended.new_best {
            self.record_best(ended.round).await;
        }
        self.emit_phase();
        self.begin_show(Sweep::new(Sweep::CELEBRATION_CYCLES, &self.timing), AfterShow::Idle);
    }

    async fn on_elapsed(&mut self, generation: Generation, step: Step) {
        if generation != self.session.generation() {
            debug!(
                stale = generation.0,
                current = self.session.generation().0,
                ?step,
                "engine: dropping timer from a superseded run"
            );
            return;
        }
        self.pending = None;
        match step {
            Step::Present => self.present(),
            Step::NextFlash => self.next_flash(),
            Step::FlashEnd => self.flash_end(),
            Step::Validate => self.validate().await,
        }
    }

    fn present(&mut self) {
        let Some(playback) = self.session.present_sequence(&mut self.rng, &self.timing) else {
            return;
        };
        info!(round = self.session.round(), "engine: presenting sequence");
        self.emit_phase();
        self.show = Some(Show {
            flashes: Box::new(playback),
            source: FlashSource::Sequence,
            lit: None,
            then: AfterShow::AwaitInput,
        });
        self.schedule(self.timing.lead_in, Step::NextFlash);
    }

    fn next_flash(&mut self) {
        let (flash, source) = match self.show.as_mut() {
            Some(show) => {
                let flash = show.flashes.next();
                show.lit = flash;
                (flash, show.source)
            }
            None => return,
        };
        match flash {
            Some(flash) => {
                self.emit(GameEvent::FlashOn {
                    color: flash.color,
                    source,
                });
                self.schedule(flash.on, Step::FlashEnd);
            }
            None => {
                if let Some(show) = self.show.take() {
                    self.after_show(show.then);
                }
            }
        }
    }

    fn flash_end(&mut self) {
        let Some(flash) = self.show.as_ref().and_then(|show| show.lit) else {
            return;
        };
        self.emit(GameEvent::FlashOff { color: flash.color });
        self.schedule(flash.off, Step::NextFlash);
    }

    fn after_show(&mut self, then: AfterShow) {
        let generation = self.session.generation();
        match then {
            AfterShow::AwaitInput => {
                if self.session.finish_presentation(generation) {
                    self.emit_phase();
                }
            }
            AfterShow::NextRound => self.schedule(self.timing.round_pause, Step::Present),
            AfterShow::Idle => {
                if self.session.reset_to_idle(generation) {
                    self.emit_phase();
                }
            }
        }
    }

    async fn validate(&mut self) {
        if let Some(color) = self.pressed.take() {
            self.emit(GameEvent::FlashOff { color });
        }
        let Some(verdict) = self.session.validate() else {
            return;
        };
        match verdict {
            Verdict::Continue { entered, total } => {
                self.emit(GameEvent::Progress { entered, total });
                self.emit_phase();
            }
            Verdict::RoundComplete { round, new_best } => {
                info!(round, new_best, "engine: round complete");
                let total = self.session.sequence().len();
                self.emit(GameEvent::Progress {
                    entered: total,
                    total,
                });
                if new_best {
                    self.record_best(round).await;
                }
                self.emit(GameEvent::Cue(Cue::Victory));
                self.emit_phase();
                self.begin_show(
                    Sweep::new(Sweep::CELEBRATION_CYCLES, &self.timing),
                    AfterShow::NextRound,
                );
            }
            Verdict::Mismatch {
                round,
                expected,
                got,
                new_best,
            } => {
                info!(round, %expected, %got, "engine: wrong color; game over");
                if new_best {
                    self.record_best(round).await;
                }
                self.emit(GameEvent::Cue(Cue::Error));
                self.emit_phase();
            }
        }
    }

    /// Persisted before the phase change is published, so a subscriber that
    /// sees the phase also sees the record.
    async fn record_best(&mut self, round: u32) {
        self.emit(GameEvent::BestRoundChanged {
            best_round: self.session.best_round(),
        });
        let saved = self
            .store
            .try_save_as(round, self.player_name.as_deref())
            .await;
        debug!(round, saved, "engine: offered best round to the score store");
    }

    fn begin_show<I>(&mut self, flashes: I, then: AfterShow)
    where
        I: Iterator<Item = Flash> + Send + 'static,
    {
        self.show = Some(Show {
            flashes: Box::new(flashes),
            source: FlashSource::Sweep,
            lit: None,
            then,
        });
        self.schedule(Duration::ZERO, Step::NextFlash);
    }

    fn lit_color(&self) -> Option<Color> {
        self.pressed
            .or_else(|| self.show.as_ref().and_then(|show| show.lit).map(|f| f.color))
    }

    fn schedule(&mut self, delay: Duration, step: Step) {
        self.cancel_pending();
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        let generation = self.session.generation();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::Elapsed { generation, step });
        }));
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    fn emit_phase(&self) {
        let phase: Phase = self.session.phase();
        self.emit(GameEvent::PhaseChanged {
            phase,
            round: self.session.round(),
        });
    }

    /// Refreshes the snapshot before publishing so subscribers never see an
    /// event ahead of the state it describes.
    fn emit(&self, event: GameEvent) {
        self.snapshot.send_replace(self.session.snapshot());
        let _ = self.events.send(event);
    }
}
