//! Simon game core: the session state machine, sequence playback and the
//! async engine that paces them.

pub mod cues;
pub mod engine;
pub mod error;
pub mod machine;
pub mod playback;
pub mod timing;

pub use cues::{spawn_cue_forwarder, CuePlayer, SilentCuePlayer};
pub use engine::{EngineConfig, GameEngine, GameHandle};
pub use error::EngineError;
pub use machine::{Ended, Generation, Session, SessionSnapshot, Verdict};
pub use playback::{Flash, Playback, Sweep};
pub use timing::{Timing, TimingOverrides};

#[cfg(test)]
#[path = "tests/machine_tests.rs"]
mod machine_tests;

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod engine_tests;
