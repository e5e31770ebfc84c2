use std::io::Write;

use game_core::CuePlayer;
use shared::events::Cue;

/// Writes each cue as a note name; errors ring the terminal bell.
pub struct TerminalCuePlayer;

impl TerminalCuePlayer {
    pub fn cue_text(cue: Cue) -> String {
        match cue {
            Cue::Color(color) => format!("    ~ {}", color.tone()),
            Cue::Error => "    \u{7}~ bzzt".to_string(),
            Cue::Victory => "    ~ ta-da".to_string(),
        }
    }
}

impl CuePlayer for TerminalCuePlayer {
    fn play(&self, cue: Cue) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", Self::cue_text(cue));
        let _ = stdout.flush();
    }
}
