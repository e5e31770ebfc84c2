use std::time::Duration;

use serde::Deserialize;

/// Pacing of every timed step in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub arm_delay: Duration,
    pub lead_in: Duration,
    pub flash_on: Duration,
    pub flash_off: Duration,
    pub flash_gap: Duration,
    pub final_pause: Duration,
    pub press_feedback: Duration,
    pub round_pause: Duration,
    pub sweep_on: Duration,
    pub sweep_rest: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            arm_delay: Duration::from_millis(1000),
            lead_in: Duration::from_millis(500),
            flash_on: Duration::from_millis(800),
            flash_off: Duration::from_millis(200),
            flash_gap: Duration::from_millis(400),
            final_pause: Duration::from_millis(500),
            press_feedback: Duration::from_millis(400),
            round_pause: Duration::from_millis(1200),
            sweep_on: Duration::from_millis(150),
            sweep_rest: Duration::from_millis(200),
        }
    }
}

/// Millisecond overrides as they appear in a `[timing]` config table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimingOverrides {
    pub arm_delay_ms: Option<u64>,
    pub lead_in_ms: Option<u64>,
    pub flash_on_ms: Option<u64>,
    pub flash_off_ms: Option<u64>,
    pub flash_gap_ms: Option<u64>,
    pub final_pause_ms: Option<u64>,
    pub press_feedback_ms: Option<u64>,
    pub round_pause_ms: Option<u64>,
    pub sweep_on_ms: Option<u64>,
    pub sweep_rest_ms: Option<u64>,
}

impl TimingOverrides {
    pub fn apply(&self, mut timing: Timing) -> Timing {
        let slots = [
            (self.arm_delay_ms, &mut timing.arm_delay),
            (self.lead_in_ms, &mut timing.lead_in),
            (self.flash_on_ms, &mut timing.flash_on),
            (self.flash_off_ms, &mut timing.flash_off),
            (self.flash_gap_ms, &mut timing.flash_gap),
            (self.final_pause_ms, &mut timing.final_pause),
            (self.press_feedback_ms, &mut timing.press_feedback),
            (self.round_pause_ms, &mut timing.round_pause),
            (self.sweep_on_ms, &mut timing.sweep_on),
            (self.sweep_rest_ms, &mut timing.sweep_rest),
        ];
        for (millis, slot) in slots {
            if let Some(millis) = millis {
                *slot = Duration::from_millis(millis);
            }
        }
        timing
    }
}
