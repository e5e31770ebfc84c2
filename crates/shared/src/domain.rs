use std::fmt;

use chrono::{Local, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidColor, InvalidInput};

pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Green, Color::Blue, Color::Yellow];

    pub fn index(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Green => 1,
            Color::Blue => 2,
            Color::Yellow => 3,
        }
    }

    pub fn from_index(index: u8) -> Result<Self, InvalidColor> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(InvalidColor(index))
    }

    /// Uniform draw over the four buttons.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
        }
    }

    /// Note played for the button.
    pub fn tone(self) -> &'static str {
        match self {
            Color::Red => "Mi",
            Color::Green => "Do",
            Color::Blue => "Sol",
            Color::Yellow => "Do'",
        }
    }
}

impl TryFrom<u8> for Color {
    type Error = InvalidColor;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

impl std::str::FromStr for Color {
    type Err = InvalidInput;

    /// Accepts a button index (`0`-`3`), a color name or its first letter.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        if let Ok(index) = needle.parse::<u8>() {
            return Color::from_index(index).map_err(|_| InvalidInput(value.to_string()));
        }
        Color::ALL
            .into_iter()
            .find(|color| color.name() == needle || color.name()[..1] == needle)
            .ok_or_else(|| InvalidInput(value.to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Armed,
    Presenting,
    AwaitingInput,
    Validating,
    RoundComplete,
    Over {
        round: u32,
    },
}

impl Phase {
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::AwaitingInput)
    }

    pub fn can_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::Over { .. })
    }

    pub fn is_over(self) -> bool {
        matches!(self, Phase::Over { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: u32,
    pub timestamp_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
}

impl ScoreRecord {
    pub fn new(score: u32, player_name: Option<String>) -> Self {
        Self {
            score,
            timestamp_millis: Utc::now().timestamp_millis(),
            player_name,
        }
    }

    pub fn player_or_default(&self) -> &str {
        self.player_name.as_deref().unwrap_or(DEFAULT_PLAYER_NAME)
    }

    /// `Record: 7 (18/10/2026 21:04)` in local time; the date is omitted when
    /// the timestamp is out of range.
    pub fn display_text(&self) -> String {
        match Local.timestamp_millis_opt(self.timestamp_millis).single() {
            Some(at) => format!("Record: {} ({})", self.score, at.format("%d/%m/%Y %H:%M")),
            None => format!("Record: {}", self.score),
        }
    }
}

/// Whether a score equal to the current best counts as a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    #[default]
    StrictlyGreater,
    AllowEqual,
}

impl TiePolicy {
    pub fn admits(self, candidate: u32, best: Option<u32>) -> bool {
        if candidate == 0 {
            return false;
        }
        match (self, best) {
            (_, None) => true,
            (TiePolicy::StrictlyGreater, Some(best)) => candidate > best,
            (TiePolicy::AllowEqual, Some(best)) => candidate >= best,
        }
    }
}

impl std::str::FromStr for TiePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" | "strictly_greater" => Ok(TiePolicy::StrictlyGreater),
            "allow_equal" | "equal" | "ties" => Ok(TiePolicy::AllowEqual),
            other => Err(format!("unknown tie policy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    #[test]
    fn color_index_round_trips_and_rejects_out_of_range() {
        for color in Color::ALL {
            assert_eq!(Color::from_index(color.index()), Ok(color));
        }
        assert_eq!(Color::try_from(4), Err(InvalidColor(4)));
    }

    #[test]
    fn parses_player_input() {
        assert_eq!("2".parse::<Color>(), Ok(Color::Blue));
        assert_eq!(" Yellow ".parse::<Color>(), Ok(Color::Yellow));
        assert_eq!("g".parse::<Color>(), Ok(Color::Green));
        assert!("7".parse::<Color>().is_err());
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn random_colors_are_roughly_uniform() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut buckets = [0usize; 4];
        for _ in 0..4000 {
            buckets[usize::from(Color::random(&mut rng).index())] += 1;
        }
        for count in buckets {
            assert!((850..=1150).contains(&count), "skewed bucket: {buckets:?}");
        }
    }

    #[test]
    fn strict_policy_rejects_ties() {
        assert!(TiePolicy::StrictlyGreater.admits(4, Some(3)));
        assert!(!TiePolicy::StrictlyGreater.admits(3, Some(3)));
        assert!(TiePolicy::AllowEqual.admits(3, Some(3)));
        assert!(!TiePolicy::AllowEqual.admits(2, Some(3)));
    }

    #[test]
    fn zero_is_never_a_record() {
        assert!(!TiePolicy::StrictlyGreater.admits(0, None));
        assert!(!TiePolicy::AllowEqual.admits(0, None));
        assert!(TiePolicy::StrictlyGreater.admits(1, None));
    }

    #[test]
    fn parses_tie_policy_names() {
        assert_eq!("strict".parse::<TiePolicy>(), Ok(TiePolicy::StrictlyGreater));
        assert_eq!("allow-equal".parse::<TiePolicy>(), Ok(TiePolicy::AllowEqual));
        assert!("sometimes".parse::<TiePolicy>().is_err());
    }

    #[test]
    fn over_phase_serializes_with_round() {
        let json = serde_json::to_string(&Phase::Over { round: 5 }).expect("json");
        assert_eq!(json, r#"{"phase":"over","round":5}"#);
    }

    #[test]
    fn record_display_includes_score() {
        let record = ScoreRecord {
            score: 7,
            timestamp_millis: 0,
            player_name: None,
        };
        assert!(record.display_text().starts_with("Record: 7 ("));
        assert_eq!(record.player_or_default(), DEFAULT_PLAYER_NAME);
    }
}
