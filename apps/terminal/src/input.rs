use std::str::FromStr;

use shared::{domain::Color, error::InvalidInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    Restart,
    Quit,
    Press(Color),
}

impl FromStr for Input {
    type Err = InvalidInput;

    /// Commands take precedence over color shorthands, so `r` restarts and
    /// red is `0` or `red`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "s" | "start" => Ok(Input::Start),
            "r" | "restart" => Ok(Input::Restart),
            "q" | "quit" | "exit" => Ok(Input::Quit),
            _ => line.parse().map(Input::Press),
        }
    }
}
