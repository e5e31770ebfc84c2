use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("color index {0} is outside 0..=3")]
pub struct InvalidColor(pub u8);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised input '{0}'; expected 0-3 or a color name")]
pub struct InvalidInput(pub String);
