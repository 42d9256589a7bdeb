use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Colour tokens of the Stroop palette, in the order they are unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InkColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Brown,
    Orange,
    Pink,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown colour token `{0}`")]
pub struct ParseColorError(pub String);

impl InkColor {
    pub const ALL: [InkColor; 8] = [
        InkColor::Red,
        InkColor::Blue,
        InkColor::Green,
        InkColor::Yellow,
        InkColor::Purple,
        InkColor::Brown,
        InkColor::Orange,
        InkColor::Pink,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InkColor::Red => "RED",
            InkColor::Blue => "BLUE",
            InkColor::Green => "GREEN",
            InkColor::Yellow => "YELLOW",
            InkColor::Purple => "PURPLE",
            InkColor::Brown => "BROWN",
            InkColor::Orange => "ORANGE",
            InkColor::Pink => "PINK",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            InkColor::Red => "#EF4444",
            InkColor::Blue => "#3B82F6",
            InkColor::Green => "#10B981",
            InkColor::Yellow => "#EAB308",
            InkColor::Purple => "#A855F7",
            InkColor::Brown => "#A16207",
            InkColor::Orange => "#F97316",
            InkColor::Pink => "#EC4899",
        }
    }

    pub fn rgba(&self) -> [u8; 4] {
        let hex = &self.hex()[1..];
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        [channel(0), channel(2), channel(4), 255]
    }
}

impl fmt::Display for InkColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InkColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        InkColor::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| ParseColorError(token.to_string()))
    }
}
