//! Core data types for a divination chart.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Polarity of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Yin,
    Yang,
}

impl Polarity {
    /// The opposite polarity, used when a moving line transforms.
    pub fn flipped(self) -> Self {
        match self {
            Polarity::Yin => Polarity::Yang,
            Polarity::Yang => Polarity::Yin,
        }
    }

    pub fn is_yang(self) -> bool {
        self == Polarity::Yang
    }
}

/// One line of the cast, bottom line first.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LineReading {
    /// Position from 1 (bottom) to 6 (top).
    pub position: u8,
    /// Number of coin backs thrown for this line (0-3).
    pub backs: u8,
    pub polarity: Polarity,
    /// Old yin (0 backs) and old yang (3 backs) lines move.
    pub moving: bool,
    /// Text rendering of the line, e.g. `━━━ ○`.
    pub symbol: String,
    /// Six-spirit (六神) attached to this line by the day stem.
    pub spirit: String,
}

/// A trigram as shown in the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrigramInfo {
    pub name: String,
    pub nature: String,
}

/// A hexagram in King Wen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HexagramInfo {
    /// King Wen sequence number (1-64).
    pub number: u8,
    pub name: String,
    pub upper: TrigramInfo,
    pub lower: TrigramInfo,
    /// Lines as `1` (yang) / `0` (yin), bottom first.
    pub code: String,
}

/// Sexagenary pillars of the divination time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimePillars {
    pub year: String,
    pub day: String,
    pub hour: String,
}

/// Full output of a divination: the chart returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DivinationChart {
    /// Gregorian time of the divination, `YYYY-MM-DD HH:00`.
    pub solar_time: String,
    pub pillars: TimePillars,
    /// Void branches (旬空) of the day pillar.
    pub void_branches: Vec<String>,
    /// Coin backs per line, bottom first.
    pub yaogua: Vec<u8>,
    pub lines: Vec<LineReading>,
    /// Positions (1-6) of moving lines.
    pub moving_lines: Vec<u8>,
    pub original: HexagramInfo,
    /// Present only when at least one line moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<HexagramInfo>,
}

/// Errors that can occur while computing a chart.
#[derive(thiserror::Error, Debug)]
pub enum DivinationError {
    #[error("Invalid date: {year:04}-{month:02}-{day:02} {hour:02}:00 does not exist")]
    InvalidDate {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
    },

    #[error("Expected {expected} coin results, got {actual}")]
    WrongLineCount { expected: usize, actual: usize },

    #[error("Coin result {value} at line {position} is outside 0-3")]
    InvalidBacks { position: usize, value: u8 },
}

/// Convenience result type.
pub type DivinationResult<T> = Result<T, DivinationError>;
