//! Sixline: six-line (liu yao) divination charting from coin tosses, hexagrams and time pillars.

pub mod calendar;
pub mod chart;
pub mod coins;
pub mod hexagram;
pub mod types;

pub use calendar::{day_pillar, hour_pillar, void_branches, year_pillar, Pillar};
pub use chart::{compute, moment_from_parts};
pub use coins::{toss_coins, toss_coins_with, LINE_COUNT};
pub use hexagram::{hexagram_for, Trigram};
pub use types::*;
