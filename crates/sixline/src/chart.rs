//! Chart assembly: turns a moment and six coin results into a full divination chart.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::calendar::{day_pillar, hour_pillar, void_branches, year_pillar};
use crate::coins::{line_from_backs, LINE_COUNT};
use crate::hexagram::hexagram_for;
use crate::types::{
    DivinationChart, DivinationError, DivinationResult, LineReading, Polarity, TimePillars,
};

const SPIRITS: [&str; 6] = ["青龙", "朱雀", "勾陈", "螣蛇", "白虎", "玄武"];

/// Build the divination moment from Gregorian parts, rejecting dates that do not exist.
pub fn moment_from_parts(year: i32, month: u32, day: u32, hour: u32) -> DivinationResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .ok_or(DivinationError::InvalidDate {
            year,
            month,
            day,
            hour,
        })
}

/// Compute the chart for `moment` from six coin results, bottom line first.
pub fn compute(moment: NaiveDateTime, yaogua: &[u8]) -> DivinationResult<DivinationChart> {
    if yaogua.len() != LINE_COUNT {
        return Err(DivinationError::WrongLineCount {
            expected: LINE_COUNT,
            actual: yaogua.len(),
        });
    }

    let day = day_pillar(moment.date());
    let hour = hour_pillar(day, moment.hour());
    let spirit_start = spirit_start(day.stem_index());

    let mut original = [Polarity::Yin; LINE_COUNT];
    let mut changed = [Polarity::Yin; LINE_COUNT];
    let mut lines = Vec::with_capacity(LINE_COUNT);
    let mut moving_lines = Vec::new();

    for (i, backs) in yaogua.iter().copied().enumerate() {
        let position = i + 1;
        let (polarity, moving) = line_from_backs(position, backs)?;
        original[i] = polarity;
        changed[i] = if moving { polarity.flipped() } else { polarity };
        if moving {
            moving_lines.push(position as u8);
        }
        lines.push(LineReading {
            position: position as u8,
            backs,
            polarity,
            moving,
            symbol: line_symbol(polarity, moving),
            spirit: SPIRITS[(spirit_start + i) % SPIRITS.len()].to_string(),
        });
    }

    let changed = if moving_lines.is_empty() {
        None
    } else {
        Some(hexagram_for(&changed))
    };

    let chart = DivinationChart {
        solar_time: format!(
            "{:04}-{:02}-{:02} {:02}:00",
            moment.year(),
            moment.month(),
            moment.day(),
            moment.hour()
        ),
        pillars: TimePillars {
            year: year_pillar(moment.year()).to_string(),
            day: day.to_string(),
            hour: hour.to_string(),
        },
        void_branches: void_branches(day).iter().map(|b| b.to_string()).collect(),
        yaogua: yaogua.to_vec(),
        lines,
        moving_lines,
        original: hexagram_for(&original),
        changed,
    };

    tracing::debug!(
        original = chart.original.number,
        changed = ?chart.changed.as_ref().map(|h| h.number),
        "Chart computed"
    );

    Ok(chart)
}

/// First spirit for the bottom line: 甲乙 青龙, 丙丁 朱雀, 戊 勾陈, 己 螣蛇, 庚辛 白虎, 壬癸 玄武.
fn spirit_start(day_stem: usize) -> usize {
    match day_stem {
        0 | 1 => 0,
        2 | 3 => 1,
        4 => 2,
        5 => 3,
        6 | 7 => 4,
        _ => 5,
    }
}

fn line_symbol(polarity: Polarity, moving: bool) -> String {
    let body = match polarity {
        Polarity::Yang => "━━━",
        Polarity::Yin => "━ ━",
    };
    match (polarity, moving) {
        (Polarity::Yang, true) => format!("{body} ○"),
        (Polarity::Yin, true) => format!("{body} ×"),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_moment() -> NaiveDateTime {
        moment_from_parts(2024, 9, 19, 15).unwrap()
    }

    #[test]
    fn test_sample_cast() {
        let chart = compute(sample_moment(), &[0, 1, 1, 2, 1, 3]).unwrap();
        assert_eq!(chart.original.number, 57);
        assert_eq!(chart.original.name, "巽");
        let changed = chart.changed.unwrap();
        assert_eq!(changed.number, 5);
        assert_eq!(changed.name, "需");
        assert_eq!(chart.moving_lines, vec![1, 6]);
        assert_eq!(chart.pillars.day, "丙戌");
        assert_eq!(chart.pillars.hour, "丙申");
        assert_eq!(chart.void_branches, vec!["午", "未"]);
        assert_eq!(chart.solar_time, "2024-09-19 15:00");
    }

    #[test]
    fn test_spirits_follow_day_stem() {
        let chart = compute(sample_moment(), &[1, 1, 1, 1, 1, 1]).unwrap();
        let spirits: Vec<_> = chart.lines.iter().map(|l| l.spirit.as_str()).collect();
        assert_eq!(spirits, ["朱雀", "勾陈", "螣蛇", "白虎", "玄武", "青龙"]);
    }

    #[test]
    fn test_static_cast_has_no_changed_hexagram() {
        let chart = compute(sample_moment(), &[1, 2, 1, 2, 1, 2]).unwrap();
        assert!(chart.changed.is_none());
        assert!(chart.moving_lines.is_empty());
        assert_eq!(chart.original.number, 63);
    }

    #[test]
    fn test_wrong_line_count() {
        let err = compute(sample_moment(), &[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            DivinationError::WrongLineCount {
                expected: 6,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_invalid_date() {
        assert!(moment_from_parts(2023, 2, 29, 10).is_err());
        assert!(moment_from_parts(2024, 2, 29, 10).is_ok());
        assert!(moment_from_parts(2024, 4, 31, 0).is_err());
    }

    #[test]
    fn test_moving_symbols() {
        let chart = compute(sample_moment(), &[0, 3, 1, 2, 1, 2]).unwrap();
        assert!(chart.lines[0].symbol.ends_with('×'));
        assert!(chart.lines[1].symbol.ends_with('○'));
        assert_eq!(chart.lines[2].symbol, "━━━");
    }
}
