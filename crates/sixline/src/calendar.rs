//! Sexagenary (stem-branch) cycle for year, day and hour pillars.

use chrono::NaiveDate;

const STEMS: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
const BRANCHES: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];

/// 1900-01-01 is a 甲戌 day, index 10 in the sixty cycle.
const EPOCH_DAY_INDEX: i64 = 10;

/// A position in the sixty-term stem-branch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pillar {
    index: u8,
}

impl Pillar {
    fn from_cycle(value: i64) -> Self {
        Self {
            index: value.rem_euclid(60) as u8,
        }
    }

    fn from_parts(stem: usize, branch: usize) -> Self {
        // The unique cycle index n with n % 10 == stem and n % 12 == branch.
        let index = (0..60u8)
            .find(|n| usize::from(*n) % 10 == stem && usize::from(*n) % 12 == branch)
            .unwrap_or(0);
        Self { index }
    }

    pub fn index(self) -> u8 {
        self.index
    }

    pub fn stem_index(self) -> usize {
        usize::from(self.index) % 10
    }

    pub fn branch_index(self) -> usize {
        usize::from(self.index) % 12
    }

    pub fn stem(self) -> &'static str {
        STEMS[self.stem_index()]
    }

    pub fn branch(self) -> &'static str {
        BRANCHES[self.branch_index()]
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.stem(), self.branch())
    }
}

/// Year pillar by Gregorian year (no solar-term boundary adjustment).
pub fn year_pillar(year: i32) -> Pillar {
    Pillar::from_cycle(i64::from(year) - 4)
}

/// Day pillar counted from the 1900-01-01 epoch.
pub fn day_pillar(date: NaiveDate) -> Pillar {
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    let days = date.signed_duration_since(epoch).num_days();
    Pillar::from_cycle(EPOCH_DAY_INDEX + days)
}

/// Hour pillar: two-hour branches starting with 子 at 23:00, stem derived from the day stem.
///
/// 23:00 is the late 子 hour: its stem follows the next day's stem, while the
/// day pillar itself is left unchanged.
pub fn hour_pillar(day: Pillar, hour: u32) -> Pillar {
    let stem_day = if hour == 23 {
        Pillar::from_cycle(i64::from(day.index()) + 1)
    } else {
        day
    };
    let branch = ((hour as usize + 1) / 2) % 12;
    let stem = ((stem_day.stem_index() % 5) * 2 + branch) % 10;
    Pillar::from_parts(stem, branch)
}

/// The two branches left over by the day's ten-day week (旬空).
pub fn void_branches(day: Pillar) -> [&'static str; 2] {
    let week_start = Pillar::from_cycle(i64::from(day.index()) - day.stem_index() as i64);
    let first = week_start.branch_index();
    [BRANCHES[(first + 10) % 12], BRANCHES[(first + 11) % 12]]
}
