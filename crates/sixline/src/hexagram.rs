//! Trigrams and the King Wen hexagram table.

use crate::types::{HexagramInfo, Polarity, TrigramInfo};

/// The eight trigrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigram {
    Qian,
    Zhen,
    Kan,
    Gen,
    Kun,
    Xun,
    Li,
    Dui,
}

impl Trigram {
    /// Build a trigram from three lines, bottom first.
    pub fn from_lines(lines: [Polarity; 3]) -> Self {
        match (lines[0].is_yang(), lines[1].is_yang(), lines[2].is_yang()) {
            (true, true, true) => Trigram::Qian,
            (true, true, false) => Trigram::Dui,
            (true, false, true) => Trigram::Li,
            (true, false, false) => Trigram::Zhen,
            (false, true, true) => Trigram::Xun,
            (false, true, false) => Trigram::Kan,
            (false, false, true) => Trigram::Gen,
            (false, false, false) => Trigram::Kun,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Trigram::Qian => "乾",
            Trigram::Zhen => "震",
            Trigram::Kan => "坎",
            Trigram::Gen => "艮",
            Trigram::Kun => "坤",
            Trigram::Xun => "巽",
            Trigram::Li => "离",
            Trigram::Dui => "兑",
        }
    }

    pub fn nature(self) -> &'static str {
        match self {
            Trigram::Qian => "天",
            Trigram::Zhen => "雷",
            Trigram::Kan => "水",
            Trigram::Gen => "山",
            Trigram::Kun => "地",
            Trigram::Xun => "风",
            Trigram::Li => "火",
            Trigram::Dui => "泽",
        }
    }

    fn info(self) -> TrigramInfo {
        TrigramInfo {
            name: self.name().to_string(),
            nature: self.nature().to_string(),
        }
    }
}

// Rows: upper trigram, columns: lower trigram, both in `Trigram` order.
const KING_WEN: [[u8; 8]; 8] = [
    [1, 25, 6, 33, 12, 44, 13, 10],
    [34, 51, 40, 62, 16, 32, 55, 54],
    [5, 3, 29, 39, 8, 48, 63, 60],
    [26, 27, 4, 52, 23, 18, 22, 41],
    [11, 24, 7, 15, 2, 46, 36, 19],
    [9, 42, 59, 53, 20, 57, 37, 61],
    [14, 21, 64, 56, 35, 50, 30, 38],
    [43, 17, 47, 31, 45, 28, 49, 58],
];

const NAMES: [&str; 64] = [
    "乾", "坤", "屯", "蒙", "需", "讼", "师", "比", "小畜", "履", "泰", "否", "同人", "大有",
    "谦", "豫", "随", "蛊", "临", "观", "噬嗑", "贲", "剥", "复", "无妄", "大畜", "颐", "大过",
    "坎", "离", "咸", "恒", "遯", "大壮", "晋", "明夷", "家人", "睽", "蹇", "解", "损", "益",
    "夬", "姤", "萃", "升", "困", "井", "革", "鼎", "震", "艮", "渐", "归妹", "丰", "旅", "巽",
    "兑", "涣", "节", "中孚", "小过", "既济", "未济",
];

/// Look up the hexagram formed by six lines, bottom first.
pub fn hexagram_for(lines: &[Polarity; 6]) -> HexagramInfo {
    let lower = Trigram::from_lines([lines[0], lines[1], lines[2]]);
    let upper = Trigram::from_lines([lines[3], lines[4], lines[5]]);
    let number = KING_WEN[upper.index()][lower.index()];

    HexagramInfo {
        number,
        name: NAMES[usize::from(number) - 1].to_string(),
        upper: upper.info(),
        lower: lower.info(),
        code: lines
            .iter()
            .map(|l| if l.is_yang() { '1' } else { '0' })
            .collect(),
    }
}
