//! Keyword variant generation
//!
//! Expands a base keyword into groups of derived autosuggest queries by
//! appending letters, digits, question infixes or common phrase suffixes.

mod generator;

pub use generator::{VariantGenerator, VariantGroup};

use crate::types::VariantType;

/// Letters used by the alphabetic and question forms
pub const LETTERS: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Digits used by the numeric form
pub const DIGITS: &[char] = &['1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Phrase suffixes used by the common-suffix form
pub const COMMON_SUFFIXES: &[&str] = &[
    "是什么", "怎么样", "多少钱", "哪个好", "排行榜", "推荐",
    "价格", "品牌", "教程", "官网", "图片", "视频",
];

/// Expansion rule of one variant type
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// `{base}{infix}{letter}` for every letter
    Letters { infix: &'static str },
    /// `{base}{digit}` for every digit
    Digits,
    /// `{base}{phrase}` for every common suffix
    Phrases,
}

impl Pattern {
    pub fn for_type(variant_type: VariantType) -> Self {
        match variant_type {
            VariantType::Alpha => Pattern::Letters { infix: "" },
            VariantType::AlphaSpace => Pattern::Letters { infix: " " },
            VariantType::QuestionHow => Pattern::Letters { infix: "怎么" },
            VariantType::QuestionWhat => Pattern::Letters { infix: "什么" },
            VariantType::QuestionCan => Pattern::Letters { infix: "能" },
            VariantType::QuestionWhich => Pattern::Letters { infix: "哪" },
            VariantType::Numeric => Pattern::Digits,
            VariantType::CommonSuffix => Pattern::Phrases,
        }
    }

    /// Number of queries this pattern produces for any base keyword
    pub fn size(&self) -> usize {
        match self {
            Pattern::Letters { .. } => LETTERS.len(),
            Pattern::Digits => DIGITS.len(),
            Pattern::Phrases => COMMON_SUFFIXES.len(),
        }
    }

    pub fn expand(&self, base: &str) -> Vec<String> {
        match self {
            Pattern::Letters { infix } => LETTERS
                .iter()
                .map(|letter| format!("{}{}{}", base, infix, letter))
                .collect(),
            Pattern::Digits => DIGITS
                .iter()
                .map(|digit| format!("{}{}", base, digit))
                .collect(),
            Pattern::Phrases => COMMON_SUFFIXES
                .iter()
                .map(|phrase| format!("{}{}", base, phrase))
                .collect(),
        }
    }
}
