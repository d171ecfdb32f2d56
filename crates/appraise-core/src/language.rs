//! 言語コード → 表示名の対応と、言語対の出力順

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// 言語コードの対応表（未知のコードはそのまま通す）
const LANGUAGE_CODE_TO_NAME: [(&str, &str); 9] = [
    ("ces", "Czech"),
    ("deu", "German"),
    ("fra", "French"),
    ("fre", "French"),
    ("esn", "Spanish"),
    ("fin", "Finnish"),
    ("rus", "Russian"),
    ("hin", "Hindi"),
    ("eng", "English"),
];

/// 過去の WMT と揃えた出力順
pub const CANONICAL_ORDER: [(&str, &str); 12] = [
    ("Czech", "English"),
    ("English", "Czech"),
    ("German", "English"),
    ("English", "German"),
    ("Spanish", "English"),
    ("English", "Spanish"),
    ("French", "English"),
    ("English", "French"),
    ("Russian", "English"),
    ("English", "Russian"),
    ("Finnish", "English"),
    ("English", "Finnish"),
];

pub fn language_name(code: &str) -> &str {
    LANGUAGE_CODE_TO_NAME
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code, |&(_, name)| name)
}

/// 原言語名・目的言語名の組
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn from_codes(source: &str, target: &str) -> Self {
        Self::new(language_name(source), language_name(target))
    }

    /// [`CANONICAL_ORDER`] 中の位置。含まれない場合は `None`。
    pub fn canonical_index(&self) -> Option<usize> {
        CANONICAL_ORDER
            .iter()
            .position(|(s, t)| *s == self.source && *t == self.target)
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// 出力順: 既定順の言語対が先、それ以外は名前の辞書順で後ろに続く
impl Ord for LanguagePair {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.canonical_index(), other.canonical_index()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => (&self.source, &self.target).cmp(&(&other.source, &other.target)),
        }
    }
}

impl PartialOrd for LanguagePair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
