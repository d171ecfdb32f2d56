//! ランキング行から一対比較の判定（Judgment）を生成する

use std::fmt;

use serde::Serialize;

use crate::label::{Label, Relation, SystemSet};
use crate::language::LanguagePair;

/// 「順位なし（スキップ）」を表す入力値
pub const SKIPPED_RANK_VALUE: i64 = -1;

/// セグメントID（結果ファイルの `srcIndex`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 比較対象（セグメント + スロット順のシステム対）
///
/// 表示形式は `segment.system_a.system_b`。システム名に `.` が含まれても
/// 比較は構造で行うので衝突しない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId {
    pub segment: SegmentId,
    pub first: SystemSet,
    pub second: SystemSet,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.segment, self.first, self.second)
    }
}

/// 1 人の判定者による 1 アイテムへの三値判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    pub coder: String,
    pub item: ItemId,
    pub label: Label,
}

impl Judgment {
    /// coder だけを差し替えた複製（intra モードの再ラベル用）
    pub fn with_coder(&self, coder: String) -> Self {
        Self {
            coder,
            item: self.item.clone(),
            label: self.label.clone(),
        }
    }
}

/// 1 スロット分の順位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Ranked(i64),
    Skipped,
}

impl Rank {
    pub fn from_value(value: i64) -> Self {
        if value == SKIPPED_RANK_VALUE {
            Rank::Skipped
        } else {
            Rank::Ranked(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub system: SystemSet,
    pub rank: Rank,
}

/// 結果ファイル 1 行分（判定者 1 人 × セグメント 1 つのランキング）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingRow {
    pub language_pair: LanguagePair,
    pub segment: SegmentId,
    pub judge: String,
    pub entries: Vec<RankEntry>,
}

/// ランキング行をスロット対ごとの判定に展開する
///
/// スロットの組み合わせはインデックスで列挙するため、同じシステムIDが
/// 2 スロットにあっても 1 対として扱う。どちらかがスキップなら対を捨てる。
pub fn encode_row(row: &RankingRow) -> Vec<Judgment> {
    let n = row.entries.len();
    if n < 2 {
        return Vec::new();
    }
    let mut judgments = Vec::with_capacity(n * (n - 1) / 2);
    for a in 0..n {
        for b in (a + 1)..n {
            let (ea, eb) = (&row.entries[a], &row.entries[b]);
            let (Rank::Ranked(ra), Rank::Ranked(rb)) = (ea.rank, eb.rank) else {
                continue;
            };
            judgments.push(Judgment {
                coder: row.judge.clone(),
                item: ItemId {
                    segment: row.segment,
                    first: ea.system.clone(),
                    second: eb.system.clone(),
                },
                label: Label::new(ea.system.clone(), Relation::from_ranks(ra, rb), eb.system.clone()),
            });
        }
    }
    judgments
}
