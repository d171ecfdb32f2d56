//! ワークユニット単位の一致数集計

use std::collections::HashMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

use crate::error::{AggregationError, UnitKey};
use crate::judgment::{ItemId, Judgment};
use crate::label::Label;

/// 集計値。加算は可換・結合的なので、ユニットごとの結果を任意の順に足してよい。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgreementCounts {
    /// 比較可能かつラベルが完全一致したペア数
    pub identical: u64,
    /// 参加システムが一致したペア数
    pub comparable: u64,
    /// `=` ラベルの数
    pub ties: u64,
    /// ラベル総数
    pub total: u64,
}

impl Add for AgreementCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            identical: self.identical + rhs.identical,
            comparable: self.comparable + rhs.comparable,
            ties: self.ties + rhs.ties,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for AgreementCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for AgreementCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// 1 ユニット分の判定を集計する
///
/// アイテムごとにラベルをまとめ、C(k,2) 通りのラベル対について
/// comparable / identical を数える。タイ数と総数はラベル単位。
pub fn aggregate(unit: &UnitKey, judgments: &[Judgment]) -> Result<AgreementCounts, AggregationError> {
    if judgments.is_empty() {
        return Err(AggregationError::EmptyUnit { unit: unit.clone() });
    }

    let mut by_item: HashMap<&ItemId, Vec<&Label>> = HashMap::new();
    for judgment in judgments {
        if judgment.item.segment != unit.segment {
            return Err(AggregationError::MixedSegments {
                unit: unit.clone(),
                found: judgment.item.segment,
            });
        }
        by_item.entry(&judgment.item).or_default().push(&judgment.label);
    }

    let mut counts = AgreementCounts::default();
    for labels in by_item.values() {
        counts.total += labels.len() as u64;
        counts.ties += labels.iter().filter(|label| label.is_tie()).count() as u64;

        for (i, first) in labels.iter().enumerate() {
            for second in &labels[i + 1..] {
                if first.is_comparable_with(second) {
                    counts.comparable += 1;
                    if first == second {
                        counts.identical += 1;
                    }
                }
            }
        }
    }
    Ok(counts)
}
