//! 言語対 × セグメントごとの判定リスト

use std::collections::BTreeMap;

use crate::judgment::{Judgment, RankingRow, SegmentId, encode_row};
use crate::language::LanguagePair;

pub type SegmentJudgments = BTreeMap<SegmentId, Vec<Judgment>>;

/// 1 回の実行で読み込んだ全判定
#[derive(Debug, Default)]
pub struct JudgmentCorpus {
    pairs: BTreeMap<LanguagePair, SegmentJudgments>,
    rows: usize,
}

impl JudgmentCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行を一対比較に展開して追加する。生成した判定数を返す。
    pub fn push_row(&mut self, row: &RankingRow) -> usize {
        self.rows += 1;
        let judgments = encode_row(row);
        let produced = judgments.len();
        if produced > 0 {
            self.pairs
                .entry(row.language_pair.clone())
                .or_default()
                .entry(row.segment)
                .or_default()
                .extend(judgments);
        }
        produced
    }

    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a RankingRow>,
    {
        let mut corpus = Self::new();
        for row in rows {
            corpus.push_row(row);
        }
        corpus
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn judgments(&self) -> usize {
        self.pairs.values().flat_map(BTreeMap::values).map(Vec::len).sum()
    }

    /// 言語対を出力順（既定順が先）で返す
    pub fn language_pairs(&self) -> impl Iterator<Item = &LanguagePair> {
        self.pairs.keys()
    }

    pub fn segments(&self, pair: &LanguagePair) -> Option<&SegmentJudgments> {
        self.pairs.get(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judgment::{Rank, RankEntry};
    use crate::label::SystemSet;

    fn row(src: &str, segment: u64, judge: &str, ranks: &[(&str, i64)]) -> RankingRow {
        RankingRow {
            language_pair: LanguagePair::from_codes(src, "eng"),
            segment: SegmentId(segment),
            judge: judge.to_owned(),
            entries: ranks
                .iter()
                .map(|(s, r)| RankEntry {
                    system: SystemSet::parse(s).unwrap(),
                    rank: Rank::from_value(*r),
                })
                .collect(),
        }
    }

    #[test]
    fn test_groups_by_pair_and_segment() {
        let rows = [
            row("deu", 2, "A", &[("s1", 1), ("s2", 2)]),
            row("deu", 1, "B", &[("s1", 1), ("s2", 2), ("s3", 3)]),
            row("ces", 1, "A", &[("s1", 1), ("s2", -1)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);
        assert_eq!(corpus.rows(), 3);
        assert_eq!(corpus.judgments(), 4);

        let pairs: Vec<String> = corpus.language_pairs().map(ToString::to_string).collect();
        assert_eq!(pairs, ["German-English"]);

        let segments = corpus.segments(&LanguagePair::from_codes("deu", "eng")).unwrap();
        let ids: Vec<u64> = segments.keys().map(|s| s.0).collect();
        assert_eq!(ids, [1, 2]);
        assert_eq!(segments[&SegmentId(1)].len(), 3);
    }
}
