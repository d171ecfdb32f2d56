//! ワークユニットの並列集計と kappa の算出
//!
//! 言語対ごとにユニットを組み立て、固定サイズの rayon スレッドプールで
//! [`aggregate`] を並列実行する。`collect` が全ユニットの完了を待つので、
//! 集計値の合算は必ず全ユニットが揃ってから行われる。

use std::collections::HashMap;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::aggregate::{AgreementCounts, aggregate};
use crate::corpus::{JudgmentCorpus, SegmentJudgments};
use crate::error::{AggregationError, EngineError, UnitKey};
use crate::judgment::{ItemId, Judgment};
use crate::language::LanguagePair;

/// 一致度の種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// 異なる判定者間
    #[default]
    Inter,
    /// 同一判定者の繰り返し判定間
    Intra,
}

impl Mode {
    /// CLI フラグから決定する。両方指定時は inter を優先、未指定時も inter。
    pub fn from_flags(inter: bool, intra: bool) -> Self {
        match (inter, intra) {
            (true, true) => {
                warn!("Both --inter and --intra given; computing inter-annotator agreement.");
                Mode::Inter
            }
            (false, true) => Mode::Intra,
            (true, false) => Mode::Inter,
            (false, false) => {
                info!("Defaulting to --inter mode.");
                Mode::Inter
            }
        }
    }
}

/// 失敗したユニットの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 1 ユニットでも失敗したら言語対のスコアを無効にする
    #[default]
    VoidPair,
    /// 失敗ユニットを 0 として扱い、件数を記録する
    ZeroContribution,
}

/// 集計設定
#[derive(Debug, Clone, Default)]
pub struct AgreementConfig {
    pub mode: Mode,
    /// ワーカースレッド数（0 = 自動）
    pub processes: usize,
    pub failure_policy: FailurePolicy,
    /// 既定順に含まれない言語対も出力するか
    pub include_unlisted_pairs: bool,
}

/// Aggregator 1 回分の入力
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub key: UnitKey,
    pub judgments: Vec<Judgment>,
}

/// 言語対 1 つ分のスコア
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KappaScore {
    pub pa: f64,
    pub pe: f64,
    pub kappa: f64,
    #[serde(flatten)]
    pub counts: AgreementCounts,
    /// [`FailurePolicy::ZeroContribution`] で除外されたユニット数
    pub dropped_units: usize,
}

impl KappaScore {
    /// pE はタイ率 p から `p² + 2·((1-p)/2)²` で見積もる（非タイの向きは等確率）
    pub fn from_counts(counts: AgreementCounts, dropped_units: usize) -> Self {
        let pa = counts.identical as f64 / counts.comparable.max(1) as f64;
        let p_ties = counts.ties as f64 / counts.total.max(1) as f64;
        let half_no_ties = (1.0 - p_ties) / 2.0;
        let pe = p_ties * p_ties + 2.0 * half_no_ties * half_no_ties;
        let denom = if 1.0 - pe == 0.0 { 1.0 } else { 1.0 - pe };
        Self {
            pa,
            pe,
            kappa: (pa - pe) / denom,
            counts,
            dropped_units,
        }
    }
}

/// 言語対ごとの結果
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Scored(KappaScore),
    /// 比較可能なペアが無い（出力しない）
    NoComparable(AgreementCounts),
    /// 失敗ユニットがあり無効化された
    Voided(Vec<AggregationError>),
}

/// セグメントごとの判定をワークユニットに分割する
pub fn build_units(mode: Mode, segments: &SegmentJudgments) -> Vec<WorkUnit> {
    match mode {
        Mode::Inter => segments
            .iter()
            .filter(|(_, judgments)| !judgments.is_empty())
            .map(|(segment, judgments)| WorkUnit {
                key: UnitKey {
                    segment: *segment,
                    coder: None,
                },
                judgments: judgments.clone(),
            })
            .collect(),
        Mode::Intra => segments
            .iter()
            .flat_map(|(segment, judgments)| {
                intra_units(judgments).into_iter().map(move |(coder, judgments)| WorkUnit {
                    key: UnitKey {
                        segment: *segment,
                        coder: Some(coder),
                    },
                    judgments,
                })
            })
            .collect(),
    }
}

/// 同一アイテムを 2 回以上判定した coder について、繰り返し判定を
/// `{coder}-{出現番号}` という別 coder に見立てて並べ直す
fn intra_units(judgments: &[Judgment]) -> Vec<(String, Vec<Judgment>)> {
    let mut coders: Vec<&str> = Vec::new();
    let mut by_coder: HashMap<&str, Vec<&Judgment>> = HashMap::new();
    for judgment in judgments {
        let entry = by_coder.entry(judgment.coder.as_str()).or_default();
        if entry.is_empty() {
            coders.push(judgment.coder.as_str());
        }
        entry.push(judgment);
    }

    let mut units = Vec::new();
    for coder in coders {
        let mut items: Vec<&ItemId> = Vec::new();
        let mut by_item: HashMap<&ItemId, Vec<&Judgment>> = HashMap::new();
        for judgment in &by_coder[coder] {
            let entry = by_item.entry(&judgment.item).or_default();
            if entry.is_empty() {
                items.push(&judgment.item);
            }
            entry.push(*judgment);
        }
        if by_item.values().all(|repeats| repeats.len() < 2) {
            continue;
        }

        let relabeled = items
            .iter()
            .flat_map(|item| {
                by_item[item]
                    .iter()
                    .enumerate()
                    .map(|(d, judgment)| judgment.with_coder(format!("{coder}-{d}")))
            })
            .collect();
        units.push((coder.to_owned(), relabeled));
    }
    units
}

/// 固定サイズのワーカープールを持つ集計エンジン
pub struct AgreementEngine {
    pool: ThreadPool,
    config: AgreementConfig,
}

impl AgreementEngine {
    pub fn new(config: AgreementConfig) -> Result<Self, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.processes)
            .thread_name(|i| format!("agreement-{i}"))
            .build()?;
        debug!(
            "worker pool ready: {} threads, mode {:?}",
            pool.current_num_threads(),
            config.mode
        );
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &AgreementConfig {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// 全言語対を出力順に集計する
    pub fn run(&self, corpus: &JudgmentCorpus) -> Vec<(LanguagePair, PairOutcome)> {
        corpus
            .language_pairs()
            .filter(|pair| self.config.include_unlisted_pairs || pair.canonical_index().is_some())
            .filter_map(|pair| {
                let segments = corpus.segments(pair)?;
                Some((pair.clone(), self.score_segments(pair, segments)))
            })
            .collect()
    }

    pub fn score_segments(&self, pair: &LanguagePair, segments: &SegmentJudgments) -> PairOutcome {
        let units = build_units(self.config.mode, segments);
        debug!("{pair}: {} work units over {} segments", units.len(), segments.len());
        self.score_units(pair, &units)
    }

    /// ユニットを並列に集計し、すべて完了してから合算する
    pub fn score_units(&self, pair: &LanguagePair, units: &[WorkUnit]) -> PairOutcome {
        let results: Vec<Result<AgreementCounts, AggregationError>> = self.pool.install(|| {
            units.par_iter().map(|unit| aggregate(&unit.key, &unit.judgments)).collect()
        });

        let mut counts = AgreementCounts::default();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(c) => counts += c,
                Err(e) => failures.push(e),
            }
        }

        if !failures.is_empty() {
            match self.config.failure_policy {
                FailurePolicy::VoidPair => {
                    warn!(
                        "{pair}: {} of {} work units failed; score voided",
                        failures.len(),
                        units.len()
                    );
                    return PairOutcome::Voided(failures);
                }
                FailurePolicy::ZeroContribution => {
                    for failure in &failures {
                        warn!("{pair}: dropped work unit: {failure}");
                    }
                }
            }
        }

        if counts.comparable == 0 {
            return PairOutcome::NoComparable(counts);
        }
        PairOutcome::Scored(KappaScore::from_counts(counts, failures.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judgment::{Rank, RankEntry, RankingRow, SegmentId};
    use crate::label::{Label, SystemSet};

    fn row(segment: u64, judge: &str, ranks: &[(&str, i64)]) -> RankingRow {
        RankingRow {
            language_pair: LanguagePair::from_codes("deu", "eng"),
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

    fn engine(mode: Mode, failure_policy: FailurePolicy) -> AgreementEngine {
        AgreementEngine::new(AgreementConfig {
            mode,
            processes: 2,
            failure_policy,
            include_unlisted_pairs: false,
        })
        .unwrap()
    }

    fn scored(outcome: &PairOutcome) -> &KappaScore {
        match outcome {
            PairOutcome::Scored(score) => score,
            other => panic!("expected score, got {other:?}"),
        }
    }

    fn de_en() -> LanguagePair {
        LanguagePair::from_codes("deu", "eng")
    }

    #[test]
    fn test_kappa_formula() {
        let score = KappaScore::from_counts(
            AgreementCounts {
                identical: 3,
                comparable: 4,
                ties: 1,
                total: 4,
            },
            0,
        );
        // pTies = 0.25 → pE = 0.0625 + 2 * 0.140625 = 0.34375
        assert!((score.pa - 0.75).abs() < 1e-12);
        assert!((score.pe - 0.34375).abs() < 1e-12);
        assert!((score.kappa - (0.75 - 0.34375) / (1.0 - 0.34375)).abs() < 1e-12);
    }

    #[test]
    fn test_kappa_guards_degenerate_counts() {
        let no_ties = KappaScore::from_counts(AgreementCounts::default(), 0);
        assert_eq!(no_ties.pa, 0.0);
        assert_eq!(no_ties.pe, 0.5);

        let all_ties = KappaScore::from_counts(
            AgreementCounts {
                identical: 1,
                comparable: 1,
                ties: 2,
                total: 2,
            },
            0,
        );
        assert_eq!(all_ties.pe, 1.0);
        assert_eq!(all_ties.kappa, 0.0);
    }

    #[test]
    fn test_perfect_agreement_gives_kappa_one() {
        let rows = [
            row(1, "A", &[("s1", 1), ("s2", 2), ("s3", 2)]),
            row(1, "B", &[("s1", 1), ("s2", 2), ("s3", 2)]),
            row(2, "A", &[("s1", 3), ("s2", 1)]),
            row(2, "C", &[("s1", 3), ("s2", 1)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);
        let results = engine(Mode::Inter, FailurePolicy::VoidPair).run(&corpus);
        assert_eq!(results.len(), 1);
        let score = scored(&results[0].1);
        assert_eq!(score.counts.comparable, 4);
        assert_eq!(score.counts.identical, 4);
        assert!((score.kappa - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_judges_disagree() {
        let rows = [
            row(1, "A", &[("sys1", 1), ("sys2", 2)]),
            row(1, "B", &[("sys1", 2), ("sys2", 1)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);
        let results = engine(Mode::Inter, FailurePolicy::VoidPair).run(&corpus);
        let score = scored(&results[0].1);
        assert_eq!(score.counts.comparable, 1);
        assert_eq!(score.counts.identical, 0);
        assert_eq!(score.counts.total, 2);
        assert_eq!(score.pa, 0.0);
        assert_eq!(score.pe, 0.5);
        assert_eq!(score.kappa, -1.0);
    }

    #[test]
    fn test_reduction_is_order_independent() {
        let rows: Vec<RankingRow> = (1..=6)
            .flat_map(|seg| {
                [
                    row(seg, "A", &[("s1", 1), ("s2", (seg % 3) as i64), ("s3", 2)]),
                    row(seg, "B", &[("s1", 2), ("s2", 2), ("s3", (seg % 2) as i64 + 1)]),
                    row(seg, "C", &[("s1", 1), ("s2", 3), ("s3", 2)]),
                ]
            })
            .collect();
        let corpus = JudgmentCorpus::from_rows(&rows);
        let segments = corpus.segments(&de_en()).unwrap();
        let mut units = build_units(Mode::Inter, segments);
        let e = engine(Mode::Inter, FailurePolicy::VoidPair);

        let forward = e.score_units(&de_en(), &units);
        units.reverse();
        let backward = e.score_units(&de_en(), &units);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_only_canonical_pairs_by_default() {
        let mut jpn = row(1, "A", &[("s1", 1), ("s2", 2)]);
        jpn.language_pair = LanguagePair::from_codes("eng", "jpn");
        let mut jpn_b = jpn.clone();
        jpn_b.judge = "B".to_owned();
        let rows = [
            jpn,
            jpn_b,
            row(1, "A", &[("s1", 1), ("s2", 2)]),
            row(1, "B", &[("s1", 1), ("s2", 2)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);

        let listed = engine(Mode::Inter, FailurePolicy::VoidPair).run(&corpus);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, de_en());

        let all = AgreementEngine::new(AgreementConfig {
            include_unlisted_pairs: true,
            ..AgreementConfig::default()
        })
        .unwrap()
        .run(&corpus);
        let names: Vec<String> = all.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(names, ["German-English", "English-jpn"]);
    }

    #[test]
    fn test_no_comparable_pairs() {
        let rows = [row(1, "A", &[("s1", 1), ("s2", 2)]), row(2, "B", &[("s1", 1), ("s2", 2)])];
        let corpus = JudgmentCorpus::from_rows(&rows);
        let results = engine(Mode::Inter, FailurePolicy::VoidPair).run(&corpus);
        assert!(matches!(results[0].1, PairOutcome::NoComparable(c) if c.total == 2));
    }

    #[test]
    fn test_intra_units_relabel_repeats() {
        let rows = [
            row(1, "A", &[("s1", 1), ("s2", 2)]),
            row(1, "A", &[("s1", 2), ("s2", 1)]),
            row(1, "A", &[("s1", 1), ("s3", 2)]),
            row(1, "B", &[("s1", 1), ("s2", 2)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);
        let units = build_units(Mode::Intra, corpus.segments(&de_en()).unwrap());

        // B は繰り返しが無いので対象外
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].key.coder.as_deref(), Some("A"));
        let coders: Vec<&str> = units[0].judgments.iter().map(|j| j.coder.as_str()).collect();
        assert_eq!(coders, ["A-0", "A-1", "A-0"]);

        let outcome = engine(Mode::Intra, FailurePolicy::VoidPair)
            .score_segments(&de_en(), corpus.segments(&de_en()).unwrap());
        let score = scored(&outcome);
        assert_eq!(score.counts.comparable, 1);
        assert_eq!(score.counts.identical, 0);
        assert_eq!(score.counts.total, 3);
    }

    #[test]
    fn test_intra_consistent_judge() {
        let rows = [
            row(1, "A", &[("s1", 1), ("s2", 1)]),
            row(1, "A", &[("s1", 1), ("s2", 1)]),
            row(3, "A", &[("s1", 2), ("s2", 1)]),
            row(3, "A", &[("s1", 2), ("s2", 1)]),
        ];
        let corpus = JudgmentCorpus::from_rows(&rows);
        let outcome = engine(Mode::Intra, FailurePolicy::VoidPair)
            .score_segments(&de_en(), corpus.segments(&de_en()).unwrap());
        let score = scored(&outcome);
        assert_eq!(score.counts.identical, 2);
        assert_eq!(score.counts.comparable, 2);
        assert_eq!(score.counts.ties, 2);
        assert!((score.kappa - 1.0).abs() < 1e-12);
    }

    fn units_with_failure() -> Vec<WorkUnit> {
        let corpus = JudgmentCorpus::from_rows(&[
            row(1, "A", &[("s1", 1), ("s2", 2)]),
            row(1, "B", &[("s1", 1), ("s2", 2)]),
        ]);
        let mut units = build_units(Mode::Inter, corpus.segments(&de_en()).unwrap());
        units.push(WorkUnit {
            key: UnitKey {
                segment: SegmentId(9),
                coder: None,
            },
            judgments: Vec::new(),
        });
        units.push(WorkUnit {
            key: UnitKey {
                segment: SegmentId(8),
                coder: None,
            },
            judgments: vec![Judgment {
                coder: "A".to_owned(),
                item: ItemId {
                    segment: SegmentId(7),
                    first: SystemSet::parse("s1").unwrap(),
                    second: SystemSet::parse("s2").unwrap(),
                },
                label: Label::parse("s1>s2").unwrap(),
            }],
        });
        units
    }

    #[test]
    fn test_failed_unit_voids_pair() {
        let outcome = engine(Mode::Inter, FailurePolicy::VoidPair)
            .score_units(&de_en(), &units_with_failure());
        match outcome {
            PairOutcome::Voided(failures) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].unit().segment, SegmentId(9));
                assert!(matches!(failures[1], AggregationError::MixedSegments { .. }));
            }
            other => panic!("expected voided pair, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_unit_zero_contribution() {
        let outcome = engine(Mode::Inter, FailurePolicy::ZeroContribution)
            .score_units(&de_en(), &units_with_failure());
        let score = scored(&outcome);
        assert_eq!(score.dropped_units, 2);
        assert_eq!(score.counts.comparable, 1);
        assert_eq!(score.counts.identical, 1);
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(Mode::from_flags(false, false), Mode::Inter);
        assert_eq!(Mode::from_flags(true, true), Mode::Inter);
        assert_eq!(Mode::from_flags(false, true), Mode::Intra);
    }
}
