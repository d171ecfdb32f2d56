//! WMT 一対比較ランキングの判定者間一致度（kappa）計算エンジン
//!
//! 処理の流れ:
//!
//! 1. [`judgment::encode_row`] がランキング行をシステム対ごとの三値ラベルに展開する
//! 2. [`corpus::JudgmentCorpus`] が言語対 × セグメントで判定をまとめる
//! 3. [`reducer::AgreementEngine`] がユニットごとに [`aggregate::aggregate`] を並列実行し、
//!    合算した [`aggregate::AgreementCounts`] から pA / pE / kappa を求める

pub mod aggregate;
pub mod corpus;
pub mod error;
pub mod judgment;
pub mod label;
pub mod language;
pub mod reducer;

pub use aggregate::{AgreementCounts, aggregate};
pub use corpus::JudgmentCorpus;
pub use error::{AggregationError, EngineError, LabelError, UnitKey};
pub use judgment::{ItemId, Judgment, Rank, RankEntry, RankingRow, SegmentId, encode_row};
pub use label::{Label, Participants, Relation, SystemSet, normalize_label};
pub use language::LanguagePair;
pub use reducer::{
    AgreementConfig, AgreementEngine, FailurePolicy, KappaScore, Mode, PairOutcome, WorkUnit,
    build_units,
};
