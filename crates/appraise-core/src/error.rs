//! エンジンが返すエラー型

use thiserror::Error;

use crate::judgment::SegmentId;

/// ラベル文字列・システムIDの書式エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label `{0}` contains none of '>', '<', '='")]
    MissingRelation(String),

    #[error("label `{0}` has an empty system operand")]
    EmptySystem(String),

    #[error("system id `{id}` contains reserved character '{ch}'")]
    ReservedCharacter { id: String, ch: char },
}

/// ワークユニット（Aggregator 1回分の入力）の識別子
///
/// inter モードでは segment 単位、intra モードでは segment × coder 単位。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    pub segment: SegmentId,
    pub coder: Option<String>,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.coder {
            Some(coder) => write!(f, "segment {} / coder {coder}", self.segment),
            None => write!(f, "segment {}", self.segment),
        }
    }
}

/// Aggregator の失敗理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("{unit}: work unit has no judgments")]
    EmptyUnit { unit: UnitKey },

    #[error("{unit}: judgment for segment {found} mixed into the unit")]
    MixedSegments { unit: UnitKey, found: SegmentId },
}

impl AggregationError {
    pub fn unit(&self) -> &UnitKey {
        match self {
            Self::EmptyUnit { unit } | Self::MixedSegments { unit, .. } => unit,
        }
    }
}

/// エンジン初期化時のエラー
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
