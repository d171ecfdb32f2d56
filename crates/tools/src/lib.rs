//! WMT ランキング一致度ツール群の共通ライブラリ
//!
//! - [`wmt_csv`]: WMT 形式の結果ファイルを読み込み [`appraise_core::JudgmentCorpus`] を作る
//! - [`xml_export`]: Appraise の XML エクスポートを言語対ごとの CSV に変換する
//! - [`report`]: 集計結果の表 / JSON 出力

pub mod common;
pub mod judges;
pub mod report;
pub mod wmt_csv;
pub mod xml_export;
