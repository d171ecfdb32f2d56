//! WMT 形式（カンマ区切り）の結果ファイル読み込み
//!
//! 列: `srclang, trglang, srcIndex, segmentId, judgeID, system1Id, system1rank, ...,
//! rankingID`。システム列は最大 [`MAX_SYSTEMS`] スロット。

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use appraise_core::{
    JudgmentCorpus, LabelError, LanguagePair, Rank, RankEntry, RankingRow, SegmentId, SystemSet,
};
use csv::StringRecord;
use log::{debug, info};
use thiserror::Error;

use crate::common::io::open_reader;

/// 1 行あたりのシステムスロット数（一対比較は 2、通常の WMT データは 5）
pub const MAX_SYSTEMS: usize = 5;

const JUDGE_COLUMNS: [&str; 2] = ["judgeId", "judgeID"];
const REQUIRED_COLUMNS: [&str; 3] = ["srclang", "trglang", "srcIndex"];

/// 行を読み飛ばした理由
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("srcIndex `{0}` is not a segment number")]
    BadSegment(String),
    #[error("rank `{0}` is not an integer")]
    BadRank(String),
    #[error(transparent)]
    BadSystem(#[from] LabelError),
    #[error("fewer than two systems")]
    TooFewSystems,
}

/// 読み込み統計
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReadStats {
    pub rows: usize,
    pub skipped: usize,
    pub judgments: usize,
}

struct CsvRow<'a> {
    record: &'a StringRecord,
    index: &'a HashMap<String, usize>,
}

impl<'a> CsvRow<'a> {
    /// 列の値。列が無い・空欄の場合は `None`。
    fn get(&self, key: &str) -> Option<&'a str> {
        let idx = self.index.get(key).copied()?;
        self.record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }

    fn judge(&self) -> Option<&'a str> {
        JUDGE_COLUMNS.iter().find_map(|key| self.get(key))
    }
}

fn build_index(headers: &StringRecord) -> HashMap<String, usize> {
    headers.iter().enumerate().map(|(idx, name)| (name.trim().to_owned(), idx)).collect()
}

fn check_header(index: &HashMap<String, usize>) -> Result<()> {
    for name in REQUIRED_COLUMNS {
        if !index.contains_key(name) {
            bail!("results file header is missing column `{name}`");
        }
    }
    if !JUDGE_COLUMNS.iter().any(|name| index.contains_key(*name)) {
        bail!("results file header is missing column `judgeID`");
    }
    Ok(())
}

fn parse_row(row: &CsvRow<'_>) -> Result<RankingRow, SkipReason> {
    let source = row.get("srclang").unwrap_or_default();
    let target = row.get("trglang").unwrap_or_default();
    let segment = row.get("srcIndex").ok_or(SkipReason::Missing("srcIndex"))?;
    let segment = segment
        .parse::<u64>()
        .map_err(|_| SkipReason::BadSegment(segment.to_owned()))?;
    let judge = row.judge().ok_or(SkipReason::Missing("judgeID"))?;

    let mut entries = Vec::with_capacity(MAX_SYSTEMS);
    for slot in 1..=MAX_SYSTEMS {
        let Some(system) = row.get(&format!("system{slot}Id")) else {
            continue;
        };
        let rank = match row.get(&format!("system{slot}rank")) {
            None => Rank::Skipped,
            Some(value) => Rank::from_value(
                value.parse::<i64>().map_err(|_| SkipReason::BadRank(value.to_owned()))?,
            ),
        };
        entries.push(RankEntry {
            system: SystemSet::parse(system)?,
            rank,
        });
    }
    if entries.len() < 2 {
        return Err(SkipReason::TooFewSystems);
    }

    Ok(RankingRow {
        language_pair: LanguagePair::from_codes(source, target),
        segment: SegmentId(segment),
        judge: judge.to_owned(),
        entries,
    })
}

/// CSV を読み込み、一対比較の判定に展開して返す
///
/// ヘッダーの欠落や CSV として壊れた入力はエラー、個々の不正な行は読み飛ばす。
pub fn read_corpus<R: Read>(input: R) -> Result<(JudgmentCorpus, ReadStats)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let index = build_index(reader.headers().context("failed to read CSV header")?);
    check_header(&index)?;

    let mut corpus = JudgmentCorpus::new();
    let mut stats = ReadStats::default();
    let mut record = StringRecord::new();
    loop {
        let line = reader.position().line();
        if !reader.read_record(&mut record).with_context(|| format!("invalid CSV near line {line}"))? {
            break;
        }
        stats.rows += 1;
        let row = CsvRow {
            record: &record,
            index: &index,
        };
        match parse_row(&row) {
            Ok(parsed) => stats.judgments += corpus.push_row(&parsed),
            Err(reason) => {
                stats.skipped += 1;
                debug!("skipping row {}: {reason}", stats.rows);
            }
        }
    }
    Ok((corpus, stats))
}

/// パス（`.gz` 可、`-` は標準入力）から読み込む
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<(JudgmentCorpus, ReadStats)> {
    let p = path.as_ref();
    let input = open_reader(p).with_context(|| format!("failed to open {}", p.display()))?;
    let (corpus, stats) = read_corpus(input).with_context(|| format!("failed to read {}", p.display()))?;
    info!(
        "{}: {} rows, {} skipped, {} pairwise judgments",
        p.display(),
        stats.rows,
        stats.skipped,
        stats.judgments
    );
    Ok((corpus, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "srclang,trglang,srcIndex,segmentId,judgeID,system1Id,system1rank,system2Id,system2rank,rankingID\n";

    #[test]
    fn test_reads_pairwise_rows() {
        let data = format!(
            "{HEADER}deu,eng,1,1,judge1,sys1,1,sys2,2,1\ndeu,eng,1,1,judge2,sys1,2,sys2,1,2\n"
        );
        let (corpus, stats) = read_corpus(data.as_bytes()).unwrap();
        assert_eq!(stats, ReadStats { rows: 2, skipped: 0, judgments: 2 });

        let pair = LanguagePair::from_codes("deu", "eng");
        let judgments = &corpus.segments(&pair).unwrap()[&SegmentId(1)];
        let labels: Vec<String> = judgments.iter().map(|j| j.label.to_string()).collect();
        assert_eq!(labels, ["sys1>sys2", "sys1<sys2"]);
        assert_eq!(judgments[1].coder, "judge2");
    }

    #[test]
    fn test_skips_malformed_rows() {
        let data = format!(
            "{HEADER}\
             deu,eng,x,1,judge1,sys1,1,sys2,2,1\n\
             deu,eng,1,1,,sys1,1,sys2,2,2\n\
             deu,eng,1,1,judge1,sys1,one,sys2,2,3\n\
             deu,eng,1,1,judge1,sys1,1,,,4\n\
             deu,eng,1,1,judge1,sys>1,1,sys2,2,5\n\
             deu,eng,1\n"
        );
        let (corpus, stats) = read_corpus(data.as_bytes()).unwrap();
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.skipped, 6);
        assert_eq!(corpus.judgments(), 0);
    }

    #[test]
    fn test_skip_sentinel_produces_no_pair() {
        let data = format!("{HEADER}deu,eng,1,1,judge1,sys1,1,sys2,-1,1\ndeu,eng,1,1,judge1,sys1,1,sys2,,2\n");
        let (corpus, stats) = read_corpus(data.as_bytes()).unwrap();
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.judgments, 0);
        assert_eq!(corpus.judgments(), 0);
    }

    #[test]
    fn test_five_system_rows_and_judge_id_column() {
        let data = "srclang,trglang,srcIndex,judgeId,system1Id,system1rank,system2Id,system2rank,\
                    system3Id,system3rank,system4Id,system4rank,system5Id,system5rank\n\
                    ces,eng,07,j1,a,1,b,2,c,2,d,-1,e,5\n";
        let (corpus, stats) = read_corpus(data.as_bytes()).unwrap();
        // 4 システムが有効 → C(4,2) = 6
        assert_eq!(stats.judgments, 6);
        let pair = LanguagePair::from_codes("ces", "eng");
        assert!(corpus.segments(&pair).unwrap().contains_key(&SegmentId(7)));
    }

    #[test]
    fn test_missing_header_column_is_error() {
        let err = read_corpus("srclang,trglang,judgeID\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("srcIndex"));
        let err = read_corpus("srclang,trglang,srcIndex\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("judgeID"));
    }
}
