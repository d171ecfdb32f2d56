//! Appraise XML エクスポート → WMT 形式 CSV（一対比較）への変換
//!
//! ```xml
//! <HIT hit-id="32872282" source-language="deu" target-language="eng">
//!   <ranking-task id="0">
//!     <ranking-result duration="00:00:35.337000" user="jonny_appleseed">
//!       <translation system="newstest2015.online-E.0.de-en.txt" rank="3" />
//!       <translation system="newstest2015.KIT.4017.de-en.txt,newstest2015.online-B.0.de-en.txt" rank="1" />
//!     </ranking-result>
//!   </ranking-task>
//! </HIT>
//! ```
//!
//! 1 つの ranking-result から、システムの全 2 組み合わせを 1 行ずつ出力する。
//! 判定者IDは [`JudgeRegistry`] で匿名化する。

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::common::io::{Writer, open_writer};
use crate::judges::JudgeRegistry;

pub const CSV_HEADER: [&str; 10] = [
    "srclang",
    "trglang",
    "srcIndex",
    "segmentId",
    "judgeID",
    "system1Id",
    "system1rank",
    "system2Id",
    "system2rank",
    "rankingID",
];

/// 参照訳のシステム名プレフィックス
const REFERENCE_PREFIX: &str = "ref";

#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    /// カンマ区切りのシステム群を個別のシステムに展開する（false なら `+` で連結）
    pub expand_groups: bool,
    /// 参照訳も出力する
    pub keep_references: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            expand_groups: true,
            keep_references: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRank {
    pub system: String,
    pub rank: String,
}

/// 出力 CSV の 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseRow {
    pub source: String,
    pub target: String,
    pub segment: String,
    pub judge: String,
    pub first: SystemRank,
    pub second: SystemRank,
    pub ranking_id: u64,
}

impl PairwiseRow {
    /// [`CSV_HEADER`] の列順
    pub fn record(&self) -> [String; 10] {
        [
            self.source.clone(),
            self.target.clone(),
            self.segment.clone(),
            self.segment.clone(),
            self.judge.clone(),
            self.first.system.clone(),
            self.first.rank.clone(),
            self.second.system.clone(),
            self.second.rank.clone(),
            self.ranking_id.to_string(),
        ]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    pub hits: usize,
    pub results: u64,
    pub rows: usize,
}

struct Hit {
    source: String,
    target: String,
}

struct OpenResult {
    segment: String,
    judge: String,
    ranking_id: u64,
    systems: Vec<SystemRank>,
}

struct Converter<'r> {
    options: ConvertOptions,
    judges: &'r mut JudgeRegistry,
    hit: Option<Hit>,
    task: Option<String>,
    result: Option<OpenResult>,
    stats: ConvertStats,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.context("malformed XML attribute")?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().context("malformed XML attribute value")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn required_attribute(e: &BytesStart<'_>, name: &str) -> Result<String> {
    attribute(e, name)?.with_context(|| {
        format!("<{}> is missing attribute `{name}`", String::from_utf8_lossy(e.name().as_ref()))
    })
}

/// translation 要素 1 つ分のシステムを取り出す
fn translation_systems(options: ConvertOptions, systems: &str, rank: &str) -> Vec<SystemRank> {
    let names = systems
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| options.keep_references || !name.starts_with(REFERENCE_PREFIX));
    if options.expand_groups {
        names
            .map(|name| SystemRank {
                system: name.to_owned(),
                rank: rank.to_owned(),
            })
            .collect()
    } else {
        let group: Vec<&str> = names.collect();
        if group.is_empty() {
            return Vec::new();
        }
        vec![SystemRank {
            system: group.join("+"),
            rank: rank.to_owned(),
        }]
    }
}

impl Converter<'_> {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.name().as_ref() {
            b"HIT" => {
                self.hit = Some(Hit {
                    source: required_attribute(e, "source-language")?,
                    target: required_attribute(e, "target-language")?,
                });
                self.stats.hits += 1;
            }
            b"ranking-task" => self.task = Some(required_attribute(e, "id")?),
            b"ranking-result" => {
                if self.hit.is_none() {
                    bail!("<ranking-result> outside of <HIT>");
                }
                let segment = self.task.clone().context("<ranking-result> outside of <ranking-task>")?;
                let user = required_attribute(e, "user")?;
                self.stats.results += 1;
                self.result = Some(OpenResult {
                    segment,
                    judge: self.judges.alias_for(&user),
                    ranking_id: self.stats.results,
                    systems: Vec::new(),
                });
            }
            b"translation" => {
                let Some(result) = self.result.as_mut() else {
                    debug!("ignoring <translation> outside of <ranking-result>");
                    return Ok(());
                };
                let systems = required_attribute(e, "system")?;
                let rank = required_attribute(e, "rank")?;
                result.systems.extend(translation_systems(self.options, &systems, &rank));
            }
            _ => {}
        }
        Ok(())
    }

    fn close<F>(&mut self, name: &[u8], sink: &mut F) -> Result<()>
    where
        F: FnMut(&PairwiseRow) -> Result<()>,
    {
        match name {
            b"ranking-result" => {
                if let Some(result) = self.result.take() {
                    self.emit(result, sink)?;
                }
            }
            b"ranking-task" => self.task = None,
            b"HIT" => self.hit = None,
            _ => {}
        }
        Ok(())
    }

    fn emit<F>(&mut self, result: OpenResult, sink: &mut F) -> Result<()>
    where
        F: FnMut(&PairwiseRow) -> Result<()>,
    {
        let hit = self.hit.as_ref().context("<ranking-result> outside of <HIT>")?;
        let systems = &result.systems;
        for a in 0..systems.len() {
            for b in (a + 1)..systems.len() {
                sink(&PairwiseRow {
                    source: hit.source.clone(),
                    target: hit.target.clone(),
                    segment: result.segment.clone(),
                    judge: result.judge.clone(),
                    first: systems[a].clone(),
                    second: systems[b].clone(),
                    ranking_id: result.ranking_id,
                })?;
                self.stats.rows += 1;
            }
        }
        Ok(())
    }
}

/// XML を読み、一対比較の行を `sink` に渡す
pub fn convert<R, F>(
    input: R,
    options: ConvertOptions,
    judges: &mut JudgeRegistry,
    mut sink: F,
) -> Result<ConvertStats>
where
    R: BufRead,
    F: FnMut(&PairwiseRow) -> Result<()>,
{
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut converter = Converter {
        options,
        judges,
        hit: None,
        task: None,
        result: None,
        stats: ConvertStats::default(),
    };
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("malformed XML near byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => converter.open(&e)?,
            Event::Empty(e) => {
                converter.open(&e)?;
                converter.close(e.name().as_ref(), &mut sink)?;
            }
            Event::End(e) => converter.close(e.name().as_ref(), &mut sink)?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(converter.stats)
}

/// 出力ファイル名のプレフィックス（入力パスの `.xml` より前）
pub fn output_prefix(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let text = input.to_string_lossy();
    let stem = text.find(".xml").map_or(&text[..], |pos| &text[..pos]);
    match output_dir {
        Some(dir) => {
            let name = Path::new(stem).file_name().map(PathBuf::from).unwrap_or_default();
            dir.join(name)
        }
        None => PathBuf::from(stem),
    }
}

/// 言語対ごとの CSV 出力先
pub struct PairWriters {
    prefix: PathBuf,
    gzip: bool,
    writers: BTreeMap<(String, String), (PathBuf, csv::Writer<Writer>)>,
}

impl PairWriters {
    pub fn new(prefix: impl Into<PathBuf>, gzip: bool) -> Self {
        Self {
            prefix: prefix.into(),
            gzip,
            writers: BTreeMap::new(),
        }
    }

    /// `{prefix}.{src}-{trg}.csv`（gzip 時は `.csv.gz`）
    pub fn path_for(&self, source: &str, target: &str) -> PathBuf {
        let ext = if self.gzip { "csv.gz" } else { "csv" };
        PathBuf::from(format!("{}.{source}-{target}.{ext}", self.prefix.display()))
    }

    pub fn write(&mut self, row: &PairwiseRow) -> Result<()> {
        let key = (row.source.clone(), row.target.clone());
        if !self.writers.contains_key(&key) {
            let path = self.path_for(&row.source, &row.target);
            let out = open_writer(&path).with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(CSV_HEADER)?;
            self.writers.insert(key.clone(), (path, writer));
        }
        if let Some((path, writer)) = self.writers.get_mut(&key) {
            writer
                .write_record(row.record())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }

    /// すべての出力を閉じ、作成したファイルを返す
    pub fn finish(self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.writers.len());
        for (_, (path, writer)) in self.writers {
            let out = writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_context(|| format!("failed to flush {}", path.display()))?;
            out.close().with_context(|| format!("failed to close {}", path.display()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}
