//! Appraise の XML エクスポートを言語対ごとの WMT 形式 CSV（一対比較）に変換する
//!
//! # 使用例
//!
//! ```bash
//! # wmt15.deu-eng.csv などを wmt15.xml.gz と同じ場所に出力
//! cargo run -p tools --bin xml2csv -- wmt15.xml.gz
//!
//! # システム群を展開せず、参照訳も残す
//! cargo run -p tools --bin xml2csv -- -c -r --output-dir out wmt15.xml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use tools::common::io::open_reader;
use tools::judges::JudgeRegistry;
use tools::xml_export::{ConvertOptions, PairWriters, convert, output_prefix};

#[derive(Parser, Debug)]
#[command(
    name = "xml2csv",
    version,
    about = "Appraise XML（.gz 可）を言語対ごとの一対比較 CSV に変換し、判定者を匿名化する"
)]
struct Cli {
    /// 入力 XML（.xml / .xml.gz）
    xml: PathBuf,

    /// カンマ区切りのシステム群を展開せず `+` で連結した 1 システムとして出力
    #[arg(short = 'c', long)]
    compact: bool,

    /// 参照訳（`ref` で始まるシステム）も出力する
    #[arg(short = 'r', long)]
    keep_references: bool,

    /// 出力ディレクトリ（省略時: 入力と同じ場所）
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// 出力を gzip 圧縮する（.csv.gz）
    #[arg(long)]
    gzip: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let options = ConvertOptions {
        expand_groups: !cli.compact,
        keep_references: cli.keep_references,
    };
    let input = open_reader(&cli.xml).with_context(|| format!("failed to open {}", cli.xml.display()))?;
    let mut judges = JudgeRegistry::new();
    let mut writers = PairWriters::new(output_prefix(&cli.xml, cli.output_dir.as_deref()), cli.gzip);

    let stats = convert(input, options, &mut judges, |row| writers.write(row))
        .with_context(|| format!("failed to convert {}", cli.xml.display()))?;
    let paths = writers.finish()?;

    info!(
        "{} HITs, {} ranking results, {} judges -> {} pairwise rows",
        stats.hits,
        stats.results,
        judges.len(),
        stats.rows
    );
    for path in &paths {
        info!("wrote {}", path.display());
    }
    Ok(())
}
