//! 集計結果の出力（表形式 / JSON Lines）

use std::io::{self, Write};

use appraise_core::{KappaScore, LanguagePair, PairOutcome};
use serde::Serialize;

pub const TABLE_HEADER: &str = "Language pair        pA     pE     kappa  ";
const POINTS_HEADER: &str = "Points   ";
const VERBOSE_HEADER: &str = "(agree, comparable, ties, total)";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// 集計値 (agree, comparable, ties, total) も表示する
    pub verbose: bool,
    /// comparable 数を表示する
    pub points: bool,
    /// 表の代わりに JSON Lines で出力する
    pub json: bool,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    language_pair: String,
    #[serde(flatten)]
    score: &'a KappaScore,
}

/// 正の値の前に空白を置く固定小数点表記（小数 3 桁）
fn signed(v: f64) -> String {
    if v.is_sign_negative() {
        format!("{v:.3}")
    } else {
        format!(" {v:.3}")
    }
}

pub fn format_row(pair: &LanguagePair, score: &KappaScore, options: &ReportOptions) -> String {
    let mut line = format!(
        "{:>20} {} {} {}",
        pair.to_string(),
        signed(score.pa),
        signed(score.pe),
        signed(score.kappa)
    );
    if options.points {
        line.push_str(&format!(" {:>8}", score.counts.comparable));
    }
    if options.verbose {
        let c = &score.counts;
        line.push_str(&format!(
            " {:>8} {:>8} {:>8} {:>8}",
            c.identical, c.comparable, c.ties, c.total
        ));
    }
    line
}

/// スコアの付いた言語対だけを出力する（比較可能ペア無し・無効化された言語対は除く）
pub fn write_report<W: Write>(
    out: &mut W,
    results: &[(LanguagePair, PairOutcome)],
    options: &ReportOptions,
) -> io::Result<()> {
    let scored = results.iter().filter_map(|(pair, outcome)| match outcome {
        PairOutcome::Scored(score) => Some((pair, score)),
        PairOutcome::NoComparable(_) | PairOutcome::Voided(_) => None,
    });

    if options.json {
        for (pair, score) in scored {
            let row = JsonRow {
                language_pair: pair.to_string(),
                score,
            };
            serde_json::to_writer(&mut *out, &row)?;
            out.write_all(b"\n")?;
        }
        return Ok(());
    }

    let mut header = TABLE_HEADER.to_owned();
    if options.points {
        header.push_str(POINTS_HEADER);
    }
    if options.verbose {
        header.push_str(VERBOSE_HEADER);
    }
    writeln!(out, "{header}")?;
    for (pair, score) in scored {
        writeln!(out, "{}", format_row(pair, score, options))?;
    }
    Ok(())
}
