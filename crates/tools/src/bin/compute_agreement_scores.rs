//! WMT 形式の結果ファイルから判定者一致度（kappa）を計算する
//!
//! # 使用例
//!
//! ```bash
//! # 判定者間一致度（既定）
//! cargo run -p tools --bin compute_agreement_scores -- wmt15.deu-eng.csv
//!
//! # 判定者内一致度、comparable 数と集計値も表示
//! cargo run -p tools --bin compute_agreement_scores -- --intra --points --verbose wmt15.csv.gz
//!
//! # 4 スレッド、JSON Lines 出力
//! cargo run -p tools --bin compute_agreement_scores -- --processes 4 --json wmt15.csv
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use appraise_core::{AgreementConfig, AgreementEngine, FailurePolicy, Mode, PairOutcome};
use clap::{Parser, ValueEnum};
use log::{error, info};

use tools::report::{ReportOptions, write_report};
use tools::wmt_csv::load_corpus;

#[derive(Parser, Debug)]
#[command(
    name = "compute_agreement_scores",
    version,
    about = "Computes agreement scores for the given results file in WMT format."
)]
struct Cli {
    /// Comma-separated results file in WMT format (gzip allowed, `-` for stdin).
    #[arg(value_name = "results-file")]
    results_file: PathBuf,

    /// Sets the number of parallel worker threads (0 = CPU count).
    #[arg(long, default_value_t = 0)]
    processes: usize,

    /// Compute inter-annotator agreement.
    #[arg(long)]
    inter: bool,

    /// Compute intra-annotator agreement.
    #[arg(long)]
    intra: bool,

    /// Display additional information on kappa values.
    #[arg(long)]
    verbose: bool,

    /// Display total number of data points in output table.
    #[arg(long)]
    points: bool,

    /// Print one JSON object per language pair instead of the table.
    #[arg(long)]
    json: bool,

    /// Also report language pairs outside the standard WMT order.
    #[arg(long)]
    all_pairs: bool,

    /// What to do when a work unit fails to aggregate.
    #[arg(long, value_enum, default_value_t = UnitFailure::Void)]
    on_unit_failure: UnitFailure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum UnitFailure {
    /// Void the language pair's score.
    Void,
    /// Count the unit as zero and warn.
    Zero,
}

impl From<UnitFailure> for FailurePolicy {
    fn from(value: UnitFailure) -> Self {
        match value {
            UnitFailure::Void => FailurePolicy::VoidPair,
            UnitFailure::Zero => FailurePolicy::ZeroContribution,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = AgreementConfig {
        mode: Mode::from_flags(cli.inter, cli.intra),
        processes: cli.processes,
        failure_policy: cli.on_unit_failure.into(),
        include_unlisted_pairs: cli.all_pairs,
    };

    let (corpus, _) = load_corpus(&cli.results_file)?;
    let engine = AgreementEngine::new(config).context("failed to start agreement engine")?;
    info!("computing {:?} agreement with {} threads", engine.config().mode, engine.threads());

    let results = engine.run(&corpus);
    for (pair, outcome) in &results {
        if let PairOutcome::Voided(failures) = outcome {
            for failure in failures {
                error!("{pair}: {failure}");
            }
        }
    }

    let options = ReportOptions {
        verbose: cli.verbose,
        points: cli.points,
        json: cli.json,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &results, &options)?;
    out.flush()?;
    Ok(())
}
