use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chromforge::prelude::*;
use chromforge::tools::dosage::DEFAULT_SCALE_THRESHOLD;
use clap::{Args, ValueEnum};
use console::style;

use crate::utils::UtilsArgs;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Multiplier,
    Filter,
}

impl From<Mode> for DosageMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Multiplier => DosageMode::Multiplier,
            Mode::Filter => DosageMode::Filter,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DosageArgs {
    #[arg(value_parser, help = "Root directory of the capture stores")]
    data_path: PathBuf,

    #[arg(value_parser, help = "Output root directory")]
    output_path: PathBuf,

    #[arg(value_parser, help = "Scaler CSV table (cap_name,scale)")]
    scaler_path: PathBuf,

    #[arg(long, value_enum, help = "How the scale factors are applied")]
    mode: Mode,

    #[arg(
        long,
        default_value_t = DEFAULT_SCALE_THRESHOLD,
        help = "Allowed scale deviation from 1.0 in filter mode"
    )]
    threshold: f64,
}

impl DosageArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let scaler = read_scaler(File::open(&self.scaler_path).with_context(|| {
            format!("Failed to open scaler table {}", self.scaler_path.display())
        })?)?;

        let summary = correct_dosage(
            &self.data_path,
            &self.output_path,
            &scaler,
            self.mode.into(),
            self.threshold,
        )?;

        println!(
            "[{}] Corrected {} caps ({} skipped, {} failed)",
            style("V").green(),
            style(summary.n_corrected).green(),
            summary.n_skipped,
            if summary.n_failed > 0 {
                style(summary.n_failed).red()
            }
            else {
                style(summary.n_failed).green()
            }
        );
        Ok(())
    }
}
