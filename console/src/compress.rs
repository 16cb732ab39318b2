use std::path::PathBuf;

use chromforge::prelude::*;
use chromforge::tools::compress::{
    DEFAULT_MAX_BIN_POWER,
    DEFAULT_QC_CUTOFF,
    DEFAULT_QC_SAMPLE_SIZE,
    DEFAULT_QC_SEED,
};
use clap::Args;
use console::style;
use indicatif::ProgressBar;

use crate::utils::{init_pbar, UtilsArgs};

#[derive(Args, Debug, Clone)]
pub(crate) struct CompressArgs {
    #[arg(value_parser, help = "Input signal store directory")]
    input: PathBuf,

    #[arg(value_parser, help = "Output store directory")]
    output: PathBuf,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BIN_POWER,
        help = "Largest bin is 32^power bases"
    )]
    max_bin_power: u32,

    #[arg(
        long,
        default_value_t = DEFAULT_QC_CUTOFF,
        help = "Background cutoff for the noise metric"
    )]
    qc_cutoff: f64,
}

impl CompressArgs {
    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let input: DirStore<SignalType> = DirStore::open(&self.input)?;
        let mut output: DirStore<SignalType> =
            DirStore::create(&self.output, input.chunk_size())?;
        let ladder = BinLadder::geometric(self.max_bin_power);
        let metric_key = format!("qc_std_{}", self.qc_cutoff);

        let progress_bar = if utils.progress {
            init_pbar(input.chr_names().len())?
        }
        else {
            ProgressBar::hidden()
        };

        // Same loop as the library driver, surfaced here for the progress
        // bar and per-chromosome messages.
        let mut noise_values = Vec::new();
        for chrom in input.chr_names() {
            progress_bar.set_message(chrom.to_string());
            let track = input.read(&chrom)?;
            let noise = background_noise(
                track.values(),
                self.qc_cutoff,
                DEFAULT_QC_SEED,
                DEFAULT_QC_SAMPLE_SIZE,
            );
            let compressed = compress_track(&track, &ladder);
            output.write(
                &chrom,
                compressed,
                [(metric_key.clone(), noise)].into_iter().collect(),
            )?;
            noise_values.push(noise);
            progress_bar.inc(1);
        }
        if !noise_values.is_empty() {
            let mean = noise_values.iter().sum::<f64>() / noise_values.len() as f64;
            output.set_group_attr(&metric_key, mean)?;
        }
        progress_bar.finish_and_clear();

        println!(
            "[{}] Compressed {} chromosomes into {}",
            style("V").green(),
            style(noise_values.len()).green(),
            self.output.display()
        );
        Ok(())
    }
}
