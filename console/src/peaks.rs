use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use chromforge::prelude::*;
use chromforge::tools::peaks::DEFAULT_PEAK_THRESHOLD;
use clap::Args;
use console::style;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct PeaksArgs {
    #[arg(value_parser, help = "Input signal store directory")]
    input: PathBuf,

    #[arg(value_parser, help = "Output bed-like peak table")]
    output: PathBuf,

    #[arg(
        short,
        long,
        default_value_t = DEFAULT_PEAK_THRESHOLD,
        help = "Signal threshold a peak must exceed"
    )]
    threshold: f64,
}

impl PeaksArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let store: DirStore<SignalType> = DirStore::open(&self.input)?;
        let peaks = call_genome_peaks(&store, self.threshold)?;

        let file = File::create(&self.output).with_context(|| {
            format!("Failed to create output file {}", self.output.display())
        })?;
        write_peaks_bed(&peaks, BufWriter::new(file))?;

        println!(
            "[{}] Wrote {} peaks to {}",
            style("V").green(),
            style(peaks.len()).green(),
            self.output.display()
        );
        Ok(())
    }
}
