use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;
use chromforge::prelude::*;
use clap::Args;
use console::style;
use log::info;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct CoverageArgs {
    #[arg(value_parser, help = "Path to the sparse coverage table")]
    input: PathBuf,

    #[arg(value_parser, help = "Output store directory")]
    output: PathBuf,

    #[arg(
        short,
        long,
        help = "Chromosome sizes file; tracks are padded to these lengths"
    )]
    genome: Option<PathBuf>,

    #[arg(long, default_value_t = 1_000_000, help = "Store chunk size in elements")]
    chunk_size: usize,
}

impl CoverageArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let genome = self
            .genome
            .as_ref()
            .map(|path| {
                File::open(path)
                    .with_context(|| {
                        format!("Failed to open chromosome sizes {}", path.display())
                    })
                    .and_then(Genome::from_chrom_sizes)
            })
            .transpose()?;
        if let Some(genome) = &genome {
            info!("Padding tracks to {} reference chromosomes", genome.n_chr());
        }

        let reader = BufReader::new(File::open(&self.input).with_context(|| {
            format!("Failed to open coverage file {}", self.input.display())
        })?);
        let mut store: DirStore<CoverageType> =
            DirStore::create(&self.output, self.chunk_size)?;
        coverage_to_store(reader, &mut store, genome.as_ref())?;

        println!(
            "[{}] Materialized {} chromosomes into {}",
            style("V").green(),
            style(store.chr_names().len()).green(),
            self.output.display()
        );
        Ok(())
    }
}
