use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chromforge::prelude::*;
use chromforge::tools::partition::{DEFAULT_EDGE_BUFFER, DEFAULT_EXCLUSION_MARGIN};
use clap::Args;
use console::style;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct PartitionArgs {
    #[arg(value_parser, help = "Chromosome sizes file")]
    genome: PathBuf,

    #[arg(value_parser, help = "Loci table (bed, or GFF3 with --gff)")]
    loci: PathBuf,

    #[arg(value_parser, help = "Output bed-like region table")]
    output: PathBuf,

    #[arg(long, help = "Treat the loci table as a GFF3 annotation")]
    gff: bool,

    #[arg(short, long, help = "Bed table of regions to exclude")]
    exclude: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = DEFAULT_EXCLUSION_MARGIN,
        help = "Margin added around every exclusion"
    )]
    exclusion_margin: u64,

    #[arg(long, help = "Window size; enables sliding-window output")]
    window_size: Option<u64>,

    #[arg(long, help = "Window step; required with --window-size")]
    step_size: Option<u64>,

    #[arg(
        long,
        default_value_t = DEFAULT_EDGE_BUFFER,
        help = "Locus expansion applied before windowing"
    )]
    edge_buffer: u64,

    #[arg(long, help = "Also exclude this many bases at every chromosome end")]
    chr_margin: Option<u64>,
}

impl PartitionArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let genome = Genome::from_chrom_sizes(File::open(&self.genome).with_context(
            || format!("Failed to open chromosome sizes {}", self.genome.display()),
        )?)?;
        let exclusions = self
            .exclude
            .as_ref()
            .map(|path| {
                File::open(path)
                    .with_context(|| {
                        format!("Failed to open exclusion table {}", path.display())
                    })
                    .and_then(read_bed)
            })
            .transpose()?
            .unwrap_or_default();

        let window = match (self.window_size, self.step_size) {
            (Some(window_size), Some(step_size)) => Some(
                WindowConfig::new(window_size, step_size)
                    .with_edge_buffer(self.edge_buffer),
            ),
            (None, None) => None,
            _ => bail!("--window-size and --step-size must be given together"),
        };

        let partitioner = GenomePartitioner::new(&genome, exclusions)
            .with_exclusion_margin(self.exclusion_margin)
            .with_chr_margin(self.chr_margin)
            .with_window(window);

        let partition = if self.gff {
            partitioner.partition(&GffLoci::new(&self.loci))?
        }
        else {
            partitioner.partition(&BedLoci::new(&self.loci))?
        };

        partition.export_bed(File::create(&self.output).with_context(|| {
            format!("Failed to create output file {}", self.output.display())
        })?)?;

        println!(
            "[{}] Wrote {} regions to {}",
            style("V").green(),
            style(partition.len()).green(),
            self.output.display()
        );
        Ok(())
    }
}
