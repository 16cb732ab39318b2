use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use chromforge::prelude::*;
use clap::Args;
use console::style;

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct ExportArgs {
    #[arg(value_parser, help = "Input signal store directory")]
    input: PathBuf,

    #[arg(value_parser, help = "Output bedGraph file")]
    output: PathBuf,
}

impl ExportArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let store: DirStore<SignalType> = DirStore::open(&self.input)?;
        let file = File::create(&self.output).with_context(|| {
            format!("Failed to create output file {}", self.output.display())
        })?;
        let mut sink = BedGraphSink::new(BufWriter::new(file));
        export_store(&store, &mut sink)?;

        println!(
            "[{}] Exported {} chromosomes to {}",
            style("V").green(),
            style(store.chr_names().len()).green(),
            self.output.display()
        );
        Ok(())
    }
}
