mod compress;
mod coverage;
mod dosage;
mod export;
mod partition;
mod peaks;
mod utils;

use clap::{Parser, Subcommand};
use utils::UtilsArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Materialize a sparse coverage table into a chromosome store.
    Coverage {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  coverage::CoverageArgs,
    },

    /// Partition a genome into validated training regions.
    Partition {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  partition::PartitionArgs,
    },

    /// Compress a signal store with dynamic binning.
    Compress {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  compress::CompressArgs,
    },

    /// Export a signal store as a bedGraph text track.
    Export {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  export::ExportArgs,
    },

    /// Call peaks on a signal store.
    Peaks {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  peaks::PeaksArgs,
    },

    /// Rescale a library of capture stores by a scaler table.
    Dosage {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  dosage::DosageArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Coverage { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Partition { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Compress { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Export { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Peaks { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Dosage { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
    }
    Ok(())
}
