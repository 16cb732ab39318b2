use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(long, default_value_t = false, help = "Display progress bar")]
    pub progress: bool,

    #[arg(
        long,
        default_value_t = 1,
        help = "Number of worker threads (0 = all logical cores)"
    )]
    pub threads: usize,

    #[arg(short, long, default_value_t = false, help = "Verbose output")]
    pub verbose: bool,
}

impl UtilsArgs {
    /// Initializes logging and the worker pool size. Must run before any
    /// library call that touches the shared thread pool.
    pub fn setup(&self) -> anyhow::Result<()> {
        if self.verbose {
            std::env::set_var("RUST_LOG", "debug");
        }
        else if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "info");
        }
        pretty_env_logger::try_init()?;
        std::env::set_var("CHROMFORGE_NUM_THREADS", self.threads.to_string());
        Ok(())
    }
}

pub(crate) fn init_pbar(total: usize) -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Processing...");
    Ok(progress_bar)
}
