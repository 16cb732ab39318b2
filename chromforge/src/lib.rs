//! # chromforge
//!
//! `chromforge` is a Rust library and command-line tool for preparing dense
//! genomic signal tracks. It materializes sparse coverage tables into
//! per-base arrays, partitions genomes into validated training regions,
//! compresses signal with dynamic binning, and stores everything in a
//! chunked, compressed per-chromosome directory format.
//!
//! If you do not want to use chromforge as a crate, check out the
//! `chromforge-ci` command-line tool shipped in the same workspace.
//!
//! ## Key Features
//!
//! * **Dense materialization**: sparse `chrom start end value` coverage
//!   tables become gap-free per-base arrays ([`io::coverage`]), with the
//!   per-record fills computed on a shared Rayon worker pool.
//! * **Genome partitioning**: bed/GFF/in-memory/tiled loci are filtered
//!   against the reference genome, fragmented around margin-widened
//!   exclusion zones, optionally windowed, and validated
//!   ([`tools::partition`]).
//! * **Dynamic-bin compression**: signal-dependent smoothing that keeps
//!   single-base resolution where the signal is high and widens bins
//!   geometrically where it is low ([`tools::compress`]), plus a seeded
//!   background-noise QC metric.
//! * **Chromosome stores**: the [`io::store::ChromStore`] trait with an
//!   in-memory implementation and a persistent directory store of
//!   independently compressed chunks, so range reads only decode the chunks
//!   they touch.
//! * **Peak calling and dosage correction**: thresholded peak extraction
//!   with width filtering ([`tools::peaks`]) and scaler-table based library
//!   rescaling ([`tools::dosage`]).
//! * **Integration**: uses `bio-rs` for BED/GFF records, `rust-lapper` for
//!   exclusion overlap queries, and `bincode` + `zstd` for chunk payloads.
//!
//! The number of worker threads can be configured by setting the
//! `CHROMFORGE_NUM_THREADS` environment variable.
//!
//! ## Structure
//!
//! * [`data_structs`]: fundamental types — genomic intervals and loci
//!   ([`Interval`], [`Locus`]), reference chromosome lengths ([`Genome`])
//!   and dense per-base tracks ([`DenseTrack`]).
//! * [`io`]: coverage parsing and materialization, region-list readers,
//!   chromosome stores and track export.
//! * [`tools`]: the higher-level analysis passes — partitioning,
//!   compression, peak calling, dosage correction.
//! * [`utils`]: the shared thread pool and interval-set arithmetic.
//!
//! ## Usage
//!
//! ### Materializing coverage into a store
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use chromforge::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let genome = Genome::from_chrom_sizes(File::open("hg38.chrom.sizes")?)?;
//!     let coverage = BufReader::new(File::open("sample.coverage")?);
//!
//!     let mut store = DirStore::create("sample.store", 1_000_000)?;
//!     coverage_to_store(coverage, &mut store, Some(&genome))?;
//!     Ok(())
//! }
//! ```
//!
//! ### Partitioning a genome into training regions
//!
//! ```no_run
//! use std::fs::File;
//! use chromforge::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let genome = Genome::from_chrom_sizes(File::open("hg38.chrom.sizes")?)?;
//!     let exclusions = read_bed(File::open("blacklist.bed")?)?;
//!
//!     let partition = GenomePartitioner::new(&genome, exclusions)
//!         .with_window(Some(WindowConfig::new(16_384, 8_192)))
//!         .partition(&BedLoci::new("candidate_loci.bed"))?;
//!
//!     partition.export_bed(File::create("regions.bed")?)?;
//!     Ok(())
//! }
//! ```
//!
//! ### Compressing a signal store
//!
//! ```no_run
//! use chromforge::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let input: DirStore<f32> = DirStore::open("sample.store")?;
//!     let mut output = DirStore::create("sample_compressed.store", 1_000_000)?;
//!     compress_store(&input, &mut output, &BinLadder::default(), 0.3)?;
//!     Ok(())
//! }
//! ```

pub mod data_structs;
pub mod io;
pub mod prelude;
pub mod tools;
pub mod utils;

#[allow(unused_imports)]
use prelude::*;
