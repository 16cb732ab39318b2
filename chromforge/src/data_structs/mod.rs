//! Fundamental data types: genomic intervals and loci, reference chromosome
//! lengths, and dense per-base tracks.

mod genome;
mod interval;
mod track;
pub mod typedef;

pub use genome::Genome;
pub use interval::{Interval, Locus};
pub use track::DenseTrack;
